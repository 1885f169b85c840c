use serde::{Deserialize, Serialize};

/// Parse parallelism used when nothing else is configured.
pub const DEFAULT_PARALLELISM: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of loader workers (byte ranges) per load.
    pub parallelism: usize,
    /// Number of long-lived worker pool threads.
    pub pool_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            parallelism: DEFAULT_PARALLELISM,
            pool_size: num_cpus::get().max(1),
        }
    }
}

impl EngineConfig {
    /// Clamp both knobs to at least one thread.
    pub fn normalized(mut self) -> Self {
        self.parallelism = self.parallelism.max(1);
        self.pool_size = self.pool_size.max(1);
        self
    }
}
