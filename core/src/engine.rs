use crate::config::EngineConfig;
use crate::error::{LoadError, PoolError, QueryError};
use crate::index::InvertedIndex;
use crate::loader::{self, Facets};
use crate::pool::WorkerPool;
use crate::query::Query;
use crate::record::{Record, RecordId};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;

/// One fully built, immutable snapshot: records, postings and facets.
pub struct Generation {
    pub number: u64,
    pub records: Vec<Record>,
    pub index: InvertedIndex,
    pub facets: Facets,
    pub skipped: usize,
    pub loaded_at: String,
    pub load_time: Duration,
}

impl Generation {
    pub fn search(&self, query: &Query) -> Vec<RecordId> {
        query.evaluate(&self.index, &self.records)
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id as usize)
    }

    pub fn summary(&self) -> GenerationSummary {
        GenerationSummary {
            generation: self.number,
            records: self.records.len(),
            tokens: self.index.token_count(),
            skipped: self.skipped,
            facets: self.facets.clone(),
            loaded_at: self.loaded_at.clone(),
            load_ms: self.load_time.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: u64,
    pub records: usize,
    pub tokens: usize,
    pub skipped: usize,
    pub facets: Facets,
    pub loaded_at: String,
    pub load_ms: u64,
}

/// Ranked ids plus the generation they came from. Holding this keeps that
/// generation alive even if a newer one is swapped in meanwhile.
pub struct QueryResults {
    generation: Arc<Generation>,
    ids: Vec<RecordId>,
}

impl QueryResults {
    pub fn generation(&self) -> u64 { self.generation.number }

    pub fn ids(&self) -> &[RecordId] { &self.ids }

    pub fn len(&self) -> usize { self.ids.len() }

    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    /// Records in ranked order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.ids.iter().filter_map(|id| self.generation.record(*id))
    }
}

/// Owner of the current generation.
///
/// Lifecycle: `new` starts empty, every successful `load_all` swaps in a new
/// generation, `teardown` drops it. Loads are serialized; a second caller
/// waits for the running load to finish.
pub struct Engine {
    config: EngineConfig,
    current: RwLock<Option<Arc<Generation>>>,
    // last generation number handed out; also the single-slot load guard
    load_guard: Mutex<u64>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: config.normalized(),
            current: RwLock::new(None),
            load_guard: Mutex::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    /// Load with the configured parallelism.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<GenerationSummary, LoadError> {
        self.load_all(path, self.config.parallelism)
    }

    /// Parse `path`, build a new generation and swap it in. On error the
    /// current generation is left untouched.
    pub fn load_all(&self, path: impl AsRef<Path>, parallelism: usize) -> Result<GenerationSummary, LoadError> {
        let path = path.as_ref();
        let mut last = self.load_guard.lock();

        let loaded = loader::load(path, parallelism).map_err(|err| {
            tracing::warn!(path = %path.display(), error = %err, "load failed, keeping current generation");
            err
        })?;

        let generation = Generation {
            number: *last + 1,
            records: loaded.records,
            index: loaded.index,
            facets: loaded.facets,
            skipped: loaded.skipped,
            loaded_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            load_time: loaded.elapsed,
        };
        let summary = generation.summary();
        *last = generation.number;
        self.swap(generation);

        tracing::info!(
            generation = summary.generation,
            records = summary.records,
            tokens = summary.tokens,
            skipped = summary.skipped,
            parallelism,
            load_ms = summary.load_ms,
            "generation loaded"
        );
        Ok(summary)
    }

    fn swap(&self, generation: Generation) {
        let previous = self.current.write().replace(Arc::new(generation));
        // in-flight queries may still hold the old generation; it is freed
        // when the last of them finishes
        drop(previous);
    }

    pub fn current(&self) -> Option<Arc<Generation>> {
        self.current.read().clone()
    }

    pub fn summary(&self) -> Option<GenerationSummary> {
        self.current().map(|g| g.summary())
    }

    pub fn query(&self, query: &Query) -> Result<QueryResults, QueryError> {
        let generation = self.current().ok_or(QueryError::IndexUnavailable)?;
        let ids = generation.search(query);
        tracing::debug!(generation = generation.number, hits = ids.len(), "query evaluated");
        Ok(QueryResults { generation, ids })
    }

    /// Drop the current generation. Later queries fail with `IndexUnavailable`.
    pub fn teardown(&self) -> Option<Arc<Generation>> {
        let _guard = self.load_guard.lock();
        self.current.write().take()
    }

    /// A worker pool sized from the engine config.
    pub fn worker_pool(&self) -> Result<WorkerPool, PoolError> {
        WorkerPool::new(self.config.pool_size)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
