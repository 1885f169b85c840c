pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod loader;
pub mod pool;
pub mod query;
pub mod record;
pub mod tokenizer;

pub use config::EngineConfig;
pub use engine::{Engine, Generation, GenerationSummary, QueryResults};
pub use error::{LoadError, PoolError, QueryError};
pub use index::{InvertedIndex, PostingSet};
pub use loader::Facets;
pub use pool::WorkerPool;
pub use query::{FieldFilter, Query, SortOrder};
pub use record::{Field, Record, RecordId, Token};
