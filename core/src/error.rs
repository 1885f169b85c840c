use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a whole load. Malformed rows are never reported
/// here; the loader skips them.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("source {path} unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parallelism must be at least 1")]
    InvalidParallelism,

    #[error("could not start loader threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    /// No load has completed yet.
    #[error("index unavailable: no generation has been loaded")]
    IndexUnavailable,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool is shut down")]
    ShutDown,

    #[error("worker pool size must be at least 1")]
    InvalidSize,

    #[error("could not spawn worker thread: {0}")]
    Spawn(String),
}
