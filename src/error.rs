use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    /// A pseudo-filesystem path does not exist. Callers decide whether this
    /// means "subsystem absent", "backstore absent" or a real failure.
    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("backstore lookup failed: {0}")]
    Lookup(String),

    #[error("LUN statistics unavailable: {0}")]
    Stats(String),

    /// The sample channel receiver went away mid-cycle.
    #[error("metrics sink closed")]
    SinkClosed,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
