use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FindexError {
    #[error("Root directory does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("Filesystem error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache error: {0}")]
    Cache(String),
}

pub type Result<T> = std::result::Result<T, FindexError>;
