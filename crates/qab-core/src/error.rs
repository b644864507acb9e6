use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid view mode: {0}")]
    InvalidViewMode(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Spawn error: {0}")]
    Spawn(String),

    #[error("Thumbnail error: {0}")]
    Thumbnail(String),

    #[error("Directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Catalog is not loaded yet")]
    NotLoaded,
}

impl From<qab_types::InvalidViewMode> for Error {
    fn from(err: qab_types::InvalidViewMode) -> Self {
        Error::InvalidViewMode(err.0)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
