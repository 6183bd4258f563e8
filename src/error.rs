use crate::container::ContainerError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagError {
    #[error("Tagger error: {0}")]
    Generic(String),
    #[error("Unsupported container format: {format}")]
    UnsupportedContainerFormat { format: String },
    #[error("Failed to read cover image {path}: {source}")]
    CoverReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to save tags to {path}: {reason}")]
    TagSavingFailure { path: PathBuf, reason: String },
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error("Invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },
    #[error("File appears more than once in the batch: {path}")]
    DuplicatePath { path: PathBuf },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TagError>;
