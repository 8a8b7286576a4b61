//! Error types for basket analytics

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Item '{item}' is not in the vocabulary")]
    VocabularyMismatch { item: String },

    #[error("Clustering error: {0}")]
    Clustering(String),

    #[error("Analysis interrupted: {0}")]
    Interrupted(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
