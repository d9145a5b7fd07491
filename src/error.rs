use thiserror::Error;

#[derive(Error, Debug)]
pub enum IncomeFlowError {
    #[error("No income statement was provided. Retry with clearer source data (e.g. a sharper scan or a document containing the income statement table).")]
    MissingStatement,

    #[error("Invalid income statement: {0}")]
    InvalidStatement(String),

    #[error("Invalid configuration value for {field}: {details}")]
    InvalidConfig { field: String, details: String },

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "ollama")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[cfg(feature = "ollama")]
    #[error("Failed to query model after {attempts} attempts: {message}")]
    ModelQueryFailed { attempts: u32, message: String },
}

pub type Result<T> = std::result::Result<T, IncomeFlowError>;
