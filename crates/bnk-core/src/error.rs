//! Error types for the bnk-core library.

use thiserror::Error;

/// Main error type for the bnk library.
#[derive(Error, Debug)]
pub enum BnkError {
    /// Statement parsing error.
    #[error("statement error: {0}")]
    Statement(#[from] StatementError),

    /// Cache persistence error.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Delegation to the reasoning service failed.
    #[error("delegation error: {0}")]
    Delegation(#[from] DelegationError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to reading a bank statement. These are fatal to a run.
#[derive(Error, Debug)]
pub enum StatementError {
    /// The input contains no XML at all.
    #[error("no XML content found")]
    NoXml,

    /// The XML could not be deserialized.
    #[error("failed to parse XML: {0}")]
    Parse(String),

    /// A date field was not in DD/MM/YYYY form.
    #[error("invalid date in {field}: {value}")]
    InvalidDate { field: String, value: String },

    /// An amount field was not a decimal number.
    #[error("invalid amount in {field}: {value}")]
    InvalidAmount { field: String, value: String },
}

/// Errors related to cache persistence.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Exported cache JSON could not be read back.
    #[error("malformed cache data: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Cache file could not be read or written.
    #[error("cache file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a delegated batch. Caught per batch by the converter.
#[derive(Error, Debug)]
pub enum DelegationError {
    /// The completion backend failed (network, quota, auth...).
    #[error(transparent)]
    Backend(#[from] bnk_reasoning::ReasoningError),

    /// The response text was not the expected JSON.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The response did not cover the batch it answered.
    #[error("response does not match request: {0}")]
    Mismatch(String),

    /// The call did not finish in time.
    #[error("timed out after {0}s")]
    Timeout(u64),
}

/// Result type for the bnk library.
pub type Result<T> = std::result::Result<T, BnkError>;
