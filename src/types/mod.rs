use thiserror::Error;

mod domain_types;
mod ids;

pub use domain_types::*;
pub use ids::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid Notion ID format: {0}")]
    InvalidId(String),

    #[error("Invalid node kind: {0} (expected block, page or database)")]
    InvalidKind(String),

    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),

    #[error("Value out of bounds for {field}: {value}, expected {min}..={max}")]
    OutOfBounds {
        field: &'static str,
        value: String,
        min: String,
        max: String,
    },

    #[error("Invalid API key format: {reason}")]
    InvalidApiKey { reason: String },

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}
