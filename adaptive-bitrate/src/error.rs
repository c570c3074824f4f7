use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    /// The ladder cannot be built from this configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to parse {field}: {value:?}")]
    Parse { field: &'static str, value: String },
}
