use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for field '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("failed to parse environment variable '{key}': {message}")]
    ParseError { key: String, message: String },
}

impl From<ConfigError> for kindred_core::EngineError {
    fn from(err: ConfigError) -> Self {
        kindred_core::EngineError::invalid(err.to_string())
    }
}
