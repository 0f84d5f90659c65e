use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XgError {
    #[error("invalid xG parameter {name}={value}: {reason}")]
    InvalidParam {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("environment variable {key} is not a number: {value:?}")]
    ParseEnv { key: String, value: String },
}
