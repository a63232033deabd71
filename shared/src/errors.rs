//! Shared error types for the supervisor workspace

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Invalid port range: start={start}, len={len}")]
    InvalidPortRange { start: u16, len: u16 },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },
}

impl SharedError {
    pub fn invalid_config(field: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            value: value.to_string(),
        }
    }
}

pub type SharedResult<T> = Result<T, SharedError>;
