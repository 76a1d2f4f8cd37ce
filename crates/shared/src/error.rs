use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Transport,
    Validation,
    NotFound,
}

/// Failures reported by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("store rejected fields: {0}")]
    Validation(String),
    #[error("user {0} not found")]
    NotFound(UserId),
}

impl StoreError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::Transport(_) => ErrorCode::Transport,
            StoreError::Validation(_) => ErrorCode::Validation,
            StoreError::NotFound(_) => ErrorCode::NotFound,
        }
    }
}

/// Local field problems caught before anything is sent to the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("unknown {field} '{value}'")]
    UnknownValue { field: &'static str, value: String },
}
