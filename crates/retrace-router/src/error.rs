//! Router error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("Navigation to {path} faulted: {message}")]
    Fault { path: String, message: String },
}
