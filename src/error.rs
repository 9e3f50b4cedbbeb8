//! Error types for the Nishiki transpiler

use thiserror::Error;

/// Main error type for Nishiki
#[derive(Debug, Error)]
pub enum NishikiError {
    #[error("Unsupported node in {pod}::{type_name}: {kind}")]
    UnsupportedNode {
        pod: String,
        type_name: String,
        kind: String,
    },

    #[error("Invariant violation in {pod}::{type_name}: {message}")]
    Invariant {
        pod: String,
        type_name: String,
        message: String,
    },

    #[error("Emit error for {pod}::{type_name}: {message}")]
    EmitError {
        pod: String,
        type_name: String,
        message: String,
    },

    #[error("Bad pod input: {0}")]
    BadInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NishikiError>;
