#![forbid(unsafe_code)]

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("semantic error: {message}")]
#[diagnostic(code(nestor::sema))]
pub struct SemaError {
    pub message: String,
}

impl SemaError {
    pub fn unknown_class(path: &str) -> Self {
        Self {
            message: format!("no class named '{path}' in this program"),
        }
    }
}
