//! Error types for the lint driver.
//!
//! The syntax crate reports structured [`ParseError`]s; this module bridges
//! them together with I/O problems into one error type suitable for CLI
//! reporting.

use skylint_syntax::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkylintError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: file is not valid UTF-8")]
    Utf8 { path: String },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SkylintError {
    pub fn io(path: &str, source: std::io::Error) -> SkylintError {
        SkylintError::Io {
            path: path.to_owned(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SkylintError>;
