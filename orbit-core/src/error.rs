use std::path::PathBuf;

use thiserror::Error;

/// Domain errors shared by every compilation phase.
///
/// The taxonomy is deliberately small: source IO, input validation,
/// and an opaque compilation bucket for anything the lexer, parser,
/// type resolver or code generator rejects. `Serialization` exists
/// for completeness; the tagged-tree serializer is total and does not
/// produce it.
#[derive(Debug, Error)]
pub enum OrbitError {
    #[error("could not find Orbit source file at {0}")]
    SourceNotFound(PathBuf),
    #[error("could not read Orbit source file at {0}: {1}")]
    SourceIo(PathBuf, std::io::Error),
    #[error("source file at {0} is not valid UTF-8 text")]
    SourceEncoding(PathBuf),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Compilation(String),
    #[error("could not serialize syntax tree: {0}")]
    Serialization(String),
}

impl OrbitError {
    /// True for errors raised while locating or reading source text.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            OrbitError::SourceNotFound(_)
                | OrbitError::SourceIo(_, _)
                | OrbitError::SourceEncoding(_)
        )
    }
}
