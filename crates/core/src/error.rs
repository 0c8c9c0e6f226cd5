//! Codec error model.

use thiserror::Error;

use crate::fullpath::IdentityField;

/// Result type used by the fullpath codec.
pub type FullpathResult<T> = Result<T, FullpathError>;

/// Failure of the fullpath codec.
///
/// Both variants are raised synchronously and are not recoverable by the codec
/// itself; callers decide what to do with a key they cannot build or parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FullpathError {
    /// A required identity field was empty (or a zero version) at encode time.
    #[error("can't encode fullpath: {field} is empty")]
    InvalidIdentity { field: IdentityField },

    /// The fullpath did not split into exactly five segments.
    #[error("'fullpath': wrong format (expected 5 segments, found {segments})")]
    MalformedFullpath { segments: usize },
}

impl FullpathError {
    pub fn invalid_identity(field: IdentityField) -> Self {
        Self::InvalidIdentity { field }
    }

    pub fn malformed(segments: usize) -> Self {
        Self::MalformedFullpath { segments }
    }
}
