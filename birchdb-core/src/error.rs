use std::fmt::{Display, Formatter};

use crate::{bptree::node, meta};

/// A `Result` type that all API calls in BirchDB will return.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible error cases that can be returned by API calls in BirchDB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The backing store reported a failure. The tree does not retry and does
    /// not roll back; the caller must assume partial application.
    Store,
    /// The metadata record is not in the expected format or version.
    MetadataInvalid,
    /// A node record is missing or malformed.
    Corrupted,
}

#[derive(Debug)]
pub struct Error {
    code: ErrorCode,
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl Display for ErrorCode {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Store => "backing store error",
            Self::MetadataInvalid => "unexpected metadata record",
            Self::Corrupted => "tree is corrupted",
        })
    }
}

impl Error {
    #[inline]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Wraps a backing-store failure. Store implementations use this to
    /// surface their own error types through the tree unchanged.
    #[inline]
    pub fn store(source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self {
            code: ErrorCode::Store,
            source: source.into(),
        }
    }
}

impl Display for Error {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.source)
    }
}

impl std::error::Error for Error {
    #[inline]
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<meta::ValidationError> for Error {
    #[inline]
    fn from(value: meta::ValidationError) -> Self {
        Self {
            code: ErrorCode::MetadataInvalid,
            source: Box::new(value),
        }
    }
}

impl From<node::NodeError> for Error {
    #[inline]
    fn from(value: node::NodeError) -> Self {
        Self {
            code: ErrorCode::Corrupted,
            source: Box::new(value),
        }
    }
}
