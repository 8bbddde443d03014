//! Error types for cla-signing-store

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Already signed: {0}")]
    AlreadySigned(String),

    #[error("Signing not found: {0}")]
    NotFound(String),

    #[error("CLA org document not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid document id {id}: {reason}")]
    InvalidDocumentId { id: String, reason: String },

    #[error("Malformed document {id}: {reason}")]
    MalformedDocument { id: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`StorageError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AlreadySigned,
    NotFound,
    Store,
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::AlreadySigned(_) => ErrorKind::AlreadySigned,
            StorageError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Store,
        }
    }

    /// True for transport, transaction and decoding failures.
    pub fn is_store_error(&self) -> bool {
        self.kind() == ErrorKind::Store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            StorageError::AlreadySigned("a@b.com".into()).kind(),
            ErrorKind::AlreadySigned
        );
        assert_eq!(StorageError::NotFound("a@b.com".into()).kind(), ErrorKind::NotFound);
        assert!(StorageError::Database(diesel::result::Error::NotFound).is_store_error());
        assert!(StorageError::DocumentNotFound("x".into()).is_store_error());
        assert!(!StorageError::NotFound("x".into()).is_store_error());
    }
}
