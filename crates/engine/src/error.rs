//! The module contains the errors the engine can return.
//!
//! The errors are:
//!
//! - [`Validation`] bad input, rejected before any side effect.
//! - [`NotFound`] the record is absent, soft-deleted or hard-deleted.
//! - [`Forbidden`] the acting user is not the creator of the record.
//! - [`Storage`] the blob store failed to write (or delete) a receipt file.
//! - [`Corrupted`] a persisted row cannot be mapped back to the domain.
//! - [`Database`] the relational store failed.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`NotFound`]: EngineError::NotFound
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`Storage`]: EngineError::Storage
//!  [`Corrupted`]: EngineError::Corrupted
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Corrupted row: {0}")]
    Corrupted(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// `true` for errors raised by the blob store or the database, i.e. the
    /// ones a caller cannot fix by changing its input.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Corrupted(_) | Self::Database(_)
        )
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::Storage(a), Self::Storage(b)) => a == b,
            (Self::Corrupted(a), Self::Corrupted(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
