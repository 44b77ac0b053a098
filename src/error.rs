//! Error types for the projection engine.

use crate::entities::Table;
use crate::types::{EntityId, LogCursor};
use alloy_primitives::Address;
use thiserror::Error;

/// Main error type for indexer operations.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Bootstrap read failed: {0}")]
    BootstrapRead(String),

    #[error("{table} row not found: {id}")]
    NotFound { table: Table, id: EntityId },

    #[error("{table} row already exists: {id}")]
    AlreadyExists { table: Table, id: EntityId },

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Unknown field {field:?} on {table}")]
    UnknownField { table: Table, field: String },

    #[error("Out-of-order event from {contract}: cursor is {cursor}, got {got}")]
    OutOfOrder {
        contract: Address,
        cursor: LogCursor,
        got: LogCursor,
    },

    #[error("Event from unmonitored contract: {0}")]
    UnknownSource(Address),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Store is locked by another process")]
    Locked,

    #[error("Pipeline is closed")]
    PipelineClosed,
}

impl IndexerError {
    /// Whether this error signals an inconsistency between the event stream
    /// and the projected state, as opposed to an environment failure.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            IndexerError::NotFound { .. }
                | IndexerError::AlreadyExists { .. }
                | IndexerError::InvalidTransition(_)
                | IndexerError::OutOfOrder { .. }
                | IndexerError::UnknownSource(_)
        )
    }
}

impl From<serde_json::Error> for IndexerError {
    fn from(e: serde_json::Error) -> Self {
        IndexerError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for IndexerError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        IndexerError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for IndexerError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        IndexerError::Deserialization(e.to_string())
    }
}

/// Result type for indexer operations.
pub type Result<T> = std::result::Result<T, IndexerError>;
