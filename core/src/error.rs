//! Error types for the asset ledger

use crate::codec::CodecError;
use thiserror::Error;

/// Main error type for the asset ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    // ============ Existence Errors ============
    #[error("Asset {key} already exists")]
    AlreadyExists { key: String },

    #[error("Asset {key} does not exist")]
    NotFound { key: String },

    #[error("Record key mismatch: expected {expected}, got {got}")]
    KeyMismatch { expected: String, got: String },

    // ============ Codec Errors ============
    #[error("Failed to encode record {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("Failed to decode record {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: CodecError,
    },

    // ============ Storage Errors ============
    #[error("Store {op} failed for {key}: {reason}")]
    StoreIo {
        op: &'static str,
        key: String,
        reason: String,
    },

    // ============ Configuration Errors ============
    #[error("Configuration error: {0}")]
    Config(String),

    // ============ General Errors ============
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LedgerError {
    /// Build a store I/O error for an operation on a key
    pub fn store_io(op: &'static str, key: impl Into<String>, reason: impl ToString) -> Self {
        LedgerError::StoreIo {
            op,
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// The key the failed operation targeted, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            LedgerError::AlreadyExists { key }
            | LedgerError::NotFound { key }
            | LedgerError::Encode { key, .. }
            | LedgerError::Decode { key, .. }
            | LedgerError::StoreIo { key, .. } => Some(key),
            LedgerError::KeyMismatch { expected, .. } => Some(expected),
            LedgerError::Config(_) | LedgerError::Other(_) => None,
        }
    }
}
