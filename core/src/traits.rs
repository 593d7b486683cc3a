//! Core traits defining asset ledger interfaces
//!
//! `WorldState` is the contract every backing store (and the host transaction
//! context) implements. `Record` is implemented by the values stored in it.

use crate::types::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Result type for asset ledger operations
pub type LedgerResult<T> = Result<T, crate::error::LedgerError>;

/// Forward-only cursor over the past values of one key, oldest first.
///
/// The cursor holds backend iteration state until it is dropped.
pub type HistoryIter<'a> = Box<dyn Iterator<Item = LedgerResult<KeyModification>> + 'a>;

/// A fixed-shape value stored under its own key
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// The key this record is stored under
    fn key(&self) -> &str;

    /// Check that every field is populated and representable
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// State change operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    /// Overwrite the latest value of a key
    Set { key: String, value: Vec<u8> },
    /// Append a value to the key's history
    Append { key: String, value: Vec<u8> },
}

impl StateChange {
    pub fn key(&self) -> &str {
        match self {
            StateChange::Set { key, .. } | StateChange::Append { key, .. } => key,
        }
    }
}

/// Key-value world state with a per-key history index
pub trait WorldState: Send + Sync {
    /// Get the latest value of a key
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>>;

    /// Check if a key has a live value
    fn exists(&self, key: &str) -> LedgerResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Open a history cursor for a key. A key that was never written yields
    /// an empty cursor.
    fn history(&self, key: &str) -> LedgerResult<HistoryIter<'_>>;

    /// Apply a batch of changes atomically
    fn apply_batch(&self, tx_id: TxId, changes: Vec<StateChange>) -> LedgerResult<StateVersion>;

    /// Get the current state version
    fn version(&self) -> StateVersion;

    /// Write the latest value of a key and record it in the key's history
    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        self.apply_batch(
            TxId::new(),
            vec![
                StateChange::Set {
                    key: key.to_string(),
                    value: value.to_vec(),
                },
                StateChange::Append {
                    key: key.to_string(),
                    value: value.to_vec(),
                },
            ],
        )?;
        Ok(())
    }
}

impl<T: WorldState + ?Sized> WorldState for &T {
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn exists(&self, key: &str) -> LedgerResult<bool> {
        (**self).exists(key)
    }

    fn history(&self, key: &str) -> LedgerResult<HistoryIter<'_>> {
        (**self).history(key)
    }

    fn apply_batch(&self, tx_id: TxId, changes: Vec<StateChange>) -> LedgerResult<StateVersion> {
        (**self).apply_batch(tx_id, changes)
    }

    fn version(&self) -> StateVersion {
        (**self).version()
    }

    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        (**self).put(key, value)
    }
}

impl<T: WorldState + ?Sized> WorldState for Arc<T> {
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn exists(&self, key: &str) -> LedgerResult<bool> {
        (**self).exists(key)
    }

    fn history(&self, key: &str) -> LedgerResult<HistoryIter<'_>> {
        (**self).history(key)
    }

    fn apply_batch(&self, tx_id: TxId, changes: Vec<StateChange>) -> LedgerResult<StateVersion> {
        (**self).apply_batch(tx_id, changes)
    }

    fn version(&self) -> StateVersion {
        (**self).version()
    }

    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        (**self).put(key, value)
    }
}
