//! Record-level state store
//!
//! Maps a key to the latest encoded record. Creation requires the key to be
//! absent, update and read require it to be live. Every successful write also
//! appends the record to the key's history in the same batch.

use assetledger_core::{
    LedgerError, LedgerResult, Record, RecordCodec, StateChange, TxId, WorldState,
};
use std::marker::PhantomData;
use tracing::debug;

/// Latest-value store for records of type `R`
pub struct StateStore<W, R, C> {
    world: W,
    codec: C,
    _record: PhantomData<fn() -> R>,
}

impl<W, R, C> StateStore<W, R, C>
where
    W: WorldState,
    R: Record,
    C: RecordCodec<R>,
{
    pub fn new(world: W, codec: C) -> Self {
        Self {
            world,
            codec,
            _record: PhantomData,
        }
    }

    /// Check if a key has a live record
    pub fn exists(&self, key: &str) -> LedgerResult<bool> {
        self.world.exists(key)
    }

    /// Store a record under a key that does not exist yet
    pub fn create(&self, key: &str, record: &R) -> LedgerResult<()> {
        if self.exists(key)? {
            return Err(LedgerError::AlreadyExists {
                key: key.to_string(),
            });
        }

        self.write("create", key, record)
    }

    /// Replace the record of a live key
    pub fn update(&self, key: &str, record: &R) -> LedgerResult<()> {
        if !self.exists(key)? {
            return Err(LedgerError::NotFound {
                key: key.to_string(),
            });
        }

        self.write("update", key, record)
    }

    /// Read the current record of a live key
    pub fn read(&self, key: &str) -> LedgerResult<R> {
        let bytes = self.world.get(key)?.ok_or_else(|| LedgerError::NotFound {
            key: key.to_string(),
        })?;

        self.codec.decode(&bytes).map_err(|source| LedgerError::Decode {
            key: key.to_string(),
            source,
        })
    }

    fn write(&self, op: &'static str, key: &str, record: &R) -> LedgerResult<()> {
        if record.key() != key {
            return Err(LedgerError::KeyMismatch {
                expected: key.to_string(),
                got: record.key().to_string(),
            });
        }

        let bytes = self.codec.encode(record).map_err(|source| LedgerError::Encode {
            key: key.to_string(),
            source,
        })?;

        let changes = vec![
            StateChange::Set {
                key: key.to_string(),
                value: bytes.clone(),
            },
            StateChange::Append {
                key: key.to_string(),
                value: bytes,
            },
        ];
        let version = self.world.apply_batch(TxId::new(), changes)?;

        debug!("{} {} at {}", op, key, version);
        Ok(())
    }

    /// Underlying world state
    pub fn world(&self) -> &W {
        &self.world
    }
}
