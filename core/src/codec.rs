//! Record codec
//!
//! Turns records into the bytes stored in world state and back. Decoding
//! validates the record shape and never yields a partially populated record.

use crate::traits::Record;
use std::marker::PhantomData;
use thiserror::Error;

/// Codec failure
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("record bytes are empty")]
    Empty,

    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid record: {0}")]
    Invalid(String),
}

/// Serialization of a record type to and from bytes
pub trait RecordCodec<R>: Send + Sync {
    /// Encode a record. Fails only if the record does not validate.
    fn encode(&self, record: &R) -> Result<Vec<u8>, CodecError>;

    /// Decode a record, validating its shape
    fn decode(&self, bytes: &[u8]) -> Result<R, CodecError>;
}

/// JSON record codec
///
/// Struct fields serialize in declaration order, so encoding is deterministic.
pub struct JsonCodec<R> {
    _record: PhantomData<fn() -> R>,
}

impl<R> JsonCodec<R> {
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<R> Default for JsonCodec<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for JsonCodec<R> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<R: Record> RecordCodec<R> for JsonCodec<R> {
    fn encode(&self, record: &R) -> Result<Vec<u8>, CodecError> {
        // JSON has no representation for NaN/inf, so validation must run first
        record.validate().map_err(CodecError::Invalid)?;
        Ok(serde_json::to_vec(record)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<R, CodecError> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(CodecError::Empty);
        }

        let record: R = serde_json::from_slice(bytes)?;
        record.validate().map_err(CodecError::Invalid)?;
        Ok(record)
    }
}
