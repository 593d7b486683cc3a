//! Asset Ledger CLI Library

pub mod commands;

pub use commands::*;
