//! Asset Ledger Core Library
//! 
//! Core types, traits, and abstractions shared by the state backends,
//! the asset contract and the node host.

pub mod types;
pub mod traits;
pub mod error;
pub mod codec;
pub mod config;

pub use types::*;
pub use traits::*;
pub use error::*;
pub use codec::*;
pub use config::*;
