//! Asset Ledger Node Implementation
//! 
//! Hosts the asset contract:
//! - World state backend selection
//! - Transaction boundary and writer serialization
//! - HTTP API

mod api;
mod node;
mod runtime;

pub use api::*;
pub use node::*;
pub use runtime::*;
