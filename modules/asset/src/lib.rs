//! Asset Contract for the asset ledger
//! 
//! Account-like asset records keyed by dealer ID, with:
//! - Create / update / read against the world state
//! - Full change history per dealer

pub mod asset;
pub mod contract;

pub use asset::*;
pub use contract::*;
