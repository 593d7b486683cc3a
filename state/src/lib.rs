//! Asset Ledger State Management
//! 
//! World state backends plus the record-level State Store and History Log
//! built on top of them. State = { key → latest value } and, per key, an
//! append-only list of every value the key has held.

pub mod memory;
pub mod persistent;
pub mod store;
pub mod history;
pub mod transaction;

pub use memory::*;
pub use persistent::*;
pub use store::*;
pub use history::*;
pub use transaction::*;
