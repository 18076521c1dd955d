//! Change registry for quitch.
//!
//! The registry records which plan changes are deployed on a target, and
//! keeps an append-only log of every deploy, revert and failure.

mod memory;
mod mysql;
mod store;
mod types;

pub use memory::MemoryRegistry;
pub use mysql::MySqlRegistry;
pub use store::Registry;
pub use types::{ChangeRow, EventKind, EventRow, Identity};
