//! Domain types and rules shared by every Gatehouse crate.
//!
//! - [`types`] -- primitive aliases (database ids, timestamps).
//! - [`error`] -- the domain error taxonomy.
//! - [`identity`] -- email normalization/validation and the derived
//!   confirmation state machine.

pub mod error;
pub mod identity;
pub mod types;
