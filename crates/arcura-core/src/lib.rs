//! Core types and policy for the Arcura chat backend.
//!
//! No HTTP and no database live here. The crate owns
//! the identity type, the ownership-based authorization policy, the
//! friend-request state machine, and the [`store::ChatStore`] abstraction that
//! storage backends implement.

pub mod account;
pub mod error;
pub mod friendship;
pub mod group;
pub mod identity;
pub mod message;
pub mod policy;
pub mod store;

pub use error::{Error, Result};
pub use identity::UserId;
