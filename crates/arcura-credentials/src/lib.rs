//! Credential primitives for Arcura: password hashing and session tokens.
//!
//! Pure synchronous; no HTTP or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use arcura_core::UserId;
//! use arcura_credentials::TokenService;
//!
//! let tokens = TokenService::new(b"0123456789abcdef0123456789abcdef".to_vec()).unwrap();
//! let issued = tokens.issue(UserId::new(1).unwrap()).unwrap();
//! assert_eq!(tokens.verify(&issued.token).unwrap(), UserId::new(1).unwrap());
//! ```

pub mod error;
pub mod password;
pub mod token;

pub use error::{Error, Result, TokenError};
pub use token::{IssuedToken, TokenService};
