//! # Gateway Auth Module
//!
//! Token-based access control for the command gateway:
//! identity verification against a keyring, password-less login tokens,
//! and the access gate that guards every protected operation.

pub mod crypto;
pub mod errors;
pub mod gate;
pub mod identity;
pub mod token;

pub use errors::{AuthError, AuthResult};
pub use gate::{AccessGate, Credentials, Principal};
pub use identity::{IdentityVerifier, KeyringEntry, KeyringVerifier};
pub use token::TokenStore;
