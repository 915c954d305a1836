//! Security module
//!
//! - [`auth`]: Argon2 password hashing and verification

pub mod auth;

pub use auth::{hash_password, verify_password};
