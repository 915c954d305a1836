//! REST API module for spam-detector
//!
//! Provides HTTP API endpoints for classification and administration

pub mod admin;
pub mod auth;
pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::{ApiServer, CurrentUser};
