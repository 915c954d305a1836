//! spam-detector: short-message spam classification service
//!
//! Classifies email, SMS and social messages as spam or not-spam with a
//! TF-IDF + multinomial naive Bayes pipeline, records classification history
//! and serves both behind a JWT-authenticated HTTP API.
//!
//! # Example
//!
//! ```no_run
//! use spam_detector::config::ModelConfig;
//! use spam_detector::spam::{EmbeddedCorpus, Pipeline};
//!
//! # fn main() -> spam_detector::Result<()> {
//! let pipeline = Pipeline::load_or_train(&ModelConfig::default(), &EmbeddedCorpus)?;
//! let prediction = pipeline.predict("Win free AirPods! Just follow and DM us")?;
//! assert!(prediction.is_spam);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`spam`]: vectorizer, classifier, pipeline and model artifact
//! - [`storage`]: users and classification history (SQLite)
//! - [`api`]: REST API
//! - [`security`]: password hashing
//! - [`config`]: configuration management
//! - [`error`]: error types

pub mod api;
pub mod config;
pub mod error;
pub mod security;
pub mod spam;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, SpamError};
