//! Spam classification module
//!
//! TF-IDF vectorizer feeding a multinomial naive Bayes classifier, the
//! pipeline composing them and the persisted artifact format.

pub mod artifact;
pub mod classifier;
pub mod corpus;
pub mod handle;
pub mod pipeline;
pub mod stop_words;
pub mod types;
pub mod vectorizer;

pub use artifact::ModelArtifact;
pub use classifier::NaiveBayesClassifier;
pub use corpus::{holdout_split, CorpusProvider, EmbeddedCorpus, JsonCorpus};
pub use handle::ModelHandle;
pub use pipeline::Pipeline;
pub use types::*;
pub use vectorizer::{tokenize, Vectorizer};
