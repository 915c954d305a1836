//! Training corpus providers and holdout splitting

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::path::PathBuf;

use super::types::Example;
use crate::error::{Result, SpamError};

/// Source of labeled training messages
#[cfg_attr(test, mockall::automock)]
pub trait CorpusProvider: Send + Sync {
    /// Labeled examples to train on
    fn examples(&self) -> Result<Vec<Example>>;
}

/// The built-in corpus of SMS, email and social messages
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedCorpus;

impl CorpusProvider for EmbeddedCorpus {
    fn examples(&self) -> Result<Vec<Example>> {
        Ok(vec![
            // SMS
            Example::spam("Congratulations! You have won a free cruise to the Bahamas! Text YES to 98765 now!"),
            Example::spam("URGENT! Your mobile number has been selected to win £5000 cash. Call 09061701461 now!"),
            Example::spam("Win a brand new car! Reply WIN to enter the lucky draw."),
            // Email
            Example::spam("Dear user, your mailbox has exceeded its quota. Click here to re-verify your account."),
            Example::spam("You have been pre-approved for a $10,000 loan. Apply now, no credit check required!"),
            Example::spam("Get Viagra at 50% discount. Limited offer!"),
            // Social
            Example::spam("Check out this amazing weight loss product! Lose 10kg in 2 weeks! 🔥 Click the link in bio!"),
            Example::spam("Win free AirPods! Just follow and DM us \"WIN\" to claim your prize!"),
            Example::spam("Get thousands of followers instantly. DM us now! 🚀"),
            // Ham
            Example::ham("Hey, are we still on for lunch tomorrow?"),
            Example::ham("Can you send me the report by EOD?"),
            Example::ham("Happy birthday! Hope you have a wonderful day!"),
            Example::ham("The meeting has been moved to 3pm."),
            Example::ham("Don’t forget to pick up some milk on your way home."),
            Example::ham("Great job on the presentation today!"),
        ])
    }
}

/// Corpus read from a JSON file of `{"text": ..., "label": "spam" | "ham"}` objects
#[derive(Debug, Clone)]
pub struct JsonCorpus {
    path: PathBuf,
}

impl JsonCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorpusProvider for JsonCorpus {
    fn examples(&self) -> Result<Vec<Example>> {
        let content = fs::read(&self.path)?;
        serde_json::from_slice(&content).map_err(|e| {
            SpamError::InvalidInput(format!("corpus {}: {}", self.path.display(), e))
        })
    }
}

/// Deterministically shuffle and split off a test set.
///
/// Returns `(train, test)`. A positive fraction always yields at least one
/// test example; the training side keeps at least one example.
pub fn holdout_split(
    examples: &[Example],
    test_fraction: f64,
    seed: u64,
) -> (Vec<Example>, Vec<Example>) {
    let mut shuffled = examples.to_vec();
    shuffled.shuffle(&mut StdRng::seed_from_u64(seed));

    let n = shuffled.len();
    let mut n_test = if test_fraction > 0.0 {
        ((n as f64 * test_fraction).ceil() as usize).max(1)
    } else {
        0
    };
    n_test = n_test.min(n.saturating_sub(1));

    let test = shuffled.split_off(n - n_test);
    (shuffled, test)
}
