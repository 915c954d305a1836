//! TF-IDF vectorizer
//!
//! Turns raw text into an L2-normalized sparse vector over a bounded
//! vocabulary learned from the training texts.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::stop_words::is_stop_word;
use super::types::{Example, SparseVector};
use crate::error::{Result, SpamError};

/// Default vocabulary cap
pub const DEFAULT_MAX_FEATURES: usize = 5000;

/// Split text into normalized tokens.
///
/// Lowercases, splits on every non-alphanumeric character and drops stop
/// words and empty fragments.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty() && !is_stop_word(s))
        .map(str::to_string)
        .collect()
}

/// Learned vocabulary with its idf weights
#[derive(Debug, Clone, PartialEq)]
struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, usize>,
    idf: Vec<f64>,
}

/// TF-IDF vectorizer
#[derive(Debug, Clone)]
pub struct Vectorizer {
    max_features: usize,
    vocabulary: Option<Vocabulary>,
}

impl Vectorizer {
    /// Create an unfitted vectorizer keeping at most `max_features` terms
    pub fn new(max_features: usize) -> Self {
        Self {
            max_features,
            vocabulary: None,
        }
    }

    /// Vocabulary cap used by [`Vectorizer::fit`]
    pub fn max_features(&self) -> usize {
        self.max_features
    }

    /// Rebuild a fitted vectorizer from persisted terms and idf weights.
    ///
    /// `max_features` is the cap applied when the vectorizer is fitted again.
    pub fn from_parts(terms: Vec<String>, idf: Vec<f64>, max_features: usize) -> Result<Self> {
        if max_features < terms.len().max(1) {
            return Err(SpamError::ArtifactCorrupt(format!(
                "vocabulary cap {} is below the {} stored terms",
                max_features,
                terms.len()
            )));
        }
        if terms.len() != idf.len() {
            return Err(SpamError::ArtifactCorrupt(format!(
                "vocabulary has {} terms but idf has {} weights",
                terms.len(),
                idf.len()
            )));
        }
        if let Some(w) = idf.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
            return Err(SpamError::ArtifactCorrupt(format!("invalid idf weight {}", w)));
        }

        let mut index = HashMap::with_capacity(terms.len());
        for (i, term) in terms.iter().enumerate() {
            if index.insert(term.clone(), i).is_some() {
                return Err(SpamError::ArtifactCorrupt(format!("duplicate term '{}'", term)));
            }
        }

        Ok(Self {
            max_features,
            vocabulary: Some(Vocabulary { terms, index, idf }),
        })
    }

    /// Build the vocabulary and idf weights from the training texts.
    ///
    /// Labels are ignored. Terms are ranked by document frequency, ties
    /// broken lexically, and the kept terms are indexed in lexical order.
    pub fn fit(&mut self, corpus: &[Example]) -> Result<()> {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for example in corpus {
            let distinct: HashSet<String> = tokenize(&example.text).into_iter().collect();
            for token in distinct {
                *doc_freq.entry(token).or_insert(0) += 1;
            }
        }

        if doc_freq.is_empty() {
            return Err(SpamError::InsufficientTrainingData(
                "training texts contain no usable tokens".to_string(),
            ));
        }

        let mut ranked: Vec<(String, usize)> = doc_freq.into_iter().collect();
        ranked.sort_by(|(ta, da), (tb, db)| db.cmp(da).then_with(|| ta.cmp(tb)));
        ranked.truncate(self.max_features);
        ranked.sort_by(|(ta, _), (tb, _)| ta.cmp(tb));

        let n = corpus.len() as f64;
        let mut terms = Vec::with_capacity(ranked.len());
        let mut idf = Vec::with_capacity(ranked.len());
        let mut index = HashMap::with_capacity(ranked.len());
        for (i, (term, df)) in ranked.into_iter().enumerate() {
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
            index.insert(term.clone(), i);
            terms.push(term);
        }

        debug!("Vectorizer fitted: {} documents, {} terms", corpus.len(), terms.len());
        self.vocabulary = Some(Vocabulary { terms, index, idf });
        Ok(())
    }

    /// Map a text to its L2-normalized tf-idf vector.
    ///
    /// Text without any in-vocabulary token yields the all-zero vector.
    pub fn transform(&self, text: &str) -> Result<SparseVector> {
        let vocab = self.vocabulary.as_ref().ok_or(SpamError::ModelNotTrained)?;

        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokenize(text) {
            if let Some(&i) = vocab.index.get(&token) {
                *counts.entry(i).or_insert(0.0) += 1.0;
            }
        }

        let weighted: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(i, tf)| (i, tf * vocab.idf[i]))
            .collect();
        let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            return Ok(SparseVector::zeros(vocab.terms.len()));
        }

        let normalized = weighted.into_iter().map(|(i, w)| (i, w / norm)).collect();
        Ok(SparseVector::from_entries(vocab.terms.len(), normalized))
    }

    pub fn is_fitted(&self) -> bool {
        self.vocabulary.is_some()
    }

    /// Number of vocabulary terms, 0 when unfitted
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.as_ref().map_or(0, |v| v.terms.len())
    }

    /// Terms in index order
    pub fn terms(&self) -> &[String] {
        self.vocabulary.as_ref().map_or(&[], |v| v.terms.as_slice())
    }

    /// Idf weights in index order
    pub fn idf(&self) -> &[f64] {
        self.vocabulary.as_ref().map_or(&[], |v| v.idf.as_slice())
    }

    /// Index of a normalized term
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.as_ref().and_then(|v| v.index.get(term).copied())
    }
}

impl Default for Vectorizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FEATURES)
    }
}
