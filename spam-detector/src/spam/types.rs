//! Spam types and data structures

use serde::{Deserialize, Serialize};

/// Binary class label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Not spam (0)
    Ham,
    /// Spam (1)
    Spam,
}

impl Label {
    /// Both labels, in index order
    pub const ALL: [Label; 2] = [Label::Ham, Label::Spam];

    /// Row index of this label in prior/likelihood tables
    pub fn index(self) -> usize {
        match self {
            Label::Ham => 0,
            Label::Spam => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Label::Ham),
            1 => Some(Label::Spam),
            _ => None,
        }
    }

    pub fn is_spam(self) -> bool {
        self == Label::Spam
    }
}

impl From<bool> for Label {
    fn from(is_spam: bool) -> Self {
        if is_spam {
            Label::Spam
        } else {
            Label::Ham
        }
    }
}

/// A labeled training message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub text: String,
    pub label: Label,
}

impl Example {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }

    pub fn spam(text: impl Into<String>) -> Self {
        Self::new(text, Label::Spam)
    }

    pub fn ham(text: impl Into<String>) -> Self {
        Self::new(text, Label::Ham)
    }
}

/// Sparse feature vector over a fixed vocabulary.
///
/// Entries are sorted by index and never hold a zero weight; the all-zero
/// vector has no entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseVector {
    dim: usize,
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// The all-zero vector of the given dimension
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            entries: Vec::new(),
        }
    }

    /// Build from `(index, weight)` pairs; zero weights are dropped
    pub fn from_entries(dim: usize, mut entries: Vec<(usize, f64)>) -> Self {
        entries.retain(|&(i, w)| i < dim && w != 0.0);
        entries.sort_by_key(|&(i, _)| i);
        Self { dim, entries }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> f64 {
        self.entries
            .binary_search_by_key(&index, |&(i, _)| i)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0.0)
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    /// Dense copy, mostly useful in tests
    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.dim];
        for &(i, w) in &self.entries {
            dense[i] = w;
        }
        dense
    }
}

/// Result of classifying one message
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub is_spam: bool,
    /// Probability of the predicted label, always >= 0.5
    pub confidence: f64,
}

/// Confusion counts over a labeled set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl Evaluation {
    pub(crate) fn record(&mut self, expected: Label, predicted: Label) {
        self.total += 1;
        match (expected, predicted) {
            (Label::Spam, Label::Spam) => self.true_positives += 1,
            (Label::Ham, Label::Spam) => self.false_positives += 1,
            (Label::Ham, Label::Ham) => self.true_negatives += 1,
            (Label::Spam, Label::Ham) => self.false_negatives += 1,
        }
        if expected == predicted {
            self.correct += 1;
        }
        self.accuracy = self.correct as f64 / self.total as f64;
    }
}

/// Summary of the model currently serving predictions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub vocabulary_size: usize,
    pub spam_prior: f64,
    pub ham_prior: f64,
}

/// Outcome of [`Pipeline::train_and_save`](super::Pipeline::train_and_save)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub summary: ModelSummary,
    /// Holdout scores, `None` when no split was requested or it was unusable
    pub holdout: Option<Evaluation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_vector_drops_zeros_and_sorts() {
        let v = SparseVector::from_entries(5, vec![(3, 0.5), (1, 0.0), (0, 0.25), (9, 1.0)]);
        assert_eq!(v.entries(), &[(0, 0.25), (3, 0.5)]);
        assert_eq!(v.get(3), 0.5);
        assert_eq!(v.get(1), 0.0);
        assert_eq!(v.to_dense(), vec![0.25, 0.0, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn test_zero_vector() {
        let v = SparseVector::zeros(4);
        assert!(v.is_zero());
        assert_eq!(v.norm(), 0.0);
        assert_eq!(v.dim(), 4);
    }

    #[test]
    fn test_label_index_roundtrip() {
        for label in Label::ALL {
            assert_eq!(Label::from_index(label.index()), Some(label));
        }
        assert_eq!(Label::from_index(2), None);
        assert_eq!(Label::from(true), Label::Spam);
    }

    #[test]
    fn test_evaluation_counts() {
        let mut eval = Evaluation::default();
        eval.record(Label::Spam, Label::Spam);
        eval.record(Label::Ham, Label::Spam);
        eval.record(Label::Ham, Label::Ham);
        eval.record(Label::Spam, Label::Ham);

        assert_eq!(eval.total, 4);
        assert_eq!(eval.correct, 2);
        assert_eq!(eval.accuracy, 0.5);
        assert_eq!(eval.true_positives, 1);
        assert_eq!(eval.false_negatives, 1);
    }
}
