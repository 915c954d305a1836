//! Multinomial naive Bayes classifier over tf-idf vectors

use tracing::debug;

use super::types::{Label, SparseVector};
use crate::error::{Result, SpamError};

/// Default additive smoothing
pub const DEFAULT_ALPHA: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
struct NbParams {
    /// Log prior per label, indexed by [`Label::index`]
    class_log_prior: [f64; 2],
    /// Smoothed log likelihood per label and feature
    feature_log_prob: [Vec<f64>; 2],
}

/// Multinomial naive Bayes classifier
#[derive(Debug, Clone)]
pub struct NaiveBayesClassifier {
    alpha: f64,
    params: Option<NbParams>,
}

impl NaiveBayesClassifier {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, params: None }
    }

    /// Rebuild a fitted classifier from persisted tables
    pub fn from_parts(
        alpha: f64,
        class_log_prior: [f64; 2],
        feature_log_prob: [Vec<f64>; 2],
    ) -> Result<Self> {
        if !(alpha.is_finite() && alpha > 0.0) {
            return Err(SpamError::ArtifactCorrupt(format!("invalid alpha {}", alpha)));
        }
        if feature_log_prob[0].len() != feature_log_prob[1].len() {
            return Err(SpamError::ArtifactCorrupt(format!(
                "likelihood rows differ in length: {} vs {}",
                feature_log_prob[0].len(),
                feature_log_prob[1].len()
            )));
        }
        let all_finite = class_log_prior
            .iter()
            .chain(feature_log_prob.iter().flatten())
            .all(|p| p.is_finite() && *p <= 0.0);
        if !all_finite {
            return Err(SpamError::ArtifactCorrupt(
                "log probabilities must be finite and non-positive".to_string(),
            ));
        }

        Ok(Self {
            alpha,
            params: Some(NbParams {
                class_log_prior,
                feature_log_prob,
            }),
        })
    }

    /// Estimate priors and smoothed likelihoods.
    ///
    /// Every label needs at least one example, the vectors must share a
    /// non-zero dimension and alpha must be positive.
    pub fn fit(&mut self, vectors: &[SparseVector], labels: &[Label]) -> Result<()> {
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(SpamError::InvalidInput(format!(
                "smoothing alpha must be a positive number, got {}",
                self.alpha
            )));
        }
        if vectors.len() != labels.len() {
            return Err(SpamError::InsufficientTrainingData(format!(
                "{} vectors but {} labels",
                vectors.len(),
                labels.len()
            )));
        }
        let dim = vectors.first().map_or(0, SparseVector::dim);
        if dim == 0 {
            return Err(SpamError::InsufficientTrainingData("empty vocabulary".to_string()));
        }
        if vectors.iter().any(|v| v.dim() != dim) {
            return Err(SpamError::InsufficientTrainingData(
                "feature vectors differ in dimension".to_string(),
            ));
        }

        let mut counts = [0usize; 2];
        let mut totals = [vec![0.0f64; dim], vec![0.0f64; dim]];
        for (vector, label) in vectors.iter().zip(labels) {
            let row = label.index();
            counts[row] += 1;
            for &(i, w) in vector.entries() {
                totals[row][i] += w;
            }
        }

        for label in Label::ALL {
            if counts[label.index()] == 0 {
                return Err(SpamError::InsufficientTrainingData(format!(
                    "no {:?} examples",
                    label
                )));
            }
        }

        let total = vectors.len() as f64;
        let class_log_prior = [
            (counts[0] as f64 / total).ln(),
            (counts[1] as f64 / total).ln(),
        ];

        let alpha = self.alpha;
        let feature_log_prob = totals.map(|row| {
            let denom = row.iter().sum::<f64>() + alpha * dim as f64;
            row.into_iter().map(|t| ((t + alpha) / denom).ln()).collect::<Vec<_>>()
        });

        debug!(
            "Classifier fitted: {} ham, {} spam, {} features",
            counts[0], counts[1], dim
        );
        self.params = Some(NbParams {
            class_log_prior,
            feature_log_prob,
        });
        Ok(())
    }

    /// Joint log score per label
    pub fn log_scores(&self, vector: &SparseVector) -> Result<[f64; 2]> {
        let params = self.params.as_ref().ok_or(SpamError::ModelNotTrained)?;
        let dim = params.feature_log_prob[0].len();
        if vector.dim() != dim {
            return Err(SpamError::InvalidInput(format!(
                "feature vector has dimension {}, model expects {}",
                vector.dim(),
                dim
            )));
        }

        let mut scores = params.class_log_prior;
        for &(i, w) in vector.entries().iter().filter(|(_, w)| *w > 0.0) {
            scores[0] += w * params.feature_log_prob[0][i];
            scores[1] += w * params.feature_log_prob[1][i];
        }
        Ok(scores)
    }

    /// Normalized probability per label, `[p(ham), p(spam)]`
    pub fn predict_proba(&self, vector: &SparseVector) -> Result<[f64; 2]> {
        let scores = self.log_scores(vector)?;
        let max = scores[0].max(scores[1]);
        let exp = scores.map(|s| (s - max).exp());
        let sum = exp[0] + exp[1];
        Ok(exp.map(|e| e / sum))
    }

    /// Most probable label; an exact tie resolves to ham
    pub fn predict(&self, vector: &SparseVector) -> Result<Label> {
        let proba = self.predict_proba(vector)?;
        Ok(if proba[1] > proba[0] { Label::Spam } else { Label::Ham })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    pub fn class_log_prior(&self) -> Option<[f64; 2]> {
        self.params.as_ref().map(|p| p.class_log_prior)
    }

    pub fn feature_log_prob(&self) -> Option<&[Vec<f64>; 2]> {
        self.params.as_ref().map(|p| &p.feature_log_prob)
    }
}

impl Default for NaiveBayesClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(dim: usize, entries: Vec<(usize, f64)>) -> SparseVector {
        SparseVector::from_entries(dim, entries)
    }

    fn fitted() -> NaiveBayesClassifier {
        let vectors = vec![
            unit(3, vec![(0, 1.0)]),
            unit(3, vec![(0, 0.6), (1, 0.8)]),
            unit(3, vec![(2, 1.0)]),
        ];
        let labels = vec![Label::Spam, Label::Spam, Label::Ham];
        let mut nb = NaiveBayesClassifier::default();
        nb.fit(&vectors, &labels).unwrap();
        nb
    }

    #[test]
    fn test_priors() {
        let nb = fitted();
        let prior = nb.class_log_prior().unwrap();
        assert!((prior[Label::Spam.index()].exp() - 2.0 / 3.0).abs() < 1e-12);
        assert!((prior[Label::Ham.index()].exp() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_smoothed_likelihoods() {
        let nb = fitted();
        let lp = nb.feature_log_prob().unwrap();

        // spam totals [1.6, 0.8, 0.0], sum 2.4, + alpha * 3
        let spam = &lp[Label::Spam.index()];
        assert!((spam[0].exp() - 2.6 / 5.4).abs() < 1e-12);
        assert!((spam[2].exp() - 1.0 / 5.4).abs() < 1e-12);

        // each row is a distribution over features
        for row in lp {
            let sum: f64 = row.iter().map(|p| p.exp()).sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_predict() {
        let nb = fitted();
        assert_eq!(nb.predict(&unit(3, vec![(0, 1.0)])).unwrap(), Label::Spam);
        assert_eq!(nb.predict(&unit(3, vec![(2, 1.0)])).unwrap(), Label::Ham);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let nb = fitted();
        for v in [
            unit(3, vec![(0, 1.0)]),
            unit(3, vec![(1, 0.3), (2, 0.9)]),
            SparseVector::zeros(3),
        ] {
            let p = nb.predict_proba(&v).unwrap();
            assert!((p[0] + p[1] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_vector_returns_priors() {
        let nb = fitted();
        let p = nb.predict_proba(&SparseVector::zeros(3)).unwrap();
        assert!((p[1] - 2.0 / 3.0).abs() < 1e-12);
        assert!((p[0] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_tie_resolves_to_ham() {
        let nb = NaiveBayesClassifier::from_parts(
            1.0,
            [0.5f64.ln(), 0.5f64.ln()],
            [vec![0.5f64.ln(); 2], vec![0.5f64.ln(); 2]],
        )
        .unwrap();

        let v = unit(2, vec![(0, 1.0)]);
        assert_eq!(nb.predict_proba(&v).unwrap(), [0.5, 0.5]);
        assert_eq!(nb.predict(&v).unwrap(), Label::Ham);
    }

    #[test]
    fn test_single_label_fails() {
        let mut nb = NaiveBayesClassifier::default();
        let result = nb.fit(&[unit(2, vec![(0, 1.0)])], &[Label::Ham]);
        assert!(matches!(result, Err(SpamError::InsufficientTrainingData(_))));
        assert!(!nb.is_fitted());
    }

    #[test]
    fn test_invalid_alpha_fails() {
        let vectors = vec![unit(2, vec![(0, 1.0)]), unit(2, vec![(1, 1.0)])];
        let labels = vec![Label::Spam, Label::Ham];

        for alpha in [0.0, -0.5, f64::INFINITY] {
            let mut nb = NaiveBayesClassifier::new(alpha);
            let result = nb.fit(&vectors, &labels);
            assert!(matches!(result, Err(SpamError::InvalidInput(_))));
            assert!(!nb.is_fitted());
        }
    }

    #[test]
    fn test_empty_vocabulary_fails() {
        let mut nb = NaiveBayesClassifier::default();
        let vectors = vec![SparseVector::zeros(0), SparseVector::zeros(0)];
        let result = nb.fit(&vectors, &[Label::Ham, Label::Spam]);
        assert!(matches!(result, Err(SpamError::InsufficientTrainingData(_))));
    }

    #[test]
    fn test_unfitted_and_dimension_mismatch() {
        let nb = NaiveBayesClassifier::default();
        assert!(matches!(
            nb.predict(&SparseVector::zeros(3)),
            Err(SpamError::ModelNotTrained)
        ));

        let nb = fitted();
        assert!(matches!(
            nb.predict(&SparseVector::zeros(4)),
            Err(SpamError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_from_parts_rejects_bad_tables() {
        let result = NaiveBayesClassifier::from_parts(1.0, [-0.7, -0.7], [vec![-1.0], vec![]]);
        assert!(matches!(result, Err(SpamError::ArtifactCorrupt(_))));

        let result =
            NaiveBayesClassifier::from_parts(1.0, [f64::NAN, -0.7], [vec![-1.0], vec![-1.0]]);
        assert!(matches!(result, Err(SpamError::ArtifactCorrupt(_))));
    }
}
