//! Vectorizer + classifier pipeline
//!
//! Trained once, then read-only: predictions borrow the pipeline immutably,
//! so one instance can serve any number of concurrent requests.

use std::path::Path;
use tracing::{info, warn};

use super::artifact::{ModelArtifact, ARTIFACT_FORMAT, ARTIFACT_VERSION};
use super::classifier::NaiveBayesClassifier;
use super::corpus::{holdout_split, CorpusProvider};
use super::types::{Evaluation, Example, Label, ModelSummary, Prediction, TrainingReport};
use super::vectorizer::Vectorizer;
use crate::config::ModelConfig;
use crate::error::{Result, SpamError};

/// Spam classification pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    vectorizer: Vectorizer,
    classifier: NaiveBayesClassifier,
}

impl Pipeline {
    /// Create an untrained pipeline
    pub fn new(max_features: usize, alpha: f64) -> Self {
        Self {
            vectorizer: Vectorizer::new(max_features),
            classifier: NaiveBayesClassifier::new(alpha),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.max_features, config.alpha)
    }

    /// Fit the vectorizer then the classifier.
    ///
    /// Both labels need at least one example. On failure the pipeline is
    /// left as it was.
    pub fn train(&mut self, corpus: &[Example]) -> Result<()> {
        for label in Label::ALL {
            if !corpus.iter().any(|e| e.label == label) {
                return Err(SpamError::InsufficientTrainingData(format!(
                    "corpus has no {:?} examples",
                    label
                )));
            }
        }

        let mut vectorizer = self.vectorizer.clone();
        vectorizer.fit(corpus)?;

        let vectors = corpus
            .iter()
            .map(|e| vectorizer.transform(&e.text))
            .collect::<Result<Vec<_>>>()?;
        let labels: Vec<Label> = corpus.iter().map(|e| e.label).collect();

        let mut classifier = self.classifier.clone();
        classifier.fit(&vectors, &labels)?;

        info!(
            "Pipeline trained on {} examples, {} terms",
            corpus.len(),
            vectorizer.vocabulary_size()
        );
        self.vectorizer = vectorizer;
        self.classifier = classifier;
        Ok(())
    }

    /// Build and train a pipeline in one step
    pub fn trained(config: &ModelConfig, corpus: &[Example]) -> Result<Self> {
        let mut pipeline = Self::from_config(config);
        pipeline.train(corpus)?;
        Ok(pipeline)
    }

    /// `[p(ham), p(spam)]` for a text
    pub fn predict_proba(&self, text: &str) -> Result<[f64; 2]> {
        let vector = self.vectorizer.transform(text)?;
        self.classifier.predict_proba(&vector)
    }

    /// Classify a text; confidence is the probability of the chosen label
    pub fn predict(&self, text: &str) -> Result<Prediction> {
        let proba = self.predict_proba(text)?;
        let label = if proba[1] > proba[0] { Label::Spam } else { Label::Ham };
        Ok(Prediction {
            is_spam: label.is_spam(),
            confidence: proba[label.index()],
        })
    }

    /// Score the pipeline against labeled examples
    pub fn evaluate(&self, examples: &[Example]) -> Result<Evaluation> {
        let mut evaluation = Evaluation::default();
        for example in examples {
            let predicted = Label::from(self.predict(&example.text)?.is_spam);
            evaluation.record(example.label, predicted);
        }
        Ok(evaluation)
    }

    pub fn is_trained(&self) -> bool {
        self.vectorizer.is_fitted() && self.classifier.is_fitted()
    }

    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &NaiveBayesClassifier {
        &self.classifier
    }

    /// Vocabulary size and priors, `None` while untrained
    pub fn summary(&self) -> Option<ModelSummary> {
        let prior = self.classifier.class_log_prior()?;
        Some(ModelSummary {
            vocabulary_size: self.vectorizer.vocabulary_size(),
            ham_prior: prior[Label::Ham.index()].exp(),
            spam_prior: prior[Label::Spam.index()].exp(),
        })
    }

    /// Export the trained tables
    pub fn to_artifact(&self) -> Result<ModelArtifact> {
        let (Some(prior), Some(likelihood)) = (
            self.classifier.class_log_prior(),
            self.classifier.feature_log_prob(),
        ) else {
            return Err(SpamError::ModelNotTrained);
        };
        if !self.vectorizer.is_fitted() {
            return Err(SpamError::ModelNotTrained);
        }

        Ok(ModelArtifact {
            format: ARTIFACT_FORMAT.to_string(),
            version: ARTIFACT_VERSION,
            alpha: self.classifier.alpha(),
            max_features: self.vectorizer.max_features(),
            vocabulary: self.vectorizer.terms().to_vec(),
            idf: self.vectorizer.idf().to_vec(),
            class_log_prior: prior.to_vec(),
            feature_log_prob: likelihood.to_vec(),
        })
    }

    /// Rebuild a trained pipeline from its artifact
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        artifact.validate()?;

        let ModelArtifact {
            alpha,
            max_features,
            vocabulary,
            idf,
            class_log_prior,
            feature_log_prob,
            ..
        } = artifact;

        let prior = [class_log_prior[0], class_log_prior[1]];
        let mut rows = feature_log_prob.into_iter();
        let (Some(ham), Some(spam)) = (rows.next(), rows.next()) else {
            return Err(SpamError::ArtifactCorrupt("missing likelihood rows".to_string()));
        };

        Ok(Self {
            vectorizer: Vectorizer::from_parts(vocabulary, idf, max_features)?,
            classifier: NaiveBayesClassifier::from_parts(alpha, prior, [ham, spam])?,
        })
    }

    /// Persist the trained pipeline, atomically replacing `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        self.to_artifact()?.write(path)
    }

    /// Load a pipeline persisted by [`Pipeline::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let pipeline = Self::from_artifact(ModelArtifact::read(path)?)?;
        info!(
            "Model loaded from {} ({} terms)",
            path.display(),
            pipeline.vectorizer.vocabulary_size()
        );
        Ok(pipeline)
    }

    /// Train on the full corpus and save to `config.path`.
    ///
    /// With a positive `holdout`, a model trained on a seeded split is scored
    /// first. A split that cannot be trained on (one side missing a label) is
    /// logged and skipped; the full-corpus artifact is still written.
    pub fn train_and_save(
        config: &ModelConfig,
        examples: &[Example],
        holdout: f64,
        seed: u64,
    ) -> Result<(Self, TrainingReport)> {
        let evaluation = if holdout > 0.0 {
            let (train_set, test_set) = holdout_split(examples, holdout, seed);
            match Self::trained(config, &train_set).and_then(|p| p.evaluate(&test_set)) {
                Ok(evaluation) => Some(evaluation),
                Err(e) => {
                    warn!("Skipping holdout evaluation: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let pipeline = Self::trained(config, examples)?;
        pipeline.save(Path::new(&config.path))?;
        let summary = pipeline.summary().ok_or(SpamError::ModelNotTrained)?;

        Ok((
            pipeline,
            TrainingReport {
                summary,
                holdout: evaluation,
            },
        ))
    }

    /// Load the artifact at `config.path`, or train from `corpus` and save it.
    ///
    /// A present but corrupt artifact is an error, not a reason to retrain.
    pub fn load_or_train(config: &ModelConfig, corpus: &dyn CorpusProvider) -> Result<Self> {
        let path = Path::new(&config.path);
        if path.exists() {
            return Self::load(path);
        }

        warn!("No model artifact at {}, training from corpus", path.display());
        let pipeline = Self::trained(config, &corpus.examples()?)?;
        pipeline.save(path)?;
        Ok(pipeline)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::from_config(&ModelConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spam::corpus::{EmbeddedCorpus, MockCorpusProvider};
    use tempfile::TempDir;

    const BATTERY: &[&str] = &[
        "Win free AirPods! Just follow and DM us",
        "Can you send me the report by EOD?",
        "Limited offer: click the link to claim your cash prize",
        "See you at the meeting tomorrow",
        "",
        "zzz qqq",
        "WIN WIN WIN",
    ];

    fn trained() -> Pipeline {
        let corpus = EmbeddedCorpus.examples().unwrap();
        Pipeline::trained(&ModelConfig::default(), &corpus).unwrap()
    }

    fn config_in(dir: &TempDir) -> ModelConfig {
        ModelConfig {
            path: dir.path().join("model.json").to_string_lossy().into_owned(),
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_spam_scenario() {
        let prediction = trained().predict("Win free AirPods! Just follow and DM us").unwrap();
        assert!(prediction.is_spam);
        assert!(prediction.confidence >= 0.5);
    }

    #[test]
    fn test_ham_scenario() {
        let prediction = trained().predict("Can you send me the report by EOD?").unwrap();
        assert!(!prediction.is_spam);
        assert!(prediction.confidence >= 0.5);
    }

    #[test]
    fn test_ham_only_corpus_fails() {
        let corpus = vec![Example::ham("lunch tomorrow"), Example::ham("see the report")];
        let mut pipeline = Pipeline::default();
        let result = pipeline.train(&corpus);

        assert!(matches!(result, Err(SpamError::InsufficientTrainingData(_))));
        assert!(!pipeline.is_trained());
    }

    #[test]
    fn test_failed_retrain_keeps_previous_model() {
        let mut pipeline = trained();
        let before = pipeline.predict(BATTERY[0]).unwrap();

        assert!(pipeline.train(&[Example::spam("the"), Example::ham("and")]).is_err());
        assert_eq!(pipeline.predict(BATTERY[0]).unwrap(), before);
    }

    #[test]
    fn test_non_positive_alpha_is_rejected() {
        let corpus = EmbeddedCorpus.examples().unwrap();
        for alpha in [0.0, -1.0, f64::NAN] {
            let mut pipeline = Pipeline::new(5000, alpha);
            let result = pipeline.train(&corpus);

            assert!(matches!(result, Err(SpamError::InvalidInput(_))));
            assert!(!pipeline.is_trained());
        }
    }

    #[test]
    fn test_retrain_after_load_keeps_vocabulary_cap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");

        let small = vec![Example::spam("win cash"), Example::ham("lunch tomorrow")];
        Pipeline::trained(&ModelConfig::default(), &small)
            .unwrap()
            .save(&path)
            .unwrap();

        let mut reloaded = Pipeline::load(&path).unwrap();
        assert_eq!(reloaded.vectorizer().vocabulary_size(), 4);
        assert_eq!(reloaded.vectorizer().max_features(), 5000);

        reloaded.train(&EmbeddedCorpus.examples().unwrap()).unwrap();
        assert_eq!(
            reloaded.vectorizer().vocabulary_size(),
            trained().vectorizer().vocabulary_size()
        );
    }

    #[test]
    fn test_unknown_tokens_give_priors() {
        let pipeline = trained();
        let proba = pipeline.predict_proba("xylophone quasar").unwrap();

        assert!((proba[Label::Spam.index()] - 9.0 / 15.0).abs() < 1e-12);
        assert!((proba[Label::Ham.index()] - 6.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_probability_properties() {
        let pipeline = trained();
        for text in BATTERY {
            let proba = pipeline.predict_proba(text).unwrap();
            assert!((proba[0] + proba[1] - 1.0).abs() < 1e-9);

            let prediction = pipeline.predict(text).unwrap();
            assert_eq!(prediction.is_spam, proba[1] > proba[0]);
            assert!((0.5..=1.0).contains(&prediction.confidence));

            // idempotent
            assert_eq!(pipeline.predict(text).unwrap(), prediction);
        }
    }

    #[test]
    fn test_untrained_pipeline() {
        let pipeline = Pipeline::default();
        assert!(matches!(pipeline.predict("hello"), Err(SpamError::ModelNotTrained)));
        assert!(matches!(pipeline.to_artifact(), Err(SpamError::ModelNotTrained)));
        assert!(pipeline.summary().is_none());
    }

    #[test]
    fn test_save_load_reproduces_predictions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");

        let pipeline = trained();
        pipeline.save(&path).unwrap();
        let reloaded = Pipeline::load(&path).unwrap();

        for text in BATTERY {
            assert_eq!(
                reloaded.predict_proba(text).unwrap(),
                pipeline.predict_proba(text).unwrap()
            );
            assert_eq!(reloaded.predict(text).unwrap(), pipeline.predict(text).unwrap());
        }
        assert_eq!(reloaded.summary(), pipeline.summary());
    }

    #[test]
    fn test_load_or_train_trains_once() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let mut provider = MockCorpusProvider::new();
        provider
            .expect_examples()
            .times(1)
            .returning(|| EmbeddedCorpus.examples());

        let first = Pipeline::load_or_train(&config, &provider).unwrap();
        assert!(Path::new(&config.path).exists());

        // second call loads the artifact; the mock would panic on a second call
        let second = Pipeline::load_or_train(&config, &provider).unwrap();
        assert_eq!(
            second.predict(BATTERY[2]).unwrap(),
            first.predict(BATTERY[2]).unwrap()
        );
    }

    #[test]
    fn test_load_or_train_surfaces_corrupt_artifact() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        std::fs::write(&config.path, b"\x80\x04pickle").unwrap();

        let mut provider = MockCorpusProvider::new();
        provider.expect_examples().never();

        let result = Pipeline::load_or_train(&config, &provider);
        assert!(matches!(result, Err(SpamError::ArtifactCorrupt(_))));
    }

    #[test]
    fn test_train_and_save_survives_unusable_holdout() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        // any split of two examples leaves one side with a single label
        let corpus = vec![Example::spam("win cash now"), Example::ham("lunch tomorrow")];

        let (pipeline, report) = Pipeline::train_and_save(&config, &corpus, 0.5, 7).unwrap();

        assert!(report.holdout.is_none());
        assert_eq!(report.summary.vocabulary_size, 4);
        assert!(pipeline.is_trained());
        assert!(Pipeline::load(Path::new(&config.path)).is_ok());
    }

    #[test]
    fn test_train_and_save_reports_holdout() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let corpus = EmbeddedCorpus.examples().unwrap();

        let (_, report) = Pipeline::train_and_save(&config, &corpus, 0.2, 42).unwrap();
        let evaluation = report.holdout.unwrap();

        assert_eq!(evaluation.total, 3);
        assert!(Path::new(&config.path).exists());
    }

    #[test]
    fn test_evaluate_on_training_data() {
        let corpus = EmbeddedCorpus.examples().unwrap();
        let evaluation = trained().evaluate(&corpus).unwrap();

        assert_eq!(evaluation.total, 15);
        assert_eq!(
            evaluation.true_positives + evaluation.false_negatives,
            9
        );
        assert!(evaluation.accuracy > 0.8);
    }
}
