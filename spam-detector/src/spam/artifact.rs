//! Persisted model artifact
//!
//! A self-describing JSON document holding the vocabulary, the idf weights,
//! the class priors and the likelihood matrix. Saving goes through a
//! temporary file in the target directory that is renamed over the artifact,
//! so an interrupted save leaves the previous artifact untouched.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::vectorizer::DEFAULT_MAX_FEATURES;
use crate::error::{Result, SpamError};

/// Format tag written into every artifact
pub const ARTIFACT_FORMAT: &str = "spam-detector/tfidf-multinomial-nb";

/// Current artifact format version
pub const ARTIFACT_VERSION: u32 = 1;

/// On-disk representation of a trained pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format: String,
    pub version: u32,
    pub alpha: f64,
    /// Vocabulary cap applied when the pipeline is retrained
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    /// Terms in index order
    pub vocabulary: Vec<String>,
    pub idf: Vec<f64>,
    /// `[ham, spam]`
    pub class_log_prior: Vec<f64>,
    /// One row per label, `[ham, spam]`, each of vocabulary length
    pub feature_log_prob: Vec<Vec<f64>>,
}

fn default_max_features() -> usize {
    DEFAULT_MAX_FEATURES
}

impl ModelArtifact {
    /// Check format tag, version and table shapes
    pub fn validate(&self) -> Result<()> {
        if self.format != ARTIFACT_FORMAT {
            return Err(SpamError::ArtifactCorrupt(format!(
                "unknown format '{}'",
                self.format
            )));
        }
        if self.version != ARTIFACT_VERSION {
            return Err(SpamError::ArtifactCorrupt(format!(
                "unsupported version {}",
                self.version
            )));
        }

        let vocab_size = self.vocabulary.len();
        if vocab_size == 0 {
            return Err(SpamError::ArtifactCorrupt("empty vocabulary".to_string()));
        }
        if self.max_features < vocab_size {
            return Err(SpamError::ArtifactCorrupt(format!(
                "vocabulary cap {} is below the {} stored terms",
                self.max_features, vocab_size
            )));
        }
        if self.idf.len() != vocab_size {
            return Err(SpamError::ArtifactCorrupt(format!(
                "idf has {} entries, vocabulary has {}",
                self.idf.len(),
                vocab_size
            )));
        }
        if self.class_log_prior.len() != 2 {
            return Err(SpamError::ArtifactCorrupt(format!(
                "expected 2 class priors, found {}",
                self.class_log_prior.len()
            )));
        }
        if self.feature_log_prob.len() != 2 {
            return Err(SpamError::ArtifactCorrupt(format!(
                "expected 2 likelihood rows, found {}",
                self.feature_log_prob.len()
            )));
        }
        for (label, row) in self.feature_log_prob.iter().enumerate() {
            if row.len() != vocab_size {
                return Err(SpamError::ArtifactCorrupt(format!(
                    "likelihood row {} has {} entries, vocabulary has {}",
                    label,
                    row.len(),
                    vocab_size
                )));
            }
        }

        Ok(())
    }

    /// Parse and validate an artifact document
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)
            .map_err(|e| SpamError::ArtifactCorrupt(format!("malformed artifact: {}", e)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Read an artifact from disk
    pub fn read(path: &Path) -> Result<Self> {
        debug!("Reading model artifact from {}", path.display());
        let bytes = fs::read(path)?;
        Self::from_slice(&bytes)
    }

    /// Atomically replace the artifact at `path`
    pub fn write(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| SpamError::Io(e.error))?;

        info!(
            "Model artifact written to {} ({} terms)",
            path.display(),
            self.vocabulary.len()
        );
        Ok(())
    }
}
