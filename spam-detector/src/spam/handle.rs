//! Shared handle to the serving model
//!
//! Readers take a cheap `Arc` snapshot and predict without holding the lock.
//! Retraining builds a complete new pipeline and swaps the reference, so a
//! reader never sees a partially trained model.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::corpus::CorpusProvider;
use super::pipeline::Pipeline;
use super::types::{ModelSummary, Prediction};
use crate::config::ModelConfig;
use crate::error::{Result, SpamError};

/// Process-wide handle to the current pipeline
pub struct ModelHandle {
    current: RwLock<Arc<Pipeline>>,
}

impl ModelHandle {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            current: RwLock::new(Arc::new(pipeline)),
        }
    }

    /// Snapshot of the pipeline serving predictions
    pub async fn current(&self) -> Arc<Pipeline> {
        self.current.read().await.clone()
    }

    /// Classify with the current pipeline
    pub async fn predict(&self, text: &str) -> Result<Prediction> {
        self.current().await.predict(text)
    }

    /// Replace the serving pipeline
    pub async fn swap(&self, pipeline: Pipeline) -> Arc<Pipeline> {
        std::mem::replace(&mut *self.current.write().await, Arc::new(pipeline))
    }

    /// Train a fresh pipeline, persist it, then swap it in.
    ///
    /// Training and the disk write run on the blocking pool. Any failure
    /// leaves both the serving model and the artifact on disk untouched.
    pub async fn retrain(
        &self,
        config: &ModelConfig,
        corpus: Arc<dyn CorpusProvider>,
    ) -> Result<ModelSummary> {
        let config = config.clone();
        let pipeline = tokio::task::spawn_blocking(move || -> Result<Pipeline> {
            let pipeline = Pipeline::trained(&config, &corpus.examples()?)?;
            pipeline.save(&PathBuf::from(&config.path))?;
            Ok(pipeline)
        })
        .await
        .map_err(|e| SpamError::Io(std::io::Error::other(e)))??;

        let summary = pipeline.summary().ok_or(SpamError::ModelNotTrained)?;
        self.swap(pipeline).await;
        info!(
            "Model retrained: {} terms, spam prior {:.3}",
            summary.vocabulary_size, summary.spam_prior
        );
        Ok(summary)
    }
}
