//! Application context: everything a running service needs, built once from config.

use crate::challenge::{ChallengeIssuer, PhraseSource};
use crate::config::Config;
use crate::embedding::EmbeddingAdapter;
use crate::error::{Result, VoiceAuthError};
use crate::pipeline::{EnrollOutcome, Pipeline, PipelineConfig, UserExistsResponse, VerifyOutcome};
use crate::store::{JsonFileStore, VoiceprintStore};
use crate::stt::TranscriptionAdapter;
use std::sync::Arc;
use std::time::Duration;

/// Owns the phrase set, the lazily loaded models and the voiceprint store.
pub struct VoiceAuth {
    config: Config,
    issuer: ChallengeIssuer,
    phrase_source: PhraseSource,
    pipeline: Arc<Pipeline>,
    timeout: Option<Duration>,
}

impl VoiceAuth {
    /// Build the context with the JSON store at `config.store.path`.
    pub fn open(config: Config) -> Result<Self> {
        let store = JsonFileStore::open(&config.store.path)?;
        Self::from_config(config, Arc::new(store))
    }

    /// Build the context around an existing store. Models load on first use.
    pub fn from_config(config: Config, store: Arc<dyn VoiceprintStore>) -> Result<Self> {
        let transcriber = TranscriptionAdapter::from_config(&config.stt, &config.audio);
        let embedder = EmbeddingAdapter::from_config(&config.embedding);
        Self::with_components(config, transcriber, embedder, store)
    }

    /// Build the context from explicit adapters.
    pub fn with_components(
        config: Config,
        transcriber: TranscriptionAdapter,
        embedder: EmbeddingAdapter,
        store: Arc<dyn VoiceprintStore>,
    ) -> Result<Self> {
        config.validate()?;
        let timeout = config.service.timeout()?;

        let issuer = ChallengeIssuer::new();
        let phrase_source = issuer.load_from_file(&config.challenge.phrases_file);

        let pipeline = Pipeline::new(
            Arc::new(transcriber),
            Arc::new(embedder),
            store,
            PipelineConfig::from(&config.verification),
        );

        Ok(Self {
            config,
            issuer,
            phrase_source,
            pipeline: Arc::new(pipeline),
            timeout,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn issuer(&self) -> &ChallengeIssuer {
        &self.issuer
    }

    /// Where the challenge phrases came from at startup.
    pub fn phrase_source(&self) -> &PhraseSource {
        &self.phrase_source
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn challenge(&self) -> String {
        self.issuer.issue()
    }

    /// Load both models now instead of on the first request.
    pub fn preload(&self) -> Result<()> {
        self.pipeline.transcriber().preload()?;
        self.pipeline.embedder().preload()
    }

    pub fn enroll(&self, user_id: &str, audio: &[u8], expected: &str) -> Result<EnrollOutcome> {
        self.pipeline.enroll(user_id, audio, expected)
    }

    pub fn verify(&self, user_id: &str, audio: &[u8], expected: &str) -> Result<VerifyOutcome> {
        self.pipeline.verify(user_id, audio, expected)
    }

    pub fn user_exists(&self, user_id: &str) -> UserExistsResponse {
        UserExistsResponse {
            exists: self.pipeline.store().exists(user_id),
            user_id: user_id.to_string(),
        }
    }

    pub fn delete_user(&self, user_id: &str) -> bool {
        self.pipeline.store().delete(user_id)
    }

    /// [`Self::enroll`] on tokio's blocking pool, bounded by `service.request_timeout`.
    pub async fn enroll_async(
        &self,
        user_id: String,
        audio: Vec<u8>,
        expected: String,
    ) -> Result<EnrollOutcome> {
        let pipeline = Arc::clone(&self.pipeline);
        self.run_blocking(move || pipeline.enroll(&user_id, &audio, &expected))
            .await
    }

    /// [`Self::verify`] on tokio's blocking pool, bounded by `service.request_timeout`.
    pub async fn verify_async(
        &self,
        user_id: String,
        audio: Vec<u8>,
        expected: String,
    ) -> Result<VerifyOutcome> {
        let pipeline = Arc::clone(&self.pipeline);
        self.run_blocking(move || pipeline.verify(&user_id, &audio, &expected))
            .await
    }

    /// A timed-out task keeps running to completion on the blocking pool.
    async fn run_blocking<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::task::spawn_blocking(work);
        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
                tracing::warn!(timeout_s = limit.as_secs_f64(), "request timed out");
                VoiceAuthError::Timeout {
                    seconds: limit.as_secs_f64(),
                }
            })?,
            None => task.await,
        };
        joined.map_err(|e| VoiceAuthError::Other(format!("pipeline task failed: {}", e)))?
    }
}
