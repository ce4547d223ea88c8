//! Enrollment and verification state machine.
//!
//! Every stage failure becomes an outcome value. Only the fatal class
//! (bad input container, configuration, an unreachable store, an embedding
//! dimension contract violation) escapes as `Err`.

use crate::audio::wav::check_container;
use crate::config::VerificationConfig;
use crate::defaults;
use crate::embedding::EmbeddingAdapter;
use crate::error::{Result, VoiceAuthError};
use crate::phrase::PhraseMatcher;
use crate::pipeline::types::{Comparison, EnrollOutcome, FailureReason, Stage, VerifyOutcome};
use crate::similarity::cosine_similarity;
use crate::store::VoiceprintStore;
use crate::stt::TranscriptionAdapter;
use std::sync::Arc;

/// Decision thresholds for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Minimum cosine similarity to authenticate
    pub similarity_threshold: f32,
    /// Minimum Jaccard similarity for the spoken phrase
    pub phrase_match_threshold: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: defaults::SIMILARITY_THRESHOLD,
            phrase_match_threshold: defaults::PHRASE_MATCH_THRESHOLD,
        }
    }
}

impl From<&VerificationConfig> for PipelineConfig {
    fn from(config: &VerificationConfig) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            phrase_match_threshold: config.phrase_match_threshold,
        }
    }
}

/// Runs enroll and verify requests against shared adapters and a store.
///
/// Holds no per-request state; any number of threads may call it at once.
pub struct Pipeline {
    transcriber: Arc<TranscriptionAdapter>,
    embedder: Arc<EmbeddingAdapter>,
    store: Arc<dyn VoiceprintStore>,
    matcher: PhraseMatcher,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        transcriber: Arc<TranscriptionAdapter>,
        embedder: Arc<EmbeddingAdapter>,
        store: Arc<dyn VoiceprintStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            transcriber,
            embedder,
            store,
            matcher: PhraseMatcher::new(config.phrase_match_threshold),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn VoiceprintStore> {
        &self.store
    }

    pub fn transcriber(&self) -> &TranscriptionAdapter {
        &self.transcriber
    }

    pub fn embedder(&self) -> &EmbeddingAdapter {
        &self.embedder
    }

    /// Enroll `user_id` from a spoken `expected` phrase, replacing any previous voiceprint.
    pub fn enroll(&self, user_id: &str, audio: &[u8], expected: &str) -> Result<EnrollOutcome> {
        let span = tracing::info_span!("enroll", user_id);
        let _enter = span.enter();

        check_container(audio)?;
        reached(Stage::Received);

        let transcription = match self.transcribe(audio)? {
            Ok(text) => text,
            Err(reason) => return Ok(enroll_failed(reason)),
        };

        if let Err(reason) = self.validate_phrase(&transcription, expected) {
            return Ok(enroll_failed(reason));
        }

        let embedding = match self.embed(audio)? {
            Ok(embedding) => embedding,
            Err(reason) => return Ok(enroll_failed(reason)),
        };

        if let Err(e) = self.store.upsert(user_id, embedding) {
            tracing::error!(error = %e, "failed to persist voiceprint");
            return Ok(enroll_failed(FailureReason::PersistenceError));
        }

        reached(Stage::Decided);
        tracing::info!("voiceprint enrolled");
        Ok(EnrollOutcome::Success {
            user_id: user_id.to_string(),
            transcription,
        })
    }

    /// Verify that `audio` is `user_id` speaking the `expected` phrase.
    pub fn verify(&self, user_id: &str, audio: &[u8], expected: &str) -> Result<VerifyOutcome> {
        let span = tracing::info_span!("verify", user_id);
        let _enter = span.enter();

        check_container(audio)?;
        reached(Stage::Received);

        let stored = match self.store.get(user_id) {
            Ok(Some(voiceprint)) => voiceprint,
            Ok(None) => return Ok(verify_failed(FailureReason::NotEnrolled)),
            Err(e) => {
                tracing::error!(error = %e, "voiceprint lookup failed");
                return Err(match e {
                    VoiceAuthError::StoreUnavailable { .. } => e,
                    other => VoiceAuthError::StoreUnavailable {
                        message: other.to_string(),
                    },
                });
            }
        };

        let transcription = match self.transcribe(audio)? {
            Ok(text) => text,
            Err(reason) => return Ok(verify_failed(reason)),
        };

        if let Err(reason) = self.validate_phrase(&transcription, expected) {
            return Ok(verify_failed(reason));
        }

        let embedding = match self.embed(audio)? {
            Ok(embedding) => embedding,
            Err(reason) => return Ok(verify_failed(reason)),
        };

        let similarity = cosine_similarity(&stored.embedding, &embedding)?;
        let threshold = self.config.similarity_threshold;
        reached(Stage::Decided);

        if similarity >= threshold {
            tracing::info!(similarity, threshold, "voice authenticated");
            Ok(VerifyOutcome::Success {
                similarity,
                threshold,
                transcription,
            })
        } else {
            tracing::info!(similarity, threshold, "voice not recognized");
            Ok(VerifyOutcome::Failure {
                reason: FailureReason::VoiceNotRecognized { transcription },
                comparison: Some(Comparison {
                    similarity,
                    threshold,
                }),
            })
        }
    }

    /// Outer `Err` is fatal; inner `Err` is a transcription-stage failure.
    fn transcribe(&self, audio: &[u8]) -> Result<std::result::Result<String, FailureReason>> {
        match self.transcriber.transcribe(audio) {
            Ok(text) => {
                reached(Stage::Transcribed);
                Ok(Ok(text))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                Ok(Err(FailureReason::TranscriptionFailed))
            }
        }
    }

    fn validate_phrase(
        &self,
        transcription: &str,
        expected: &str,
    ) -> std::result::Result<(), FailureReason> {
        if self.matcher.is_match(transcription, expected) {
            reached(Stage::PhraseValidated);
            Ok(())
        } else {
            Err(FailureReason::PhraseMismatch {
                transcription: transcription.to_string(),
                expected: expected.to_string(),
            })
        }
    }

    fn embed(&self, audio: &[u8]) -> Result<std::result::Result<Vec<f32>, FailureReason>> {
        match self.embedder.extract_embedding(audio) {
            Ok(embedding) => {
                reached(Stage::EmbeddingExtracted);
                Ok(Ok(embedding))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "embedding extraction failed");
                Ok(Err(FailureReason::EmbeddingFailed))
            }
        }
    }
}

fn reached(stage: Stage) {
    tracing::debug!(%stage, "stage reached");
}

fn enroll_failed(reason: FailureReason) -> EnrollOutcome {
    tracing::info!(reason = %reason, after = %reason.stage(), "enrollment rejected");
    EnrollOutcome::Failure { reason }
}

fn verify_failed(reason: FailureReason) -> VerifyOutcome {
    tracing::info!(reason = %reason, after = %reason.stage(), "verification rejected");
    VerifyOutcome::failure(reason)
}
