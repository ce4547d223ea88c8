//! Outcome types for enrollment and verification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of a single request through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    Transcribed,
    PhraseValidated,
    EmbeddingExtracted,
    Decided,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Transcribed => "transcribed",
            Self::PhraseValidated => "phrase_validated",
            Self::EmbeddingExtracted => "embedding_extracted",
            Self::Decided => "decided",
        };
        f.write_str(name)
    }
}

/// Why an enrollment or verification did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    TranscriptionFailed,
    PhraseMismatch {
        transcription: String,
        expected: String,
    },
    EmbeddingFailed,
    PersistenceError,
    NotEnrolled,
    /// Carries what was heard; the phrase gate passed before the voices were compared.
    VoiceNotRecognized {
        transcription: String,
    },
}

impl FailureReason {
    /// Fixed, caller-facing message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::TranscriptionFailed => "transcription failed",
            Self::PhraseMismatch { .. } => "phrase mismatch",
            Self::EmbeddingFailed => "embedding extraction failed",
            Self::PersistenceError => "persistence error",
            Self::NotEnrolled => "not enrolled",
            Self::VoiceNotRecognized { .. } => "voice not recognized",
        }
    }

    /// Last stage the request completed before failing.
    pub fn stage(&self) -> Stage {
        match self {
            Self::NotEnrolled | Self::TranscriptionFailed => Stage::Received,
            Self::PhraseMismatch { .. } => Stage::Transcribed,
            Self::EmbeddingFailed => Stage::PhraseValidated,
            Self::PersistenceError | Self::VoiceNotRecognized { .. } => Stage::EmbeddingExtracted,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Similarity and the threshold it was judged against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub similarity: f32,
    pub threshold: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnrollOutcome {
    Success {
        user_id: String,
        transcription: String,
    },
    Failure {
        reason: FailureReason,
    },
}

impl EnrollOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Success { .. } => "voiceprint enrolled",
            Self::Failure { reason } => reason.message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    Success {
        similarity: f32,
        threshold: f32,
        transcription: String,
    },
    /// `comparison` is present only when embeddings were actually compared.
    Failure {
        reason: FailureReason,
        comparison: Option<Comparison>,
    },
}

impl VerifyOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Success { .. } => "authenticated",
            Self::Failure { reason, .. } => reason.message(),
        }
    }

    pub fn comparison(&self) -> Option<Comparison> {
        match self {
            Self::Success {
                similarity,
                threshold,
                ..
            } => Some(Comparison {
                similarity: *similarity,
                threshold: *threshold,
            }),
            Self::Failure { comparison, .. } => *comparison,
        }
    }

    pub(crate) fn failure(reason: FailureReason) -> Self {
        Self::Failure {
            reason,
            comparison: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

impl From<&EnrollOutcome> for EnrollResponse {
    fn from(outcome: &EnrollOutcome) -> Self {
        let message = outcome.message().to_string();
        match outcome {
            EnrollOutcome::Success {
                user_id,
                transcription,
            } => Self {
                success: true,
                message,
                user_id: Some(user_id.clone()),
                transcription: Some(transcription.clone()),
                expected: None,
            },
            EnrollOutcome::Failure { reason } => {
                let (transcription, expected) = echoed_texts(reason);
                Self {
                    success: false,
                    message,
                    user_id: None,
                    transcription,
                    expected,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

impl From<&VerifyOutcome> for VerifyResponse {
    fn from(outcome: &VerifyOutcome) -> Self {
        let comparison = outcome.comparison();
        let (transcription, expected) = match outcome {
            VerifyOutcome::Success { transcription, .. } => (Some(transcription.clone()), None),
            VerifyOutcome::Failure { reason, .. } => echoed_texts(reason),
        };
        Self {
            authenticated: outcome.is_authenticated(),
            similarity: comparison.map(|c| c.similarity),
            threshold: comparison.map(|c| c.threshold),
            message: outcome.message().to_string(),
            transcription,
            expected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserExistsResponse {
    pub exists: bool,
    pub user_id: String,
}

/// Transcription and expected phrase echoed back to the caller, when known.
fn echoed_texts(reason: &FailureReason) -> (Option<String>, Option<String>) {
    match reason {
        FailureReason::PhraseMismatch {
            transcription,
            expected,
        } => (Some(transcription.clone()), Some(expected.clone())),
        FailureReason::VoiceNotRecognized { transcription } => (Some(transcription.clone()), None),
        _ => (None, None),
    }
}
