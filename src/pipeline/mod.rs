//! Enrollment and verification pipeline.

pub mod orchestrator;
pub mod types;

pub use orchestrator::{Pipeline, PipelineConfig};
pub use types::{
    Comparison, EnrollOutcome, EnrollResponse, FailureReason, Stage, UserExistsResponse,
    VerifyOutcome, VerifyResponse,
};
