//! Data models for assess-import

pub mod batch;
pub mod payload;
pub mod validation;

pub use batch::{
    ExecuteOutcome, ExecuteRequest, ImportBatch, ImportRequest, ResolvedAssessment,
    ResolvedResponse, RollbackSummary, DEFAULT_SOURCE,
};
pub use payload::{
    ExternalAnswer, ExternalAssessment, ExternalQuestion, ExternalScale, ImportPayload,
    ParsedPayload,
};
pub use validation::{MatchBand, QuestionMatch, ResponseStats, ValidationResult};
