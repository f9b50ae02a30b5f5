//! Question and answer reconciliation
//!
//! Pure, synchronous matching logic: no database access, no I/O.

pub mod answer_normalizer;
pub mod question_matcher;
pub mod similarity;

pub use answer_normalizer::{normalize_answer, resolve_scale, NormalizeError};
pub use question_matcher::QuestionMatcher;
pub use similarity::{similarity, SimilarityWeights};
