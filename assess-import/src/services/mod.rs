//! Import services
//!
//! Validate (read only) and execute (one transaction) over the matching engine.

pub mod batch_executor;
pub mod validation_aggregator;

pub use batch_executor::execute;
pub use validation_aggregator::{prepare_import, validate, PreparedImport};
