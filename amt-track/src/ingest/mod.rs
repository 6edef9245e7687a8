//! Bulk placement ingestion
//!
//! Applies many placement transitions from an uploaded dataset. Rows are
//! validated and applied independently: one row's failure never blocks or
//! rolls back its siblings, and results stream back incrementally.

pub mod pipeline;
pub mod types;

pub use pipeline::IngestPipeline;
pub use types::{IngestReport, PlacementRow, RowError, RowResult, RowStatus};
