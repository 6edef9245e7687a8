//! # AMT Track
//!
//! Core services of the Asset Movement Tracker:
//! - Per-table repositories over the shared SQLite schema
//! - Sequence code generation (reconciling allocator + pattern builder)
//! - Placement state machine (vacate-then-place, movement history)
//! - Bulk placement ingestion pipeline
//!
//! The surrounding HTTP/CRUD layer consumes this crate as a library; no
//! network surface lives here.

pub mod codegen;
pub mod db;
pub mod ingest;
pub mod placement;

pub use codegen::{Allocation, SequenceAllocator, SequenceKey};
pub use ingest::{IngestPipeline, IngestReport, PlacementRow, RowResult, RowStatus};
pub use placement::{
    AssetLocation, PlacementOutcome, PlacementRequest, PlacementService, PlacementTarget,
};
