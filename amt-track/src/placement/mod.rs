//! Placement state machine
//!
//! An asset is either unplaced (factory) or active at exactly one site,
//! warehouse, or datacenter. Every transition vacates the current
//! placement, creates the new one, and appends a movement record, all in
//! one transaction.

pub mod orchestrator;
pub mod types;

pub use orchestrator::PlacementService;
pub use types::{AssetLocation, PlacementOutcome, PlacementRequest, PlacementTarget};
