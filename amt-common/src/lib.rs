//! # AMT Common Library
//!
//! Shared code for the Asset Movement Tracker services including:
//! - Database initialization, schema, and seed data
//! - Error taxonomy and result type
//! - Configuration loading
//! - Location kind definitions

pub mod config;
pub mod db;
pub mod error;
pub mod location;

pub use error::{Error, Result};
pub use location::LocationKind;
