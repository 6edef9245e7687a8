//! Reconciling sequence allocator
//!
//! Wraps the generator store: before allocating, the counter is raised
//! past the largest numeric suffix among already-issued codes for the same
//! composite key. Codes inserted out-of-band (bulk uploads writing the
//! asset or site tables directly) are thereby detected and jumped over.

use crate::codegen::pattern::build_code;
use crate::codegen::SequenceKey;
use crate::db::lookups::{self, CodedTable};
use crate::db::sequences::{self, DEFAULT_MAX_SEQ_DIGIT};
use amt_common::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::SqlitePool;
use tracing::info;

static TRAILING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+$").expect("trailing-digit pattern is valid"));

/// One allocated code and the sequence number behind it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub code: String,
    pub sequence: i64,
}

/// Allocates collision-free codes from the shared sequence counters
pub struct SequenceAllocator {
    pool: SqlitePool,
}

impl SequenceAllocator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Allocate the next code for a composite key.
    ///
    /// `candidate_codes` is the set of already-issued codes sharing the
    /// key's dimension (see `lookups::issued_codes`). The returned
    /// sequence is strictly greater than both the stored counter minus one
    /// and every trailing numeric suffix among the candidates.
    pub async fn allocate(
        &self,
        key: &SequenceKey,
        candidate_codes: &[String],
    ) -> Result<Allocation> {
        let parts = self.resolve_parts(key).await?;
        let key_str = key.key();

        let mut tx = self.pool.begin().await?;

        // First statement is a write: takes the write lock before the
        // counter is read, serializing allocators on the same key.
        let generator = sequences::lock_generator(&mut *tx, &key_str).await?;

        let max_existing = max_trailing_suffix(candidate_codes);
        let next = std::cmp::max(max_existing + 1, generator.running_seq);

        let part_refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        let code = build_code(&part_refs, next, generator.max_seq_digit)?;

        sequences::persist_running_seq(&mut *tx, &key_str, next + 1).await?;
        tx.commit().await?;

        info!(key = %key_str, sequence = next, code = %code, "Allocated sequence code");

        Ok(Allocation { code, sequence: next })
    }

    /// Compute the code the next `allocate` call would return, without
    /// creating the generator row or advancing the counter.
    pub async fn preview(&self, key: &SequenceKey, candidate_codes: &[String]) -> Result<String> {
        let parts = self.resolve_parts(key).await?;

        let (running_seq, max_seq_digit) = match sequences::read_generator(&self.pool, &key.key()).await? {
            Some(generator) => (generator.running_seq, generator.max_seq_digit),
            None => (1, DEFAULT_MAX_SEQ_DIGIT),
        };

        let max_existing = max_trailing_suffix(candidate_codes);
        let next = std::cmp::max(max_existing + 1, running_seq);

        let part_refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        build_code(&part_refs, next, max_seq_digit)
    }

    /// Resolve the key's dimension guids to their short codes, in prefix
    /// order. Any missing master row fails the allocation up front.
    async fn resolve_parts(&self, key: &SequenceKey) -> Result<Vec<String>> {
        match key {
            SequenceKey::AssetTag {
                category_guid,
                vendor_guid,
                bank_guid,
            } => {
                let category = lookups::master_by_guid(&self.pool, CodedTable::Categories, *category_guid)
                    .await?
                    .ok_or_else(|| Error::ReferenceNotFound(format!("Category {}", category_guid)))?;
                let vendor = lookups::master_by_guid(&self.pool, CodedTable::Vendors, *vendor_guid)
                    .await?
                    .ok_or_else(|| Error::ReferenceNotFound(format!("Vendor {}", vendor_guid)))?;
                let bank = lookups::master_by_guid(&self.pool, CodedTable::Banks, *bank_guid)
                    .await?
                    .ok_or_else(|| Error::ReferenceNotFound(format!("Bank {}", bank_guid)))?;
                Ok(vec![category.code, vendor.code, bank.code])
            }
            SequenceKey::SiteCode {
                project_guid,
                state_guid,
            } => {
                let project = lookups::master_by_guid(&self.pool, CodedTable::Projects, *project_guid)
                    .await?
                    .ok_or_else(|| Error::ReferenceNotFound(format!("Project {}", project_guid)))?;
                let state = lookups::master_by_guid(&self.pool, CodedTable::States, *state_guid)
                    .await?
                    .ok_or_else(|| Error::ReferenceNotFound(format!("State {}", state_guid)))?;
                Ok(vec![project.code, state.code])
            }
        }
    }
}

/// Largest trailing numeric suffix among the candidate codes, 0 if none.
/// Codes without a trailing digit run are ignored.
fn max_trailing_suffix(codes: &[String]) -> i64 {
    codes
        .iter()
        .filter_map(|code| TRAILING_DIGITS.find(code))
        .filter_map(|suffix| suffix.as_str().parse::<i64>().ok())
        .max()
        .unwrap_or(0)
}
