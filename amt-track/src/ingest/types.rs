//! Bulk ingestion row types and error report

use amt_common::{Error, LocationKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One parsed upload row, exactly as received.
///
/// All fields are optional strings; which companion date fields are
/// required depends on the kind the location code resolves to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementRow {
    pub row_number: usize,
    pub asset_tag: Option<String>,
    pub location_code: Option<String>,
    pub status_code: Option<String>,
    /// Site placements
    pub deployed_on: Option<String>,
    pub activated_on: Option<String>,
    pub decommissioned_on: Option<String>,
    /// Warehouse placements
    pub received_on: Option<String>,
    /// Datacenter placements
    pub commissioned_on: Option<String>,
    /// Warehouse and datacenter placements
    pub disposed_on: Option<String>,
    pub scrapped_on: Option<String>,
    /// Populated means historical backfill: the placement is created
    /// already vacated and no movement record is written
    pub vacated_on: Option<String>,
}

impl PlacementRow {
    /// A field is present only when it has non-whitespace content
    pub(crate) fn field(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Fully-blank rows are skipped silently
    pub fn is_blank(&self) -> bool {
        [
            &self.asset_tag,
            &self.location_code,
            &self.status_code,
            &self.deployed_on,
            &self.activated_on,
            &self.decommissioned_on,
            &self.received_on,
            &self.commissioned_on,
            &self.disposed_on,
            &self.scrapped_on,
            &self.vacated_on,
        ]
        .iter()
        .all(|value| Self::field(value).is_none())
    }
}

/// One validation or application failure for a row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    pub row_number: usize,
    /// Machine-readable error kind (see `amt_common::Error::code`)
    pub error_code: String,
    /// Human-readable error message
    pub message: String,
}

impl RowError {
    pub fn new(row_number: usize, error_code: &str, message: String) -> Self {
        Self {
            row_number,
            error_code: error_code.to_string(),
            message,
        }
    }

    pub fn from_error(row_number: usize, error: &Error) -> Self {
        Self::new(row_number, error.code(), error.to_string())
    }
}

/// Outcome of one row
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    /// Row was applied; a placement exists for it now
    Applied {
        placement_guid: Uuid,
        kind: LocationKind,
    },
    /// Row was fully blank and skipped silently
    SkippedBlank,
    /// Row failed validation or application; sibling rows are unaffected
    Failed { errors: Vec<RowError> },
}

impl RowStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, RowStatus::Applied { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RowStatus::Failed { .. })
    }
}

/// Per-row result with the echoed input, streamed back to the caller
#[derive(Debug, Clone, Serialize)]
pub struct RowResult {
    pub row: PlacementRow,
    pub status: RowStatus,
}

/// Ingest completion summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Total rows received, blank rows included
    pub total_rows: usize,
    pub applied: usize,
    pub skipped_blank: usize,
    pub failed: usize,
    /// Every row error, in row order, for the error-report export
    pub errors: Vec<RowError>,
}

impl IngestReport {
    /// Fold one row result into the summary
    pub fn record(&mut self, result: &RowResult) {
        self.total_rows += 1;
        match &result.status {
            RowStatus::Applied { .. } => self.applied += 1,
            RowStatus::SkippedBlank => self.skipped_blank += 1,
            RowStatus::Failed { errors } => {
                self.failed += 1;
                self.errors.extend(errors.iter().cloned());
            }
        }
    }

    /// Serialize the summary for the error-report export
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "total_rows": self.total_rows,
            "applied": self.applied,
            "skipped_blank": self.skipped_blank,
            "failed": self.failed,
            "errors": self.errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_detection_ignores_whitespace() {
        let mut row = PlacementRow::default();
        assert!(row.is_blank());

        row.asset_tag = Some("   ".to_string());
        assert!(row.is_blank());

        row.asset_tag = Some("ATM-0001".to_string());
        assert!(!row.is_blank());
    }

    #[test]
    fn test_report_accumulates_counts_and_errors() {
        let mut report = IngestReport::default();
        report.record(&RowResult {
            row: PlacementRow::default(),
            status: RowStatus::Applied {
                placement_guid: Uuid::new_v4(),
                kind: LocationKind::Site,
            },
        });
        report.record(&RowResult {
            row: PlacementRow::default(),
            status: RowStatus::SkippedBlank,
        });
        report.record(&RowResult {
            row: PlacementRow::default(),
            status: RowStatus::Failed {
                errors: vec![
                    RowError::new(3, "VALIDATION_ERROR", "bad date".to_string()),
                    RowError::new(3, "REFERENCE_NOT_FOUND", "no such status".to_string()),
                ],
            },
        });

        assert_eq!(report.total_rows, 3);
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped_blank, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors.len(), 2);
    }
}
