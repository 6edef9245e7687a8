//! Per-row ingestion pipeline

use crate::db::lookups;
use crate::db::placements::{
    self, DatacenterPlacement, SitePlacement, WarehousePlacement,
};
use crate::ingest::types::{IngestReport, PlacementRow, RowError, RowResult, RowStatus};
use crate::placement::types::{PlacementRequest, PlacementTarget};
use crate::placement::PlacementService;
use amt_common::{Error, LocationKind, Result};
use async_stream::stream;
use chrono::{NaiveDate, NaiveTime};
use futures::{Stream, StreamExt};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

/// Streaming bulk-placement pipeline over the placement state machine
pub struct IngestPipeline {
    pool: SqlitePool,
    placements: PlacementService,
}

impl IngestPipeline {
    pub fn new(pool: SqlitePool) -> Self {
        let placements = PlacementService::new(pool.clone());
        Self { pool, placements }
    }

    /// Process rows one at a time, yielding each result as it completes.
    /// Callers observe progress without waiting for the whole batch.
    pub fn ingest_stream(
        &self,
        rows: Vec<PlacementRow>,
    ) -> impl Stream<Item = RowResult> + '_ {
        stream! {
            for row in rows {
                debug!(row = row.row_number, "Processing placement row");
                let status = self.process_row(&row).await;
                yield RowResult { row, status };
            }
        }
    }

    /// Drain the stream into a completion report
    pub async fn ingest(&self, rows: Vec<PlacementRow>) -> IngestReport {
        let stream = self.ingest_stream(rows);
        futures::pin_mut!(stream);

        let mut report = IngestReport::default();
        while let Some(result) = stream.next().await {
            report.record(&result);
        }

        info!(
            total = report.total_rows,
            applied = report.applied,
            skipped = report.skipped_blank,
            failed = report.failed,
            "Bulk placement ingest completed"
        );

        report
    }

    /// Validate and apply one row. All validation errors for the row are
    /// collected before giving up, so the error report names every
    /// problem at once.
    async fn process_row(&self, row: &PlacementRow) -> RowStatus {
        if row.is_blank() {
            return RowStatus::SkippedBlank;
        }

        let mut errors: Vec<RowError> = Vec::new();

        let asset = match PlacementRow::field(&row.asset_tag) {
            Some(tag) => match lookups::resolve_asset_by_tag(&self.pool, tag).await {
                Ok(Some(asset)) => Some(asset),
                Ok(None) => {
                    errors.push(RowError::from_error(
                        row.row_number,
                        &Error::ReferenceNotFound(format!("Asset tag '{}'", tag)),
                    ));
                    None
                }
                Err(e) => {
                    errors.push(RowError::from_error(row.row_number, &e));
                    None
                }
            },
            None => {
                errors.push(RowError::from_error(
                    row.row_number,
                    &Error::Validation("Missing asset tag".to_string()),
                ));
                None
            }
        };

        let location = match PlacementRow::field(&row.location_code) {
            Some(code) => match lookups::resolve_location_code(&self.pool, code).await {
                Ok(Some(resolved)) => Some(resolved),
                Ok(None) => {
                    errors.push(RowError::from_error(
                        row.row_number,
                        &Error::ReferenceNotFound(format!("Location code '{}'", code)),
                    ));
                    None
                }
                Err(e) => {
                    errors.push(RowError::from_error(row.row_number, &e));
                    None
                }
            },
            None => {
                errors.push(RowError::from_error(
                    row.row_number,
                    &Error::Validation("Missing location code".to_string()),
                ));
                None
            }
        };

        let status_guid = match PlacementRow::field(&row.status_code) {
            Some(code) => match lookups::resolve_status(&self.pool, code).await {
                Ok(Some(guid)) => Some(guid),
                Ok(None) => {
                    errors.push(RowError::from_error(
                        row.row_number,
                        &Error::ReferenceNotFound(format!("Status '{}'", code)),
                    ));
                    None
                }
                Err(e) => {
                    errors.push(RowError::from_error(row.row_number, &e));
                    None
                }
            },
            None => {
                errors.push(RowError::from_error(
                    row.row_number,
                    &Error::Validation("Missing status code".to_string()),
                ));
                None
            }
        };

        // Companion date fields for the resolved kind, plus the vacate date
        let target = location
            .map(|(kind, location_guid)| build_target(row, kind, location_guid, &mut errors));
        let vacated_on = parse_date_field(row.row_number, "vacated_on", &row.vacated_on, &mut errors);

        if !errors.is_empty() {
            return RowStatus::Failed { errors };
        }
        let (Some(asset), Some(target), Some(status_guid)) = (asset, target, status_guid) else {
            return RowStatus::Failed {
                errors: vec![RowError::from_error(
                    row.row_number,
                    &Error::Internal("Row validation produced no usable references".to_string()),
                )],
            };
        };

        let applied = match vacated_on {
            Some(vacated_date) => {
                self.apply_backfill(row.row_number, asset.guid, &target, status_guid, vacated_date)
                    .await
            }
            None => {
                let request = PlacementRequest {
                    asset_guid: asset.guid,
                    status_guid,
                    target,
                };
                self.placements.place_asset(&request).await.map(|outcome| {
                    RowStatus::Applied {
                        placement_guid: outcome.placement_guid,
                        kind: outcome.kind,
                    }
                })
            }
        };

        applied.unwrap_or_else(|e| RowStatus::Failed {
            errors: vec![RowError::from_error(row.row_number, &e)],
        })
    }

    /// Historical backfill: the placement is inserted already vacated and
    /// no movement record is written. The asset's current active
    /// placement, if any, is left untouched.
    async fn apply_backfill(
        &self,
        row_number: usize,
        asset_guid: Uuid,
        target: &PlacementTarget,
        status_guid: Uuid,
        vacated_date: NaiveDate,
    ) -> Result<RowStatus> {
        let vacated_at = vacated_date.and_time(NaiveTime::MIN).and_utc();
        let kind = target.kind();

        if placements::historical_duplicate_exists(
            &self.pool,
            kind,
            asset_guid,
            target.location_guid(),
            vacated_at,
        )
        .await?
        {
            return Err(Error::Duplicate(format!(
                "Asset {} already has a vacated {} placement at location {} dated {}",
                asset_guid,
                kind,
                target.location_guid(),
                vacated_date
            )));
        }

        let mut conn = self.pool.acquire().await?;
        let placement_guid = match target {
            PlacementTarget::Site {
                site_guid,
                deployed_on,
                activated_on,
                decommissioned_on,
            } => {
                let mut placement = SitePlacement::new(asset_guid, *site_guid, status_guid);
                placement.deployed_on = *deployed_on;
                placement.activated_on = *activated_on;
                placement.decommissioned_on = *decommissioned_on;
                placement.vacated_on = Some(vacated_at);
                placements::insert_site_placement(&mut conn, &placement).await?;
                placement.guid
            }
            PlacementTarget::Warehouse {
                warehouse_guid,
                received_on,
                disposed_on,
                scrapped_on,
            } => {
                let mut placement = WarehousePlacement::new(asset_guid, *warehouse_guid, status_guid);
                placement.received_on = *received_on;
                placement.disposed_on = *disposed_on;
                placement.scrapped_on = *scrapped_on;
                placement.vacated_on = Some(vacated_at);
                placements::insert_warehouse_placement(&mut conn, &placement).await?;
                placement.guid
            }
            PlacementTarget::Datacenter {
                datacenter_guid,
                commissioned_on,
                disposed_on,
                scrapped_on,
            } => {
                let mut placement =
                    DatacenterPlacement::new(asset_guid, *datacenter_guid, status_guid);
                placement.commissioned_on = *commissioned_on;
                placement.disposed_on = *disposed_on;
                placement.scrapped_on = *scrapped_on;
                placement.vacated_on = Some(vacated_at);
                placements::insert_datacenter_placement(&mut conn, &placement).await?;
                placement.guid
            }
        };

        info!(
            row = row_number,
            asset_guid = %asset_guid,
            kind = %kind,
            placement_guid = %placement_guid,
            "Historical placement backfilled (no movement record)"
        );

        Ok(RowStatus::Applied {
            placement_guid,
            kind,
        })
    }
}

/// Parse one optional `YYYY-MM-DD` field, accumulating any parse failure
fn parse_date_field(
    row_number: usize,
    name: &str,
    value: &Option<String>,
    errors: &mut Vec<RowError>,
) -> Option<NaiveDate> {
    let raw = PlacementRow::field(value)?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            errors.push(RowError::from_error(
                row_number,
                &Error::Validation(format!("Invalid {} date '{}': {}", name, raw, e)),
            ));
            None
        }
    }
}

/// Build the placement target from the row's kind-specific date fields
fn build_target(
    row: &PlacementRow,
    kind: LocationKind,
    location_guid: Uuid,
    errors: &mut Vec<RowError>,
) -> PlacementTarget {
    let n = row.row_number;
    match kind {
        LocationKind::Site => PlacementTarget::Site {
            site_guid: location_guid,
            deployed_on: parse_date_field(n, "deployed_on", &row.deployed_on, errors),
            activated_on: parse_date_field(n, "activated_on", &row.activated_on, errors),
            decommissioned_on: parse_date_field(
                n,
                "decommissioned_on",
                &row.decommissioned_on,
                errors,
            ),
        },
        LocationKind::Warehouse => PlacementTarget::Warehouse {
            warehouse_guid: location_guid,
            received_on: parse_date_field(n, "received_on", &row.received_on, errors),
            disposed_on: parse_date_field(n, "disposed_on", &row.disposed_on, errors),
            scrapped_on: parse_date_field(n, "scrapped_on", &row.scrapped_on, errors),
        },
        LocationKind::Datacenter => PlacementTarget::Datacenter {
            datacenter_guid: location_guid,
            commissioned_on: parse_date_field(n, "commissioned_on", &row.commissioned_on, errors),
            disposed_on: parse_date_field(n, "disposed_on", &row.disposed_on, errors),
            scrapped_on: parse_date_field(n, "scrapped_on", &row.scrapped_on, errors),
        },
        LocationKind::Factory => {
            // Location codes never resolve to the virtual factory origin
            errors.push(RowError::from_error(
                n,
                &Error::Internal("Location code resolved to factory".to_string()),
            ));
            PlacementTarget::site(location_guid)
        }
    }
}
