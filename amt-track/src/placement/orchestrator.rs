//! Placement orchestration
//!
//! Entry point of the state machine. Each mutation runs in one
//! transaction whose first statement writes the asset row, so concurrent
//! transitions of the same asset are serialized; rollback on any error
//! leaves neither a half-vacated row nor an orphaned movement record.

use crate::db::movements::{self, MovementRecord};
use crate::db::placements::{
    self, ActivePlacement, DatacenterPlacement, SitePlacement, WarehousePlacement,
};
use crate::db::lookups;
use crate::placement::types::{AssetLocation, PlacementOutcome, PlacementRequest, PlacementTarget};
use amt_common::{Error, LocationKind, Result};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{error, info};
use uuid::Uuid;

/// Placement state machine over the three placement tables
pub struct PlacementService {
    pool: SqlitePool,
}

impl PlacementService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Move an asset to a new location.
    ///
    /// Vacates the current active placement (any kind, including the same
    /// kind as the target), inserts the new one, and appends a movement
    /// record. An asset coming from the factory gets a record with a
    /// Factory origin and no from-placement.
    pub async fn place_asset(&self, request: &PlacementRequest) -> Result<PlacementOutcome> {
        let now = Utc::now();
        let to_kind = request.target.kind();

        let mut tx = self.pool.begin().await?;

        touch_asset_row(&mut tx, request.asset_guid).await?;

        let from = self.current_placement(&mut tx, request.asset_guid).await?;
        if let Some(current) = from {
            placements::vacate_placement(&mut *tx, current.kind, current.guid, now).await?;
        }
        let (from_kind, from_placement_guid) = match from {
            Some(current) => (current.kind, Some(current.guid)),
            None => (LocationKind::Factory, None),
        };

        if !lookups::location_exists(&mut tx, to_kind, request.target.location_guid()).await? {
            return Err(Error::ReferenceNotFound(format!(
                "{} {}",
                to_kind,
                request.target.location_guid()
            )));
        }
        if !lookups::status_exists(&mut tx, request.status_guid).await? {
            return Err(Error::ReferenceNotFound(format!(
                "Status {}",
                request.status_guid
            )));
        }

        let placement_guid = insert_target_placement(&mut tx, request).await?;

        let movement_type_guid =
            movements::derive_movement_type(&mut tx, from_kind, to_kind).await?;

        let record = MovementRecord::new(
            request.asset_guid,
            movement_type_guid,
            from_kind,
            from_placement_guid,
            to_kind,
            placement_guid,
            now,
        );
        movements::insert_movement_record(&mut tx, &record).await?;
        placements::link_movement_record(&mut tx, to_kind, placement_guid, record.guid).await?;

        tx.commit().await?;

        info!(
            asset_guid = %request.asset_guid,
            from = %from_kind,
            to = %to_kind,
            placement_guid = %placement_guid,
            "Asset placed"
        );

        Ok(PlacementOutcome {
            placement_guid,
            kind: to_kind,
            from_kind,
            from_placement_guid,
            movement_record_guid: record.guid,
            movement_type_guid,
        })
    }

    /// Vacate the asset's active placement without creating a new one.
    ///
    /// Removal is an exit, not a movement: no movement record is written.
    /// Returns the vacated placement, or `Ok(None)` as a no-op when the
    /// asset has no active placement.
    pub async fn remove_from_current_location(
        &self,
        asset_guid: Uuid,
    ) -> Result<Option<ActivePlacement>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        touch_asset_row(&mut tx, asset_guid).await?;

        let current = self.current_placement(&mut tx, asset_guid).await?;
        if let Some(current) = current {
            placements::vacate_placement(&mut *tx, current.kind, current.guid, now).await?;
            tx.commit().await?;
            info!(
                asset_guid = %asset_guid,
                kind = %current.kind,
                placement_guid = %current.guid,
                "Asset removed from current location"
            );
            Ok(Some(current))
        } else {
            tx.commit().await?;
            Ok(None)
        }
    }

    /// Where is the asset right now? Read-only projection across the
    /// three placement tables.
    pub async fn check_location(&self, asset_guid: Uuid) -> Result<AssetLocation> {
        let mut conn = self.pool.acquire().await?;
        let active = placements::find_active_placements(&mut conn, asset_guid).await?;
        drop(conn);

        match active.as_slice() {
            [] => Ok(AssetLocation::unplaced()),
            [current] => {
                let code = lookups::location_code(&self.pool, current.kind, current.location_guid)
                    .await?;
                Ok(AssetLocation {
                    is_placed: true,
                    kind: Some(current.kind),
                    location_guid: Some(current.location_guid),
                    location_code: code,
                })
            }
            many => {
                error!(
                    asset_guid = %asset_guid,
                    active_count = many.len(),
                    "Multiple active placements found for asset"
                );
                Err(Error::InvariantViolation(format!(
                    "Asset {} has {} active placements",
                    asset_guid,
                    many.len()
                )))
            }
        }
    }

    /// Full movement history for an asset, newest first
    pub async fn movement_history(&self, asset_guid: Uuid) -> Result<Vec<MovementRecord>> {
        movements::movement_records_for_asset(&self.pool, asset_guid).await
    }

    /// The asset's single active placement, if any. More than one active
    /// row means the repository invariant is broken: fail loudly, touch
    /// nothing.
    async fn current_placement(
        &self,
        conn: &mut SqliteConnection,
        asset_guid: Uuid,
    ) -> Result<Option<ActivePlacement>> {
        let active = placements::find_active_placements(conn, asset_guid).await?;
        match active.as_slice() {
            [] => Ok(None),
            [current] => Ok(Some(*current)),
            many => {
                error!(
                    asset_guid = %asset_guid,
                    active_count = many.len(),
                    "Multiple active placements found for asset"
                );
                Err(Error::InvariantViolation(format!(
                    "Asset {} has {} active placements",
                    asset_guid,
                    many.len()
                )))
            }
        }
    }
}

/// Write the asset row first: validates the asset exists and takes the
/// write lock, serializing concurrent transitions of the same asset.
async fn touch_asset_row(conn: &mut SqliteConnection, asset_guid: Uuid) -> Result<()> {
    let touched = sqlx::query("UPDATE assets SET updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
        .bind(asset_guid.to_string())
        .execute(conn)
        .await?;

    if touched.rows_affected() == 0 {
        return Err(Error::ReferenceNotFound(format!("Asset {}", asset_guid)));
    }

    Ok(())
}

/// Insert the new placement row for the request's target kind
async fn insert_target_placement(
    conn: &mut SqliteConnection,
    request: &PlacementRequest,
) -> Result<Uuid> {
    match &request.target {
        PlacementTarget::Site {
            site_guid,
            deployed_on,
            activated_on,
            decommissioned_on,
        } => {
            let mut placement =
                SitePlacement::new(request.asset_guid, *site_guid, request.status_guid);
            placement.deployed_on = *deployed_on;
            placement.activated_on = *activated_on;
            placement.decommissioned_on = *decommissioned_on;
            placements::insert_site_placement(conn, &placement).await?;
            Ok(placement.guid)
        }
        PlacementTarget::Warehouse {
            warehouse_guid,
            received_on,
            disposed_on,
            scrapped_on,
        } => {
            let mut placement =
                WarehousePlacement::new(request.asset_guid, *warehouse_guid, request.status_guid);
            placement.received_on = *received_on;
            placement.disposed_on = *disposed_on;
            placement.scrapped_on = *scrapped_on;
            placements::insert_warehouse_placement(conn, &placement).await?;
            Ok(placement.guid)
        }
        PlacementTarget::Datacenter {
            datacenter_guid,
            commissioned_on,
            disposed_on,
            scrapped_on,
        } => {
            let mut placement = DatacenterPlacement::new(
                request.asset_guid,
                *datacenter_guid,
                request.status_guid,
            );
            placement.commissioned_on = *commissioned_on;
            placement.disposed_on = *disposed_on;
            placement.scrapped_on = *scrapped_on;
            placements::insert_datacenter_placement(conn, &placement).await?;
            Ok(placement.guid)
        }
    }
}
