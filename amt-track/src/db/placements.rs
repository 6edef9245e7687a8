//! Placement table operations
//!
//! Three parallel tables (site, warehouse, datacenter), each holding at
//! most one active (non-vacated) row per asset. A row becomes immutable
//! history once `vacated_on` is set; it is superseded, never deleted.

use crate::db::{opt_date, opt_guid, opt_utc, parse_guid};
use amt_common::{LocationKind, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Placement at a site
#[derive(Debug, Clone)]
pub struct SitePlacement {
    pub guid: Uuid,
    pub asset_guid: Uuid,
    pub site_guid: Uuid,
    pub status_guid: Uuid,
    pub deployed_on: Option<NaiveDate>,
    pub activated_on: Option<NaiveDate>,
    pub decommissioned_on: Option<NaiveDate>,
    pub vacated_on: Option<DateTime<Utc>>,
    pub movement_record_guid: Option<Uuid>,
}

impl SitePlacement {
    /// Create new active placement record
    pub fn new(asset_guid: Uuid, site_guid: Uuid, status_guid: Uuid) -> Self {
        Self {
            guid: Uuid::new_v4(),
            asset_guid,
            site_guid,
            status_guid,
            deployed_on: None,
            activated_on: None,
            decommissioned_on: None,
            vacated_on: None,
            movement_record_guid: None,
        }
    }
}

/// Placement at a warehouse
#[derive(Debug, Clone)]
pub struct WarehousePlacement {
    pub guid: Uuid,
    pub asset_guid: Uuid,
    pub warehouse_guid: Uuid,
    pub status_guid: Uuid,
    pub received_on: Option<NaiveDate>,
    pub disposed_on: Option<NaiveDate>,
    pub scrapped_on: Option<NaiveDate>,
    pub vacated_on: Option<DateTime<Utc>>,
    pub movement_record_guid: Option<Uuid>,
}

impl WarehousePlacement {
    /// Create new active placement record
    pub fn new(asset_guid: Uuid, warehouse_guid: Uuid, status_guid: Uuid) -> Self {
        Self {
            guid: Uuid::new_v4(),
            asset_guid,
            warehouse_guid,
            status_guid,
            received_on: None,
            disposed_on: None,
            scrapped_on: None,
            vacated_on: None,
            movement_record_guid: None,
        }
    }
}

/// Placement at a datacenter
#[derive(Debug, Clone)]
pub struct DatacenterPlacement {
    pub guid: Uuid,
    pub asset_guid: Uuid,
    pub datacenter_guid: Uuid,
    pub status_guid: Uuid,
    pub commissioned_on: Option<NaiveDate>,
    pub disposed_on: Option<NaiveDate>,
    pub scrapped_on: Option<NaiveDate>,
    pub vacated_on: Option<DateTime<Utc>>,
    pub movement_record_guid: Option<Uuid>,
}

impl DatacenterPlacement {
    /// Create new active placement record
    pub fn new(asset_guid: Uuid, datacenter_guid: Uuid, status_guid: Uuid) -> Self {
        Self {
            guid: Uuid::new_v4(),
            asset_guid,
            datacenter_guid,
            status_guid,
            commissioned_on: None,
            disposed_on: None,
            scrapped_on: None,
            vacated_on: None,
            movement_record_guid: None,
        }
    }
}

/// Cross-table projection of an active placement row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePlacement {
    pub kind: LocationKind,
    pub guid: Uuid,
    pub location_guid: Uuid,
}

fn placement_table(kind: LocationKind) -> &'static str {
    match kind {
        LocationKind::Site => "site_placements",
        LocationKind::Warehouse => "warehouse_placements",
        LocationKind::Datacenter => "datacenter_placements",
        LocationKind::Factory => unreachable!("factory has no placement table"),
    }
}

fn location_column(kind: LocationKind) -> &'static str {
    match kind {
        LocationKind::Site => "site_guid",
        LocationKind::Warehouse => "warehouse_guid",
        LocationKind::Datacenter => "datacenter_guid",
        LocationKind::Factory => unreachable!("factory has no placement table"),
    }
}

/// Save site placement to database
pub async fn insert_site_placement(conn: &mut SqliteConnection, p: &SitePlacement) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO site_placements (
            guid, asset_guid, site_guid, status_guid,
            deployed_on, activated_on, decommissioned_on,
            vacated_on, movement_record_guid
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(p.guid.to_string())
    .bind(p.asset_guid.to_string())
    .bind(p.site_guid.to_string())
    .bind(p.status_guid.to_string())
    .bind(p.deployed_on.map(|d| d.to_string()))
    .bind(p.activated_on.map(|d| d.to_string()))
    .bind(p.decommissioned_on.map(|d| d.to_string()))
    .bind(p.vacated_on.map(|t| t.to_rfc3339()))
    .bind(p.movement_record_guid.map(|g| g.to_string()))
    .execute(conn)
    .await?;

    Ok(())
}

/// Save warehouse placement to database
pub async fn insert_warehouse_placement(
    conn: &mut SqliteConnection,
    p: &WarehousePlacement,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO warehouse_placements (
            guid, asset_guid, warehouse_guid, status_guid,
            received_on, disposed_on, scrapped_on,
            vacated_on, movement_record_guid
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(p.guid.to_string())
    .bind(p.asset_guid.to_string())
    .bind(p.warehouse_guid.to_string())
    .bind(p.status_guid.to_string())
    .bind(p.received_on.map(|d| d.to_string()))
    .bind(p.disposed_on.map(|d| d.to_string()))
    .bind(p.scrapped_on.map(|d| d.to_string()))
    .bind(p.vacated_on.map(|t| t.to_rfc3339()))
    .bind(p.movement_record_guid.map(|g| g.to_string()))
    .execute(conn)
    .await?;

    Ok(())
}

/// Save datacenter placement to database
pub async fn insert_datacenter_placement(
    conn: &mut SqliteConnection,
    p: &DatacenterPlacement,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO datacenter_placements (
            guid, asset_guid, datacenter_guid, status_guid,
            commissioned_on, disposed_on, scrapped_on,
            vacated_on, movement_record_guid
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(p.guid.to_string())
    .bind(p.asset_guid.to_string())
    .bind(p.datacenter_guid.to_string())
    .bind(p.status_guid.to_string())
    .bind(p.commissioned_on.map(|d| d.to_string()))
    .bind(p.disposed_on.map(|d| d.to_string()))
    .bind(p.scrapped_on.map(|d| d.to_string()))
    .bind(p.vacated_on.map(|t| t.to_rfc3339()))
    .bind(p.movement_record_guid.map(|g| g.to_string()))
    .execute(conn)
    .await?;

    Ok(())
}

/// Find every active (non-vacated) placement row for an asset across the
/// three tables. The repository invariant says at most one exists; callers
/// treat more than one as an invariant violation, not this function.
pub async fn find_active_placements(
    conn: &mut SqliteConnection,
    asset_guid: Uuid,
) -> Result<Vec<ActivePlacement>> {
    let mut active = Vec::new();

    for kind in LocationKind::placeable() {
        let sql = format!(
            "SELECT guid, {} AS location_guid FROM {} WHERE asset_guid = ? AND vacated_on IS NULL",
            location_column(kind),
            placement_table(kind),
        );
        let rows = sqlx::query(&sql)
            .bind(asset_guid.to_string())
            .fetch_all(&mut *conn)
            .await?;

        for row in rows {
            let guid_str: String = row.get("guid");
            let location_str: String = row.get("location_guid");
            active.push(ActivePlacement {
                kind,
                guid: parse_guid(&guid_str)?,
                location_guid: parse_guid(&location_str)?,
            });
        }
    }

    Ok(active)
}

/// Mark a placement's end. The row stays as immutable history.
pub async fn vacate_placement(
    conn: &mut SqliteConnection,
    kind: LocationKind,
    placement_guid: Uuid,
    vacated_at: DateTime<Utc>,
) -> Result<()> {
    let sql = format!(
        "UPDATE {} SET vacated_on = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
        placement_table(kind),
    );
    sqlx::query(&sql)
        .bind(vacated_at.to_rfc3339())
        .bind(placement_guid.to_string())
        .execute(conn)
        .await?;

    Ok(())
}

/// Backlink a placement to the movement record that created it
pub async fn link_movement_record(
    conn: &mut SqliteConnection,
    kind: LocationKind,
    placement_guid: Uuid,
    record_guid: Uuid,
) -> Result<()> {
    let sql = format!(
        "UPDATE {} SET movement_record_guid = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
        placement_table(kind),
    );
    sqlx::query(&sql)
        .bind(record_guid.to_string())
        .bind(placement_guid.to_string())
        .execute(conn)
        .await?;

    Ok(())
}

/// Check whether a historical (vacated) placement already exists with the
/// same asset, location, and vacate date. Used by the bulk-ingest validator
/// to reject exact re-imports.
pub async fn historical_duplicate_exists(
    pool: &SqlitePool,
    kind: LocationKind,
    asset_guid: Uuid,
    location_guid: Uuid,
    vacated_at: DateTime<Utc>,
) -> Result<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE asset_guid = ? AND {} = ? AND vacated_on = ?)",
        placement_table(kind),
        location_column(kind),
    );
    let exists: bool = sqlx::query_scalar(&sql)
        .bind(asset_guid.to_string())
        .bind(location_guid.to_string())
        .bind(vacated_at.to_rfc3339())
        .fetch_one(pool)
        .await?;

    Ok(exists)
}

/// Load a site placement by guid
pub async fn load_site_placement(pool: &SqlitePool, guid: Uuid) -> Result<Option<SitePlacement>> {
    let row = sqlx::query(
        r#"
        SELECT guid, asset_guid, site_guid, status_guid,
               deployed_on, activated_on, decommissioned_on,
               vacated_on, movement_record_guid
        FROM site_placements
        WHERE guid = ?
        "#,
    )
    .bind(guid.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let guid_str: String = row.get("guid");
            let asset_str: String = row.get("asset_guid");
            let site_str: String = row.get("site_guid");
            let status_str: String = row.get("status_guid");

            Ok(Some(SitePlacement {
                guid: parse_guid(&guid_str)?,
                asset_guid: parse_guid(&asset_str)?,
                site_guid: parse_guid(&site_str)?,
                status_guid: parse_guid(&status_str)?,
                deployed_on: opt_date(row.get("deployed_on"))?,
                activated_on: opt_date(row.get("activated_on"))?,
                decommissioned_on: opt_date(row.get("decommissioned_on"))?,
                vacated_on: opt_utc(row.get("vacated_on"))?,
                movement_record_guid: opt_guid(row.get("movement_record_guid"))?,
            }))
        }
        None => Ok(None),
    }
}

/// Load a warehouse placement by guid
pub async fn load_warehouse_placement(
    pool: &SqlitePool,
    guid: Uuid,
) -> Result<Option<WarehousePlacement>> {
    let row = sqlx::query(
        r#"
        SELECT guid, asset_guid, warehouse_guid, status_guid,
               received_on, disposed_on, scrapped_on,
               vacated_on, movement_record_guid
        FROM warehouse_placements
        WHERE guid = ?
        "#,
    )
    .bind(guid.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let guid_str: String = row.get("guid");
            let asset_str: String = row.get("asset_guid");
            let warehouse_str: String = row.get("warehouse_guid");
            let status_str: String = row.get("status_guid");

            Ok(Some(WarehousePlacement {
                guid: parse_guid(&guid_str)?,
                asset_guid: parse_guid(&asset_str)?,
                warehouse_guid: parse_guid(&warehouse_str)?,
                status_guid: parse_guid(&status_str)?,
                received_on: opt_date(row.get("received_on"))?,
                disposed_on: opt_date(row.get("disposed_on"))?,
                scrapped_on: opt_date(row.get("scrapped_on"))?,
                vacated_on: opt_utc(row.get("vacated_on"))?,
                movement_record_guid: opt_guid(row.get("movement_record_guid"))?,
            }))
        }
        None => Ok(None),
    }
}

/// Load a datacenter placement by guid
pub async fn load_datacenter_placement(
    pool: &SqlitePool,
    guid: Uuid,
) -> Result<Option<DatacenterPlacement>> {
    let row = sqlx::query(
        r#"
        SELECT guid, asset_guid, datacenter_guid, status_guid,
               commissioned_on, disposed_on, scrapped_on,
               vacated_on, movement_record_guid
        FROM datacenter_placements
        WHERE guid = ?
        "#,
    )
    .bind(guid.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let guid_str: String = row.get("guid");
            let asset_str: String = row.get("asset_guid");
            let datacenter_str: String = row.get("datacenter_guid");
            let status_str: String = row.get("status_guid");

            Ok(Some(DatacenterPlacement {
                guid: parse_guid(&guid_str)?,
                asset_guid: parse_guid(&asset_str)?,
                datacenter_guid: parse_guid(&datacenter_str)?,
                status_guid: parse_guid(&status_str)?,
                commissioned_on: opt_date(row.get("commissioned_on"))?,
                disposed_on: opt_date(row.get("disposed_on"))?,
                scrapped_on: opt_date(row.get("scrapped_on"))?,
                vacated_on: opt_utc(row.get("vacated_on"))?,
                movement_record_guid: opt_guid(row.get("movement_record_guid"))?,
            }))
        }
        None => Ok(None),
    }
}
