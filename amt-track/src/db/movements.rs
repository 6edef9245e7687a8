//! Movement tracking
//!
//! Derives a movement-type label from the (from, to) kind pair and writes
//! the append-only transition history. Records are inserted once and never
//! mutated; history must never block a placement from completing.

use crate::db::{opt_guid, parse_guid, parse_utc};
use amt_common::{LocationKind, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

/// One from→to transition in an asset's history
#[derive(Debug, Clone, Serialize)]
pub struct MovementRecord {
    pub guid: Uuid,
    pub asset_guid: Uuid,
    /// None when the (from, to) pair had no seeded label
    pub movement_type_guid: Option<Uuid>,
    pub from_kind: LocationKind,
    /// None exactly when `from_kind` is Factory (never placed before)
    pub from_placement_guid: Option<Uuid>,
    pub to_kind: LocationKind,
    pub to_placement_guid: Uuid,
    pub moved_at: DateTime<Utc>,
}

impl MovementRecord {
    /// Create new movement record
    pub fn new(
        asset_guid: Uuid,
        movement_type_guid: Option<Uuid>,
        from_kind: LocationKind,
        from_placement_guid: Option<Uuid>,
        to_kind: LocationKind,
        to_placement_guid: Uuid,
        moved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            guid: Uuid::new_v4(),
            asset_guid,
            movement_type_guid,
            from_kind,
            from_placement_guid,
            to_kind,
            to_placement_guid,
            moved_at,
        }
    }
}

/// Resolve the movement type for a (from, to) kind pair.
///
/// A pair missing from the seeded table resolves to `Ok(None)`: the
/// transition still completes and the record carries a NULL type. Logged
/// as a recoverable inconsistency so unseeded labels are visible.
pub async fn derive_movement_type(
    conn: &mut SqliteConnection,
    from_kind: LocationKind,
    to_kind: LocationKind,
) -> Result<Option<Uuid>> {
    let guid: Option<String> = sqlx::query_scalar(
        "SELECT guid FROM movement_types WHERE from_kind = ? AND to_kind = ?",
    )
    .bind(from_kind.as_str())
    .bind(to_kind.as_str())
    .fetch_optional(conn)
    .await?;

    match guid {
        Some(guid) => Ok(Some(parse_guid(&guid)?)),
        None => {
            warn!(
                from = %from_kind,
                to = %to_kind,
                "No movement type seeded for pair; recording NULL type"
            );
            Ok(None)
        }
    }
}

/// Append a movement record. Append-only: there is no update path.
pub async fn insert_movement_record(
    conn: &mut SqliteConnection,
    record: &MovementRecord,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO movement_records (
            guid, asset_guid, movement_type_guid,
            from_kind, from_placement_guid,
            to_kind, to_placement_guid, moved_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.guid.to_string())
    .bind(record.asset_guid.to_string())
    .bind(record.movement_type_guid.map(|g| g.to_string()))
    .bind(record.from_kind.as_str())
    .bind(record.from_placement_guid.map(|g| g.to_string()))
    .bind(record.to_kind.as_str())
    .bind(record.to_placement_guid.to_string())
    .bind(record.moved_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// Load an asset's movement history, newest first
pub async fn movement_records_for_asset(
    pool: &SqlitePool,
    asset_guid: Uuid,
) -> Result<Vec<MovementRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, asset_guid, movement_type_guid,
               from_kind, from_placement_guid,
               to_kind, to_placement_guid, moved_at
        FROM movement_records
        WHERE asset_guid = ?
        ORDER BY moved_at DESC
        "#,
    )
    .bind(asset_guid.to_string())
    .fetch_all(pool)
    .await?;

    let mut records = Vec::new();
    for row in rows {
        let guid_str: String = row.get("guid");
        let asset_str: String = row.get("asset_guid");
        let from_kind_str: String = row.get("from_kind");
        let to_kind_str: String = row.get("to_kind");
        let to_placement_str: String = row.get("to_placement_guid");
        let moved_at_str: String = row.get("moved_at");

        records.push(MovementRecord {
            guid: parse_guid(&guid_str)?,
            asset_guid: parse_guid(&asset_str)?,
            movement_type_guid: opt_guid(row.get("movement_type_guid"))?,
            from_kind: LocationKind::from_str(&from_kind_str)?,
            from_placement_guid: opt_guid(row.get("from_placement_guid"))?,
            to_kind: LocationKind::from_str(&to_kind_str)?,
            to_placement_guid: parse_guid(&to_placement_str)?,
            moved_at: parse_utc(&moved_at_str)?,
        });
    }

    Ok(records)
}

/// Look up a movement type's label
pub async fn movement_type_label(pool: &SqlitePool, guid: Uuid) -> Result<Option<String>> {
    let label: Option<String> = sqlx::query_scalar("SELECT label FROM movement_types WHERE guid = ?")
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(label)
}
