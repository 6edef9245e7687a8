//! Master-data lookups
//!
//! Read-only resolution services over the tables owned by the surrounding
//! CRUD layer. Everything here returns `Ok(None)` for "not found"; callers
//! decide whether that is an error.

use crate::codegen::SequenceKey;
use crate::db::parse_guid;
use amt_common::{LocationKind, Result};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Asset identity resolved from its tag
#[derive(Debug, Clone)]
pub struct AssetRef {
    pub guid: Uuid,
    pub tag: String,
    pub category_guid: Option<Uuid>,
    pub vendor_guid: Option<Uuid>,
    pub bank_guid: Option<Uuid>,
}

/// A master-data row resolved by guid
#[derive(Debug, Clone)]
pub struct MasterRef {
    pub guid: Uuid,
    pub code: String,
}

/// Tables sharing the (guid, code, name) shape
#[derive(Debug, Clone, Copy)]
pub(crate) enum CodedTable {
    Categories,
    Vendors,
    Banks,
    Projects,
    States,
    Statuses,
}

impl CodedTable {
    fn name(self) -> &'static str {
        match self {
            CodedTable::Categories => "categories",
            CodedTable::Vendors => "vendors",
            CodedTable::Banks => "banks",
            CodedTable::Projects => "projects",
            CodedTable::States => "states",
            CodedTable::Statuses => "statuses",
        }
    }
}

/// Load a master row by guid from one of the coded tables
pub(crate) async fn master_by_guid(
    pool: &SqlitePool,
    table: CodedTable,
    guid: Uuid,
) -> Result<Option<MasterRef>> {
    let sql = format!("SELECT guid, code FROM {} WHERE guid = ?", table.name());
    let row = sqlx::query(&sql)
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let guid_str: String = row.get("guid");
            Ok(Some(MasterRef {
                guid: parse_guid(&guid_str)?,
                code: row.get("code"),
            }))
        }
        None => Ok(None),
    }
}

/// Resolve an asset by its unique tag
pub async fn resolve_asset_by_tag(pool: &SqlitePool, tag: &str) -> Result<Option<AssetRef>> {
    let row = sqlx::query(
        r#"
        SELECT guid, tag, category_guid, vendor_guid, bank_guid
        FROM assets
        WHERE tag = ?
        "#,
    )
    .bind(tag)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let guid_str: String = row.get("guid");
            Ok(Some(AssetRef {
                guid: parse_guid(&guid_str)?,
                tag: row.get("tag"),
                category_guid: crate::db::opt_guid(row.get("category_guid"))?,
                vendor_guid: crate::db::opt_guid(row.get("vendor_guid"))?,
                bank_guid: crate::db::opt_guid(row.get("bank_guid"))?,
            }))
        }
        None => Ok(None),
    }
}

/// Resolve a code against one of the coded tables
async fn resolve_coded(pool: &SqlitePool, table: CodedTable, code: &str) -> Result<Option<Uuid>> {
    let sql = format!("SELECT guid FROM {} WHERE code = ?", table.name());
    let guid: Option<String> = sqlx::query_scalar(&sql)
        .bind(code)
        .fetch_optional(pool)
        .await?;

    guid.as_deref().map(parse_guid).transpose()
}

/// Resolve a status code to its guid
pub async fn resolve_status(pool: &SqlitePool, code: &str) -> Result<Option<Uuid>> {
    resolve_coded(pool, CodedTable::Statuses, code).await
}

/// Resolve a category code to its guid
pub async fn resolve_category(pool: &SqlitePool, code: &str) -> Result<Option<Uuid>> {
    resolve_coded(pool, CodedTable::Categories, code).await
}

/// Resolve a vendor code to its guid
pub async fn resolve_vendor(pool: &SqlitePool, code: &str) -> Result<Option<Uuid>> {
    resolve_coded(pool, CodedTable::Vendors, code).await
}

/// Resolve a bank code to its guid
pub async fn resolve_bank(pool: &SqlitePool, code: &str) -> Result<Option<Uuid>> {
    resolve_coded(pool, CodedTable::Banks, code).await
}

/// Resolve a project code to its guid
pub async fn resolve_project(pool: &SqlitePool, code: &str) -> Result<Option<Uuid>> {
    resolve_coded(pool, CodedTable::Projects, code).await
}

/// Resolve a state code to its guid
pub async fn resolve_state(pool: &SqlitePool, code: &str) -> Result<Option<Uuid>> {
    resolve_coded(pool, CodedTable::States, code).await
}

/// Resolve a location code against Site, then Datacenter, then Warehouse.
///
/// First match wins; location codes are globally unique across the three
/// kinds so the priority order cannot produce ambiguity.
pub async fn resolve_location_code(
    pool: &SqlitePool,
    code: &str,
) -> Result<Option<(LocationKind, Uuid)>> {
    for kind in LocationKind::placeable() {
        let sql = match kind {
            LocationKind::Site => "SELECT guid FROM sites WHERE code = ?",
            LocationKind::Datacenter => "SELECT guid FROM datacenters WHERE code = ?",
            LocationKind::Warehouse => "SELECT guid FROM warehouses WHERE code = ?",
            LocationKind::Factory => continue,
        };
        let guid: Option<String> = sqlx::query_scalar(sql)
            .bind(code)
            .fetch_optional(pool)
            .await?;
        if let Some(guid) = guid {
            return Ok(Some((kind, parse_guid(&guid)?)));
        }
    }

    Ok(None)
}

/// Look up a location's code by kind and guid
pub async fn location_code(
    pool: &SqlitePool,
    kind: LocationKind,
    guid: Uuid,
) -> Result<Option<String>> {
    let sql = match kind {
        LocationKind::Site => "SELECT code FROM sites WHERE guid = ?",
        LocationKind::Warehouse => "SELECT code FROM warehouses WHERE guid = ?",
        LocationKind::Datacenter => "SELECT code FROM datacenters WHERE guid = ?",
        LocationKind::Factory => return Ok(None),
    };
    let code: Option<String> = sqlx::query_scalar(sql)
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(code)
}

/// Check a location exists, inside a placement transaction
pub(crate) async fn location_exists(
    conn: &mut SqliteConnection,
    kind: LocationKind,
    guid: Uuid,
) -> Result<bool> {
    let sql = match kind {
        LocationKind::Site => "SELECT EXISTS(SELECT 1 FROM sites WHERE guid = ?)",
        LocationKind::Warehouse => "SELECT EXISTS(SELECT 1 FROM warehouses WHERE guid = ?)",
        LocationKind::Datacenter => "SELECT EXISTS(SELECT 1 FROM datacenters WHERE guid = ?)",
        LocationKind::Factory => return Ok(false),
    };
    let exists: bool = sqlx::query_scalar(sql)
        .bind(guid.to_string())
        .fetch_one(conn)
        .await?;

    Ok(exists)
}

/// Check a status exists, inside a placement transaction
pub(crate) async fn status_exists(conn: &mut SqliteConnection, guid: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM statuses WHERE guid = ?)")
        .bind(guid.to_string())
        .fetch_one(conn)
        .await?;

    Ok(exists)
}

/// All currently-issued codes sharing a composite key's dimension.
///
/// Asset tags are read from the assets table, site codes from the sites
/// table. Bulk uploads write those tables directly, which is exactly why
/// the allocator reconciles against this list.
pub async fn issued_codes(pool: &SqlitePool, key: &SequenceKey) -> Result<Vec<String>> {
    let codes = match key {
        SequenceKey::AssetTag {
            category_guid,
            vendor_guid,
            bank_guid,
        } => {
            sqlx::query_scalar(
                r#"
                SELECT tag FROM assets
                WHERE category_guid = ? AND vendor_guid = ? AND bank_guid = ?
                ORDER BY tag
                "#,
            )
            .bind(category_guid.to_string())
            .bind(vendor_guid.to_string())
            .bind(bank_guid.to_string())
            .fetch_all(pool)
            .await?
        }
        SequenceKey::SiteCode {
            project_guid,
            state_guid,
        } => {
            sqlx::query_scalar(
                r#"
                SELECT code FROM sites
                WHERE project_guid = ? AND state_guid = ?
                ORDER BY code
                "#,
            )
            .bind(project_guid.to_string())
            .bind(state_guid.to_string())
            .fetch_all(pool)
            .await?
        }
    };

    Ok(codes)
}
