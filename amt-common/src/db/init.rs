//! Database initialization
//!
//! Creates the database on first run, applies connection pragmas, and keeps
//! the schema idempotent: every `create_*` function is safe to call on an
//! existing database.

use crate::location::LocationKind;
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer; placement and
    // allocation transactions rely on the single-writer lock.
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Writers blocked on the single-writer lock wait rather than failing
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    seed_reference_data(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Master data
    create_categories_table(pool).await?;
    create_vendors_table(pool).await?;
    create_banks_table(pool).await?;
    create_projects_table(pool).await?;
    create_states_table(pool).await?;
    create_statuses_table(pool).await?;

    // Locations
    create_sites_table(pool).await?;
    create_warehouses_table(pool).await?;
    create_datacenters_table(pool).await?;

    // Assets and movement
    create_assets_table(pool).await?;
    create_movement_types_table(pool).await?;
    create_movement_records_table(pool).await?;

    // Placement tables
    create_site_placements_table(pool).await?;
    create_warehouse_placements_table(pool).await?;
    create_datacenter_placements_table(pool).await?;

    // Sequence counters
    create_sequence_generators_table(pool).await?;

    Ok(())
}

/// Seed reference rows that the core depends on (idempotent)
pub async fn seed_reference_data(pool: &SqlitePool) -> Result<()> {
    seed_default_statuses(pool).await?;
    seed_movement_types(pool).await?;
    Ok(())
}

async fn create_categories_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            guid TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_vendors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vendors (
            guid TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_banks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS banks (
            guid TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_projects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            guid TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_states_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS states (
            guid TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the statuses table
///
/// Stores asset lifecycle statuses referenced by placements.
pub async fn create_statuses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS statuses (
            guid TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            label TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn seed_default_statuses(pool: &SqlitePool) -> Result<()> {
    let defaults = vec![
        ("IN_SERVICE", "In Service"),
        ("IN_TRANSIT", "In Transit"),
        ("IN_STORAGE", "In Storage"),
        ("DECOMMISSIONED", "Decommissioned"),
        ("SCRAPPED", "Scrapped"),
    ];

    for (code, label) in defaults {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO statuses (guid, code, label)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(code)
        .bind(label)
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn create_sites_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sites (
            guid TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            project_guid TEXT REFERENCES projects(guid),
            state_guid TEXT REFERENCES states(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sites_code ON sites(code)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sites_project_state ON sites(project_guid, state_guid)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_warehouses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS warehouses (
            guid TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_warehouses_code ON warehouses(code)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_datacenters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS datacenters (
            guid TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_datacenters_code ON datacenters(code)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the assets table
///
/// The asset row doubles as the per-asset lock anchor: placement
/// transactions write it first to serialize on the single-writer lock.
pub async fn create_assets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assets (
            guid TEXT PRIMARY KEY,
            tag TEXT NOT NULL UNIQUE,
            category_guid TEXT REFERENCES categories(guid),
            vendor_guid TEXT REFERENCES vendors(guid),
            bank_guid TEXT REFERENCES banks(guid),
            serial TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_assets_tag ON assets(tag)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_assets_dimensions ON assets(category_guid, vendor_guid, bank_guid)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the movement_types table
///
/// Labeled (from_kind, to_kind) pairs. Pairs missing from the seed are
/// tolerated at runtime: the movement record is written with a NULL type.
pub async fn create_movement_types_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS movement_types (
            guid TEXT PRIMARY KEY,
            from_kind TEXT NOT NULL CHECK (from_kind IN ('SITE', 'WAREHOUSE', 'DATACENTER', 'FACTORY')),
            to_kind TEXT NOT NULL CHECK (to_kind IN ('SITE', 'WAREHOUSE', 'DATACENTER')),
            label TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (from_kind, to_kind)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn seed_movement_types(pool: &SqlitePool) -> Result<()> {
    use LocationKind::{Datacenter, Factory, Site, Warehouse};

    // Site<->Datacenter pairs are intentionally absent from the seed; a
    // movement over an unseeded pair records a NULL type (never fatal).
    let defaults = vec![
        (Factory, Site, "Newly Placed at Site"),
        (Factory, Warehouse, "Newly Placed at Warehouse"),
        (Factory, Datacenter, "Newly Placed at Datacenter"),
        (Site, Site, "Site to Site"),
        (Site, Warehouse, "Site to Warehouse"),
        (Warehouse, Site, "Warehouse to Site"),
        (Warehouse, Warehouse, "Warehouse to Warehouse"),
        (Warehouse, Datacenter, "Warehouse to Datacenter"),
        (Datacenter, Warehouse, "Datacenter to Warehouse"),
        (Datacenter, Datacenter, "Datacenter to Datacenter"),
    ];

    for (from_kind, to_kind, label) in defaults {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO movement_types (guid, from_kind, to_kind, label)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(from_kind.as_str())
        .bind(to_kind.as_str())
        .bind(label)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Create the movement_records table
///
/// Append-only transition history: rows are inserted once and never
/// updated or deleted. from/to placement guids are plain ids into the
/// placement table named by the matching kind column.
pub async fn create_movement_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS movement_records (
            guid TEXT PRIMARY KEY,
            asset_guid TEXT NOT NULL REFERENCES assets(guid),
            movement_type_guid TEXT REFERENCES movement_types(guid),
            from_kind TEXT NOT NULL CHECK (from_kind IN ('SITE', 'WAREHOUSE', 'DATACENTER', 'FACTORY')),
            from_placement_guid TEXT,
            to_kind TEXT NOT NULL CHECK (to_kind IN ('SITE', 'WAREHOUSE', 'DATACENTER')),
            to_placement_guid TEXT NOT NULL,
            moved_at TEXT NOT NULL,
            CHECK ((from_kind = 'FACTORY') = (from_placement_guid IS NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_movement_records_asset ON movement_records(asset_guid, moved_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the site_placements table
pub async fn create_site_placements_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS site_placements (
            guid TEXT PRIMARY KEY,
            asset_guid TEXT NOT NULL REFERENCES assets(guid),
            site_guid TEXT NOT NULL REFERENCES sites(guid),
            status_guid TEXT NOT NULL REFERENCES statuses(guid),
            deployed_on TEXT,
            activated_on TEXT,
            decommissioned_on TEXT,
            vacated_on TEXT,
            movement_record_guid TEXT REFERENCES movement_records(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_site_placements_asset ON site_placements(asset_guid)",
    )
    .execute(pool)
    .await?;
    // Table-level secondary guard: at most one active row per asset
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_site_placements_active ON site_placements(asset_guid) WHERE vacated_on IS NULL",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the warehouse_placements table
pub async fn create_warehouse_placements_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS warehouse_placements (
            guid TEXT PRIMARY KEY,
            asset_guid TEXT NOT NULL REFERENCES assets(guid),
            warehouse_guid TEXT NOT NULL REFERENCES warehouses(guid),
            status_guid TEXT NOT NULL REFERENCES statuses(guid),
            received_on TEXT,
            disposed_on TEXT,
            scrapped_on TEXT,
            vacated_on TEXT,
            movement_record_guid TEXT REFERENCES movement_records(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_warehouse_placements_asset ON warehouse_placements(asset_guid)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_warehouse_placements_active ON warehouse_placements(asset_guid) WHERE vacated_on IS NULL",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the datacenter_placements table
pub async fn create_datacenter_placements_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS datacenter_placements (
            guid TEXT PRIMARY KEY,
            asset_guid TEXT NOT NULL REFERENCES assets(guid),
            datacenter_guid TEXT NOT NULL REFERENCES datacenters(guid),
            status_guid TEXT NOT NULL REFERENCES statuses(guid),
            commissioned_on TEXT,
            disposed_on TEXT,
            scrapped_on TEXT,
            vacated_on TEXT,
            movement_record_guid TEXT REFERENCES movement_records(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_datacenter_placements_asset ON datacenter_placements(asset_guid)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_datacenter_placements_active ON datacenter_placements(asset_guid) WHERE vacated_on IS NULL",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the sequence_generators table
///
/// One row per composite business key. `running_seq` is only ever written
/// inside an allocation transaction.
pub async fn create_sequence_generators_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sequence_generators (
            key TEXT PRIMARY KEY,
            running_seq INTEGER NOT NULL DEFAULT 1,
            max_seq_digit INTEGER NOT NULL DEFAULT 5,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (running_seq >= 1),
            CHECK (max_seq_digit >= 1)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_schema_creation_is_idempotent() {
        let pool = memory_pool().await;
        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();
        seed_reference_data(&pool).await.unwrap();
        seed_reference_data(&pool).await.unwrap();

        let status_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM statuses")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status_count, 5);

        let type_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movement_types")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(type_count, 10);
    }

    #[tokio::test]
    async fn test_active_placement_unique_index_guards_second_insert() {
        let pool = memory_pool().await;
        create_schema(&pool).await.unwrap();
        seed_reference_data(&pool).await.unwrap();

        sqlx::query("INSERT INTO assets (guid, tag) VALUES ('a1', 'ATM-1')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO warehouses (guid, code, name) VALUES ('w1', 'WH-01', 'Central')")
            .execute(&pool)
            .await
            .unwrap();
        let status: String = sqlx::query_scalar("SELECT guid FROM statuses LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO warehouse_placements (guid, asset_guid, warehouse_guid, status_guid) VALUES ('p1', 'a1', 'w1', ?)",
        )
        .bind(&status)
        .execute(&pool)
        .await
        .unwrap();

        // Second active row for the same asset must hit the partial unique index
        let second = sqlx::query(
            "INSERT INTO warehouse_placements (guid, asset_guid, warehouse_guid, status_guid) VALUES ('p2', 'a1', 'w1', ?)",
        )
        .bind(&status)
        .execute(&pool)
        .await;
        assert!(second.is_err());

        // A vacated row does not count against the index
        sqlx::query(
            "INSERT INTO warehouse_placements (guid, asset_guid, warehouse_guid, status_guid, vacated_on) VALUES ('p3', 'a1', 'w1', ?, '2024-01-01T00:00:00Z')",
        )
        .bind(&status)
        .execute(&pool)
        .await
        .unwrap();
    }
}
