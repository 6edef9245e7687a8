//! Shared test fixtures
#![allow(dead_code)]

use sqlx::SqlitePool;
use uuid::Uuid;

/// Initialize tracing once per test binary; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Seeded world for placement tests
pub struct Fixture {
    pub asset_guid: Uuid,
    pub asset_tag: String,
    pub site_guid: Uuid,
    pub warehouse_guid: Uuid,
    pub datacenter_guid: Uuid,
    pub status_guid: Uuid,
}

/// In-memory pool with full schema and seed data.
///
/// Note: in-memory SQLite databases are per-connection; tests using this
/// pool must run their statements sequentially so the pool keeps reusing
/// the one connection that holds the schema. Concurrency tests use a
/// file-backed database instead (see `file_pool`).
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();
    amt_common::db::init::create_schema(&pool).await.unwrap();
    amt_common::db::init::seed_reference_data(&pool).await.unwrap();
    pool
}

/// File-backed pool via the real initialization path (WAL, busy timeout)
pub async fn file_pool(dir: &tempfile::TempDir) -> SqlitePool {
    let db_path = dir.path().join("amt.db");
    amt_common::db::init::init_database(&db_path).await.unwrap()
}

/// Seed one asset plus one location of each kind
pub async fn seed_world(pool: &SqlitePool) -> Fixture {
    let asset_guid = Uuid::new_v4();
    let site_guid = Uuid::new_v4();
    let warehouse_guid = Uuid::new_v4();
    let datacenter_guid = Uuid::new_v4();

    sqlx::query("INSERT INTO assets (guid, tag) VALUES (?, 'ATM-0001')")
        .bind(asset_guid.to_string())
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO sites (guid, code, name) VALUES (?, 'S-001', 'Main Street Branch')")
        .bind(site_guid.to_string())
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO warehouses (guid, code, name) VALUES (?, 'WH-001', 'Central Depot')")
        .bind(warehouse_guid.to_string())
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO datacenters (guid, code, name) VALUES (?, 'DC-001', 'East DC')")
        .bind(datacenter_guid.to_string())
        .execute(pool)
        .await
        .unwrap();

    let status: String = sqlx::query_scalar("SELECT guid FROM statuses WHERE code = 'IN_SERVICE'")
        .fetch_one(pool)
        .await
        .unwrap();

    Fixture {
        asset_guid,
        asset_tag: "ATM-0001".to_string(),
        site_guid,
        warehouse_guid,
        datacenter_guid,
        status_guid: Uuid::parse_str(&status).unwrap(),
    }
}

/// Count active (non-vacated) placement rows for an asset across all
/// three tables
pub async fn active_row_count(pool: &SqlitePool, asset_guid: Uuid) -> i64 {
    let mut total = 0i64;
    for table in ["site_placements", "warehouse_placements", "datacenter_placements"] {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE asset_guid = ? AND vacated_on IS NULL",
            table
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(asset_guid.to_string())
            .fetch_one(pool)
            .await
            .unwrap();
        total += count;
    }
    total
}
