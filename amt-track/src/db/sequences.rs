//! Sequence generator store
//!
//! One counter row per composite business key. `running_seq` is written
//! only inside an allocation transaction; the upsert in `lock_generator`
//! is deliberately the transaction's first statement so the SQLite write
//! lock serializes concurrent allocators on the same database.

use amt_common::Result;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Padding width applied to generators that have never been persisted
pub const DEFAULT_MAX_SEQ_DIGIT: i64 = 5;

/// Persistent counter row for one composite key
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    pub key: String,
    /// Next sequence to try
    pub running_seq: i64,
    /// Zero-padding width for formatted codes
    pub max_seq_digit: i64,
}

/// Get-or-create the generator row inside an allocation transaction.
///
/// The upsert is a write even when the row already exists, which acquires
/// the write lock before the counter is read.
pub async fn lock_generator(conn: &mut SqliteConnection, key: &str) -> Result<SequenceGenerator> {
    sqlx::query(
        r#"
        INSERT INTO sequence_generators (key)
        VALUES (?)
        ON CONFLICT(key) DO UPDATE SET updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query(
        "SELECT key, running_seq, max_seq_digit FROM sequence_generators WHERE key = ?",
    )
    .bind(key)
    .fetch_one(&mut *conn)
    .await?;

    Ok(SequenceGenerator {
        key: row.get("key"),
        running_seq: row.get("running_seq"),
        max_seq_digit: row.get("max_seq_digit"),
    })
}

/// Read the generator row without creating or locking it (preview path)
pub async fn read_generator(pool: &SqlitePool, key: &str) -> Result<Option<SequenceGenerator>> {
    let row = sqlx::query(
        "SELECT key, running_seq, max_seq_digit FROM sequence_generators WHERE key = ?",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| SequenceGenerator {
        key: row.get("key"),
        running_seq: row.get("running_seq"),
        max_seq_digit: row.get("max_seq_digit"),
    }))
}

/// Persist the advanced counter before commit
pub async fn persist_running_seq(
    conn: &mut SqliteConnection,
    key: &str,
    running_seq: i64,
) -> Result<()> {
    sqlx::query(
        "UPDATE sequence_generators SET running_seq = ?, updated_at = CURRENT_TIMESTAMP WHERE key = ?",
    )
    .bind(running_seq)
    .bind(key)
    .execute(conn)
    .await?;

    Ok(())
}
