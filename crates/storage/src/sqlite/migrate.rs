use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned migrations for the activity schema.
///
/// Version 1 creates `activity_results`, `learning_events` and their indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if is_applied(pool, 1).await? {
        tracing::debug!(version = 1, "schema migration already applied");
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS activity_results (
                id INTEGER PRIMARY KEY,
                result_id TEXT NOT NULL UNIQUE,
                learner_id INTEGER NOT NULL,
                lesson_id INTEGER NOT NULL,
                slide_id TEXT NOT NULL,
                correct INTEGER NOT NULL CHECK (correct IN (0, 1)),
                elapsed_ms INTEGER NOT NULL CHECK (elapsed_ms >= 0),
                attempts INTEGER NOT NULL CHECK (attempts >= 1),
                tags TEXT NOT NULL,
                level TEXT NOT NULL,
                accuracy_percent INTEGER NOT NULL CHECK (accuracy_percent BETWEEN 0 AND 100),
                recorded_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS learning_events (
                id INTEGER PRIMARY KEY,
                result_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                learner_id INTEGER NOT NULL,
                lesson_id INTEGER NOT NULL,
                slide_id TEXT NOT NULL,
                success INTEGER NOT NULL CHECK (success IN (0, 1)),
                attempts INTEGER NOT NULL CHECK (attempts >= 1),
                elapsed_ms INTEGER NOT NULL CHECK (elapsed_ms >= 0),
                level TEXT NOT NULL,
                tags TEXT NOT NULL,
                occurred_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_activity_results_learner_lesson_recorded
                ON activity_results (learner_id, lesson_id, recorded_at);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_learning_events_learner_occurred
                ON learning_events (learner_id, occurred_at);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(1_i64)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::debug!(version = 1, "schema migration applied");

    Ok(())
}
