use anyhow::Result;
use chrono::{DateTime, Utc};
use hiproc_lib::Database;
use std::sync::Arc;
use tempfile::TempDir;

/// File-backed database in a temp dir; keep the dir alive for the test
pub async fn create_test_db() -> Result<(Arc<Database>, TempDir)> {
    let dir = tempfile::tempdir()?;
    let db = Database::new(dir.path().join("test.db")).await?;
    Ok((Arc::new(db), dir))
}

/// Overwrite usage stats so ordering can be set up directly
#[allow(dead_code)]
pub async fn set_usage(
    db: &Database,
    id: i64,
    use_count: i64,
    last_used_at: Option<DateTime<Utc>>,
) -> Result<()> {
    sqlx::query("UPDATE commands SET use_count = ?, last_used_at = ? WHERE id = ?")
        .bind(use_count)
        .bind(last_used_at)
        .bind(id)
        .execute(db.pool())
        .await?;
    Ok(())
}
