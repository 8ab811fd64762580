//! Database connection and initialization.

pub use certdesk_core::db::DatabaseError;

certdesk_core::define_database!(Database, "Database migrations complete");

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_works() {
        let db = Database::open_in_memory().await;
        assert!(db.is_ok());
    }

    #[tokio::test]
    async fn open_on_disk_runs_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("certdesk.db")).await.unwrap();
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM certificate")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(row.0, 0);
        db.close().await;
    }
}
