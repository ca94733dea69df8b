//! Durable backend on a local libSQL database

use std::path::Path;

use libsql::{Builder, Connection, Database};

use super::{KeyValueStore, StoreResult};

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Key-value table in a local libSQL (`SQLite`) file
pub struct LibSqlStore {
    _db: Database,
    conn: Connection,
}

impl std::fmt::Debug for LibSqlStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("LibSqlStore").finish_non_exhaustive()
    }
}

impl LibSqlStore {
    /// Open a store at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let path_str = path.as_ref().to_string_lossy().to_string();
        Self::open_with(Builder::new_local(&path_str).build().await?).await
    }

    /// Open an in-memory store (useful for testing)
    pub async fn open_in_memory() -> StoreResult<Self> {
        Self::open_with(Builder::new_local(":memory:").build().await?).await
    }

    async fn open_with(db: Database) -> StoreResult<Self> {
        let conn = db.connect()?;
        let store = Self { _db: db, conn };
        store.configure().await?;
        store.migrate().await?;
        Ok(store)
    }

    async fn configure(&self) -> StoreResult<()> {
        // Pragmas are best effort; journal_mode returns a row
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        Ok(())
    }

    async fn migrate(&self) -> StoreResult<()> {
        let version = self.schema_version().await?;
        if version < 1 {
            self.migrate_v1().await?;
        }
        Ok(())
    }

    async fn schema_version(&self) -> StoreResult<i32> {
        let mut rows = self
            .conn
            .query(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                (),
            )
            .await?;

        let exists = match rows.next().await? {
            Some(row) => row.get::<i32>(0)? != 0,
            None => false,
        };
        if !exists {
            return Ok(0);
        }

        let mut rows = self
            .conn
            .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    /// Migration to version 1: key-value table
    async fn migrate_v1(&self) -> StoreResult<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
                (),
            )
            .await?;
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS kv_store (
                     key TEXT PRIMARY KEY NOT NULL,
                     value TEXT NOT NULL
                 )",
                (),
            )
            .await?;
        self.conn
            .execute(
                "INSERT INTO schema_version (version) VALUES (?)",
                [CURRENT_VERSION],
            )
            .await?;
        tracing::debug!("kv_store schema migrated to v{CURRENT_VERSION}");
        Ok(())
    }
}

impl KeyValueStore for LibSqlStore {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM kv_store WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?", [key])
            .await?;
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.conn.execute("DELETE FROM kv_store", ()).await?;
        Ok(())
    }

    async fn multi_set(&self, pairs: &[(String, String)]) -> StoreResult<()> {
        let tx = self.conn.transaction().await?;
        for (key, value) in pairs {
            tx.execute(
                "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)",
                [key.as_str(), value.as_str()],
            )
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
