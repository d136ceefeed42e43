use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::{KvStore, StoreError};

/// SQLite のキー・バリューストア
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    /// 新規接続（ファイルパス指定）
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// in-memory DB（テスト用）
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// 既定の場所に開く。`FLOWPATH_DB_PATH` があればそちらを使う。
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf, StoreError> {
        if let Ok(path) = std::env::var("FLOWPATH_DB_PATH") {
            return Ok(PathBuf::from(path));
        }
        let dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flowpath");
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join("flowpath.db"))
    }

    /// スキーママイグレーション
    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.lock().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .lock()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn.lock().execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .lock()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        assert!(store.get("nothing").unwrap().is_none());
    }

    #[test]
    fn test_set_overwrites() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn test_remove() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        store.set("k", "v").unwrap();
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        store.migrate().unwrap();
        store.set("k", "v").unwrap();
        store.migrate().unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
