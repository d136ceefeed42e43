mod presets;
mod repository;
mod settings;
mod themes;

pub use presets::{GlobalPresetRepo, GLOBAL_PRESETS_KEY};
pub use repository::SqliteKvStore;
pub use settings::{SettingsListener, SettingsStore, SETTINGS_KEY};
pub use themes::{ThemeRepo, CUSTOM_THEMES_KEY};

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::domain::error::AppError;

/// ストレージエラー
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::storage(e.to_string())
    }
}

/// キー → 文字列値のストア（ホストの設定ストア / localStorage 相当）
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// プロセス内ストア（テスト・一時利用）
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// 保存済み JSON を読む。壊れていれば警告して None。
pub(crate) fn read_json(store: &dyn KvStore, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            log::warn!("{key} の解析に失敗、無視します: {e}");
            Ok(None)
        }
    }
}
