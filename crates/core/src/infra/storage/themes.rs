use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::theme::{builtin_theme, parse_custom_themes, resolve_theme, Theme};

use super::{read_json, KvStore, StoreError};

pub const CUSTOM_THEMES_KEY: &str = "flowpath_custom_themes";

/// ユーザー定義テーマ
#[derive(Clone)]
pub struct ThemeRepo {
    store: Arc<dyn KvStore>,
}

impl ThemeRepo {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<BTreeMap<String, Theme>, StoreError> {
        Ok(read_json(self.store.as_ref(), CUSTOM_THEMES_KEY)?
            .map(|value| parse_custom_themes(&value))
            .unwrap_or_default())
    }

    /// 組み込みテーマのキーは上書きできない。保存できたら true。
    pub fn save_theme(&self, key: &str, theme: &Theme) -> Result<bool, StoreError> {
        if builtin_theme(key).is_some() {
            log::warn!("組み込みテーマ \"{key}\" は上書きできません");
            return Ok(false);
        }
        let mut themes = self.load()?;
        themes.insert(key.to_string(), theme.clone());
        self.store
            .set(CUSTOM_THEMES_KEY, &serde_json::to_string(&themes)?)?;
        Ok(true)
    }

    pub fn delete_theme(&self, key: &str) -> Result<bool, StoreError> {
        let mut themes = self.load()?;
        if themes.remove(key).is_none() {
            return Ok(false);
        }
        self.store
            .set(CUSTOM_THEMES_KEY, &serde_json::to_string(&themes)?)?;
        Ok(true)
    }

    /// キーからテーマを解決する（未知のキーは umbrael）
    pub fn resolve(&self, key: &str) -> Result<Theme, StoreError> {
        Ok(resolve_theme(key, &self.load()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::storage::MemoryKvStore;

    fn mint() -> Theme {
        Theme {
            name: "Mint".into(),
            primary: "#3eb489".into(),
            primary_light: "a".into(),
            primary_dark: "b".into(),
            gradient: "c".into(),
            accent: "d".into(),
            secondary: "e".into(),
            background: "f".into(),
        }
    }

    #[test]
    fn test_save_load_delete() {
        let repo = ThemeRepo::new(Arc::new(MemoryKvStore::new()));
        assert!(repo.save_theme("mint", &mint()).unwrap());
        assert_eq!(repo.resolve("mint").unwrap().name, "Mint");
        assert!(repo.delete_theme("mint").unwrap());
        assert!(!repo.delete_theme("mint").unwrap());
        assert_eq!(repo.resolve("mint").unwrap().name, "Umbrael's Umbrage");
    }

    #[test]
    fn test_builtin_keys_are_protected() {
        let repo = ThemeRepo::new(Arc::new(MemoryKvStore::new()));
        assert!(!repo.save_theme("batman", &mint()).unwrap());
        assert!(repo.load().unwrap().is_empty());
    }
}
