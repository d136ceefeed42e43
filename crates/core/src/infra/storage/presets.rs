use std::sync::Arc;

use crate::domain::preset::{parse_preset_map, Preset, PresetMap};

use super::{read_json, KvStore, StoreError};

pub const GLOBAL_PRESETS_KEY: &str = "flowpath_global_presets";

/// 全ドキュメント共有のユーザープリセット
#[derive(Clone)]
pub struct GlobalPresetRepo {
    store: Arc<dyn KvStore>,
}

impl GlobalPresetRepo {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// 読み込み。不正なエントリだけを捨てる。
    pub fn load(&self) -> Result<PresetMap, StoreError> {
        Ok(read_json(self.store.as_ref(), GLOBAL_PRESETS_KEY)?
            .map(|value| parse_preset_map(&value, GLOBAL_PRESETS_KEY))
            .unwrap_or_default())
    }

    pub fn save(&self, presets: &PresetMap) -> Result<(), StoreError> {
        let json = serde_json::to_string(presets)?;
        self.store.set(GLOBAL_PRESETS_KEY, &json)
    }

    pub fn upsert(&self, name: &str, preset: &Preset) -> Result<(), StoreError> {
        let mut presets = self.load()?;
        presets.insert(name.to_string(), preset.clone());
        self.save(&presets)
    }

    /// 削除した件数を返す
    pub fn remove(&self, names: &[String]) -> Result<usize, StoreError> {
        let mut presets = self.load()?;
        let removed = names
            .iter()
            .filter(|name| presets.remove(name.as_str()).is_some())
            .count();
        if removed > 0 {
            self.save(&presets)?;
        }
        Ok(removed)
    }
}
