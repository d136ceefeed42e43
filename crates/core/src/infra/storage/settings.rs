use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::domain::settings::FlowPathSettings;

use super::{read_json, KvStore, StoreError};

pub const SETTINGS_KEY: &str = "flowpath_settings";

/// 設定変更の通知先
pub type SettingsListener = Arc<dyn Fn(&FlowPathSettings) + Send + Sync>;

/// ユーザー設定ストア
///
/// 変更は即座に保存し、登録順にリスナーへ通知する。
pub struct SettingsStore {
    store: Arc<dyn KvStore>,
    current: RwLock<FlowPathSettings>,
    listeners: Mutex<Vec<SettingsListener>>,
}

impl SettingsStore {
    pub fn load(store: Arc<dyn KvStore>) -> Result<Self, StoreError> {
        let current = read_json(store.as_ref(), SETTINGS_KEY)?
            .map(|value| FlowPathSettings::from_value(&value))
            .unwrap_or_default();
        Ok(Self {
            store,
            current: RwLock::new(current),
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn get(&self) -> FlowPathSettings {
        self.current.read().clone()
    }

    pub fn set(&self, settings: FlowPathSettings) -> Result<(), StoreError> {
        self.update(|s| *s = settings)
    }

    /// 部分更新。値が変わらなければ保存も通知もしない。
    pub fn update(&self, f: impl FnOnce(&mut FlowPathSettings)) -> Result<(), StoreError> {
        let snapshot = {
            let mut current = self.current.write();
            let mut next = current.clone();
            f(&mut next);
            if next == *current {
                return Ok(());
            }
            self.store
                .set(SETTINGS_KEY, &serde_json::to_string(&next)?)?;
            *current = next.clone();
            next
        };

        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(&snapshot);
        }
        Ok(())
    }

    pub fn on_change(&self, listener: SettingsListener) {
        self.listeners.lock().push(listener);
    }
}
