use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::domain::error::AppError;
use crate::domain::preset::Preset;

/// 兄弟ウィジェットへ伝えるプリセットの変更
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetChange {
    Upsert { name: String, preset: Preset },
    Delete { name: String },
}

impl PresetChange {
    pub fn name(&self) -> &str {
        match self {
            Self::Upsert { name, .. } | Self::Delete { name } => name,
        }
    }
}

/// 永続化文字列を書き換えた後に呼ぶ再描画フック
pub type RawRedraw = Arc<dyn Fn(&str) + Send + Sync>;

/// 同期を受け取れるウィジェット
pub trait PresetSyncTarget: Send + Sync {
    fn instance_id(&self) -> &str;
    /// 追加/更新か削除のどちらか1つを自分のプリセットに反映する
    fn apply_preset_change(&self, change: &PresetChange) -> Result<(), AppError>;
}

enum Subscriber {
    Live {
        instance_id: String,
        target: Weak<dyn PresetSyncTarget>,
    },
    /// 同期メソッドを持たないインスタンス。永続化文字列を直接書き換える。
    Raw {
        instance_id: String,
        data: Arc<Mutex<String>>,
        redraw: Option<RawRedraw>,
    },
}

impl Subscriber {
    fn instance_id(&self) -> &str {
        match self {
            Self::Live { instance_id, .. } | Self::Raw { instance_id, .. } => instance_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub delivered: usize,
    pub fallback: usize,
    pub failed: usize,
}

/// ドキュメント単位のプリセット同期バス
#[derive(Default)]
pub struct SyncBus {
    documents: Mutex<HashMap<String, Vec<Subscriber>>>,
}

impl SyncBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, document_id: &str, target: &Arc<dyn PresetSyncTarget>) {
        let instance_id = target.instance_id().to_string();
        self.replace(
            document_id,
            Subscriber::Live {
                instance_id,
                target: Arc::downgrade(target),
            },
        );
    }

    pub fn subscribe_raw(
        &self,
        document_id: &str,
        instance_id: &str,
        data: Arc<Mutex<String>>,
        redraw: Option<RawRedraw>,
    ) {
        self.replace(
            document_id,
            Subscriber::Raw {
                instance_id: instance_id.to_string(),
                data,
                redraw,
            },
        );
    }

    fn replace(&self, document_id: &str, subscriber: Subscriber) {
        let mut docs = self.documents.lock();
        let subs = docs.entry(document_id.to_string()).or_default();
        subs.retain(|s| s.instance_id() != subscriber.instance_id());
        subs.push(subscriber);
    }

    pub fn unsubscribe(&self, document_id: &str, instance_id: &str) {
        let mut docs = self.documents.lock();
        if let Some(subs) = docs.get_mut(document_id) {
            subs.retain(|s| s.instance_id() != instance_id);
            if subs.is_empty() {
                docs.remove(document_id);
            }
        }
    }

    /// 購読中のインスタンス数
    pub fn subscriber_count(&self, document_id: &str) -> usize {
        self.documents
            .lock()
            .get(document_id)
            .map_or(0, |subs| subs.len())
    }

    /// 送信元以外の全インスタンスへ配信する。1件の失敗は他に影響しない。
    pub fn broadcast(&self, document_id: &str, origin: &str, change: &PresetChange) -> SyncReport {
        enum Delivery {
            Live(Arc<dyn PresetSyncTarget>),
            Raw(String, Arc<Mutex<String>>, Option<RawRedraw>),
        }

        // 配信中にバスへ再入できるよう、ロックは配信前に外す
        let deliveries: Vec<Delivery> = {
            let mut docs = self.documents.lock();
            let Some(subs) = docs.get_mut(document_id) else {
                return SyncReport::default();
            };
            subs.retain(|s| match s {
                Subscriber::Live { target, .. } => target.strong_count() > 0,
                Subscriber::Raw { .. } => true,
            });
            subs.iter()
                .filter(|s| s.instance_id() != origin)
                .filter_map(|s| match s {
                    Subscriber::Live { target, .. } => target.upgrade().map(Delivery::Live),
                    Subscriber::Raw {
                        instance_id,
                        data,
                        redraw,
                    } => Some(Delivery::Raw(
                        instance_id.clone(),
                        data.clone(),
                        redraw.clone(),
                    )),
                })
                .collect()
        };

        let mut report = SyncReport::default();
        for delivery in deliveries {
            match delivery {
                Delivery::Live(target) => match target.apply_preset_change(change) {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        log::warn!("インスタンス {} への同期に失敗: {e}", target.instance_id());
                        report.failed += 1;
                    }
                },
                Delivery::Raw(instance_id, data, redraw) => {
                    let applied = {
                        let mut raw = data.lock();
                        apply_to_raw(&raw, change).map(|updated| {
                            *raw = updated.clone();
                            updated
                        })
                    };
                    match applied {
                        Ok(updated) => {
                            report.fallback += 1;
                            if let Some(redraw) = redraw {
                                redraw(&updated);
                            }
                        }
                        Err(e) => {
                            log::warn!("インスタンス {instance_id} への同期に失敗: {e}");
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        log::info!(
            "プリセット \"{}\" を同期: direct={} fallback={} failed={}",
            change.name(),
            report.delivered,
            report.fallback,
            report.failed
        );
        report
    }
}

/// 永続化文字列の `presets` を書き換える。
///
/// 削除したプリセットが読み込み中なら `activePresetName` も外す。他のフィールドはそのまま残す。
pub fn apply_to_raw(raw: &str, change: &PresetChange) -> Result<String, AppError> {
    let source = if raw.trim().is_empty() { "{}" } else { raw };
    let mut data: Value = serde_json::from_str(source)
        .map_err(|e| AppError::sync(format!("widget_data parse: {e}")))?;
    let obj = data
        .as_object_mut()
        .ok_or_else(|| AppError::sync("widget_data is not an object"))?;

    match change {
        PresetChange::Upsert { name, preset } => {
            let value = serde_json::to_value(preset)
                .map_err(|e| AppError::sync(format!("preset serialize: {e}")))?;
            let presets = obj
                .entry("presets")
                .or_insert_with(|| Value::Object(Default::default()));
            if !presets.is_object() {
                *presets = Value::Object(Default::default());
            }
            if let Some(map) = presets.as_object_mut() {
                map.insert(name.clone(), value);
            }
        }
        PresetChange::Delete { name } => {
            if let Some(map) = obj.get_mut("presets").and_then(Value::as_object_mut) {
                map.remove(name);
            }
            if obj.get("activePresetName").and_then(Value::as_str) == Some(name.as_str()) {
                obj.insert("activePresetName".to_string(), Value::Null);
            }
        }
    }

    serde_json::to_string(&data).map_err(|e| AppError::sync(format!("widget_data serialize: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::preset::PresetMap;
    use crate::domain::types::Segment;
    use serde_json::json;

    struct Recorder {
        id: String,
        presets: Mutex<PresetMap>,
        fail: bool,
    }

    impl Recorder {
        fn new(id: &str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                presets: Mutex::new(PresetMap::new()),
                fail,
            })
        }
    }

    impl PresetSyncTarget for Recorder {
        fn instance_id(&self) -> &str {
            &self.id
        }

        fn apply_preset_change(&self, change: &PresetChange) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::sync("boom"));
            }
            let mut presets = self.presets.lock();
            match change {
                PresetChange::Upsert { name, preset } => {
                    presets.insert(name.clone(), preset.clone());
                }
                PresetChange::Delete { name } => {
                    presets.remove(name);
                }
            }
            Ok(())
        }
    }

    fn upsert(name: &str, tag: &str) -> PresetChange {
        PresetChange::Upsert {
            name: name.to_string(),
            preset: Preset {
                segments: vec![Segment::custom(tag)],
                ..Default::default()
            },
        }
    }

    fn subscribe(bus: &SyncBus, doc: &str, target: &Arc<Recorder>) {
        let target: Arc<dyn PresetSyncTarget> = target.clone();
        bus.subscribe(doc, &target);
    }

    #[test]
    fn test_broadcast_skips_origin_and_other_documents() {
        let bus = SyncBus::new();
        let (a, b, c) = (Recorder::new("a", false), Recorder::new("b", false), Recorder::new("c", false));
        subscribe(&bus, "doc1", &a);
        subscribe(&bus, "doc1", &b);
        subscribe(&bus, "doc2", &c);

        let report = bus.broadcast("doc1", "a", &upsert("P", "x"));
        assert_eq!(report, SyncReport { delivered: 1, fallback: 0, failed: 0 });
        assert!(a.presets.lock().is_empty());
        assert!(b.presets.lock().contains_key("P"));
        assert!(c.presets.lock().is_empty());
    }

    #[test]
    fn test_failure_is_isolated() {
        let bus = SyncBus::new();
        let (a, bad, c) = (Recorder::new("a", false), Recorder::new("bad", true), Recorder::new("c", false));
        subscribe(&bus, "doc", &a);
        subscribe(&bus, "doc", &bad);
        subscribe(&bus, "doc", &c);

        let report = bus.broadcast("doc", "a", &upsert("P", "x"));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert!(c.presets.lock().contains_key("P"));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let bus = SyncBus::new();
        let (a, b) = (Recorder::new("a", false), Recorder::new("b", false));
        subscribe(&bus, "doc", &a);
        subscribe(&bus, "doc", &b);

        bus.broadcast("doc", "a", &upsert("P", "x"));
        let once = b.presets.lock().clone();
        bus.broadcast("doc", "a", &upsert("P", "x"));
        assert_eq!(*b.presets.lock(), once);
        assert_eq!(once.len(), 1);
    }

    #[test]
    fn test_dropped_targets_are_pruned() {
        let bus = SyncBus::new();
        let a = Recorder::new("a", false);
        subscribe(&bus, "doc", &a);
        {
            let gone = Recorder::new("gone", false);
            subscribe(&bus, "doc", &gone);
        }
        assert_eq!(bus.subscriber_count("doc"), 2);
        let report = bus.broadcast("doc", "a", &upsert("P", "x"));
        assert_eq!(report, SyncReport::default());
        assert_eq!(bus.subscriber_count("doc"), 1);
    }

    #[test]
    fn test_raw_fallback() {
        let bus = SyncBus::new();
        let data = Arc::new(Mutex::new(
            json!({ "segments": [], "extra": 1 }).to_string(),
        ));
        let redraws = Arc::new(Mutex::new(Vec::<String>::new()));
        let seen = redraws.clone();
        bus.subscribe_raw(
            "doc",
            "old",
            data.clone(),
            Some(Arc::new(move |raw: &str| seen.lock().push(raw.to_string()))),
        );

        let report = bus.broadcast("doc", "a", &upsert("P", "x"));
        assert_eq!(report.fallback, 1);
        assert_eq!(redraws.lock().len(), 1);
        let value: Value = serde_json::from_str(&data.lock()).unwrap();
        assert_eq!(value["extra"], 1);
        assert_eq!(value["presets"]["P"]["segments"][0]["value"], "x");

        bus.broadcast(
            "doc",
            "a",
            &PresetChange::Delete {
                name: "P".to_string(),
            },
        );
        let value: Value = serde_json::from_str(&data.lock()).unwrap();
        assert!(value["presets"].as_object().unwrap().is_empty());
        assert_eq!(redraws.lock().len(), 2);
        assert_eq!(redraws.lock()[1], *data.lock());
    }

    #[test]
    fn test_raw_delete_clears_active_preset() {
        let delete = |name: &str| PresetChange::Delete {
            name: name.to_string(),
        };
        let raw = json!({
            "presets": { "P": { "segments": [] }, "Q": { "segments": [] } },
            "activePresetName": "P"
        })
        .to_string();

        let kept: Value = serde_json::from_str(&apply_to_raw(&raw, &delete("Q")).unwrap()).unwrap();
        assert_eq!(kept["activePresetName"], "P");

        let cleared: Value =
            serde_json::from_str(&apply_to_raw(&raw, &delete("P")).unwrap()).unwrap();
        assert!(cleared["activePresetName"].is_null());
        assert!(cleared["presets"].get("P").is_none());
    }

    #[test]
    fn test_raw_fallback_corrupt_data_counts_failed() {
        let bus = SyncBus::new();
        let data = Arc::new(Mutex::new("{broken".to_string()));
        bus.subscribe_raw("doc", "old", data.clone(), None);
        let report = bus.broadcast("doc", "a", &upsert("P", "x"));
        assert_eq!(report.failed, 1);
        assert_eq!(*data.lock(), "{broken");
    }

    #[test]
    fn test_apply_to_raw_empty_string() {
        let raw = apply_to_raw("", &upsert("P", "x")).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert!(value["presets"]["P"].is_object());
    }

    #[test]
    fn test_unsubscribe() {
        let bus = SyncBus::new();
        let a = Recorder::new("a", false);
        subscribe(&bus, "doc", &a);
        subscribe(&bus, "doc", &a);
        assert_eq!(bus.subscriber_count("doc"), 1);
        bus.unsubscribe("doc", "a");
        assert_eq!(bus.subscriber_count("doc"), 0);
    }
}
