use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::domain::config::ConfigField;
use crate::domain::error::AppError;
use crate::domain::graph::Graph;
use crate::domain::job::RequestKind;
use crate::domain::preset::{default_presets, is_default_preset, PresetMap};
use crate::domain::settings::{AutoDetectMode, FlowPathSettings};
use crate::domain::state::WidgetState;
use crate::domain::theme::{Theme, FALLBACK_THEME};
use crate::domain::types::{Segment, SegmentType};
use crate::infra::clock::{Clock, SystemClock};
use crate::infra::folder::{folder_target, FolderClient, FolderOutcome};
use crate::infra::graph::prompt_graph;
use crate::infra::metrics::{Metrics, MetricsSummary};
use crate::infra::output::OutputTarget;
use crate::infra::path_builder::{BuiltOutput, OutputPreview, PathBuilder};
use crate::infra::scanner::{
    detect_loras, detect_model, detect_resolution, detect_seed, format_lora_path,
};
use crate::infra::storage::{GlobalPresetRepo, KvStore, SettingsStore, ThemeRepo};

use super::preset_store::{absorb_new, merge_presets, BatchDelete, PresetStore, SaveOutcome};
use super::request_queue::RequestQueue;
use super::sync::{PresetChange, PresetSyncTarget, SyncBus, SyncReport};

/// ウィジェット状態の変更通知
pub type ChangeListener = Arc<dyn Fn(&WidgetState) + Send + Sync>;

/// 同じドキュメントのウィジェットが共有する依存
#[derive(Clone)]
pub struct WidgetContext {
    pub document_id: String,
    pub presets: PresetStore,
    pub settings: Arc<SettingsStore>,
    pub themes: ThemeRepo,
    pub sync: Arc<SyncBus>,
    pub queue: Arc<RequestQueue>,
    pub folders: Arc<dyn FolderClient>,
    pub output: Arc<dyn OutputTarget>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<Metrics>,
}

#[cfg(feature = "clipboard")]
fn default_output() -> Arc<dyn OutputTarget> {
    Arc::new(crate::infra::output::ClipboardOutput::new())
}

#[cfg(not(feature = "clipboard"))]
fn default_output() -> Arc<dyn OutputTarget> {
    Arc::new(crate::infra::output::MemoryOutput::new())
}

impl WidgetContext {
    pub fn new(
        document_id: impl Into<String>,
        store: Arc<dyn KvStore>,
        folders: Arc<dyn FolderClient>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            document_id: document_id.into(),
            presets: PresetStore::new(GlobalPresetRepo::new(store.clone())),
            settings: Arc::new(SettingsStore::load(store.clone())?),
            themes: ThemeRepo::new(store),
            sync: Arc::new(SyncBus::new()),
            queue: Arc::new(RequestQueue::default()),
            folders,
            output: default_output(),
            clock: Arc::new(SystemClock),
            metrics: Arc::new(Metrics::new()),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_output(mut self, output: Arc<dyn OutputTarget>) -> Self {
        self.output = output;
        self
    }

    pub fn with_queue(mut self, queue: Arc<RequestQueue>) -> Self {
        self.queue = queue;
        self
    }

    /// 別ドキュメント用。ストア・設定・メトリクスは共有する。
    pub fn for_document(&self, document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            ..self.clone()
        }
    }
}

/// 検出ボタンの結果通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectNotice {
    pub found: bool,
    pub message: String,
}

impl DetectNotice {
    fn found(message: String) -> Self {
        Self {
            found: true,
            message,
        }
    }

    fn missing(message: &str) -> Self {
        Self {
            found: false,
            message: message.to_string(),
        }
    }
}

/// プリセット一覧の表示用
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetListing {
    pub defaults: Vec<String>,
    pub custom: Vec<String>,
    pub active: Option<String>,
}

/// FlowPath ウィジェット1インスタンス
///
/// 状態は自分専用のコピーを持ち、他インスタンスとは同期バス経由でのみ揃える。
pub struct FlowPathWidget {
    instance_id: String,
    ctx: WidgetContext,
    state: Mutex<WidgetState>,
    /// ホストの widget_data に相当する永続化文字列
    persisted: Arc<Mutex<String>>,
    listeners: Mutex<Vec<ChangeListener>>,
}

impl FlowPathWidget {
    /// 永続化文字列から復元し、同期バスに登録する。
    ///
    /// `graph` があれば設定に従ってモデル名・LoRA 名を自動検出する。
    pub fn create(
        ctx: WidgetContext,
        instance_id: impl Into<String>,
        raw: &str,
        graph: Option<&Graph>,
    ) -> Result<Arc<Self>, AppError> {
        let mut state = WidgetState::parse(raw);
        state.presets = match ctx.presets.merged(&state.presets) {
            Ok(merged) => merged,
            Err(e) => {
                log::warn!("グローバルプリセットを読めません、ローカルのみ使用: {e}");
                ctx.metrics.inc_error(e.code);
                merge_presets(&default_presets(), &PresetMap::new(), &state.presets)
            }
        };

        let widget = Arc::new(Self {
            instance_id: instance_id.into(),
            persisted: Arc::new(Mutex::new(state.to_json()?)),
            state: Mutex::new(state),
            ctx,
            listeners: Mutex::new(Vec::new()),
        });

        if let Some(graph) = graph {
            widget.auto_detect(graph)?;
        }

        let target: Arc<dyn PresetSyncTarget> = widget.clone();
        widget.ctx.sync.subscribe(&widget.ctx.document_id, &target);
        log::debug!("ウィジェット {} を作成", widget.instance_id);
        Ok(widget)
    }

    /// 同期バスから外し、未完了のリクエストを取り消す
    pub async fn close(&self) {
        self.ctx
            .sync
            .unsubscribe(&self.ctx.document_id, &self.instance_id);
        self.ctx.queue.cancel_instance(&self.instance_id).await;
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn state(&self) -> WidgetState {
        self.state.lock().clone()
    }

    pub fn persisted_data(&self) -> String {
        self.persisted.lock().clone()
    }

    /// 永続化文字列の共有ハンドル
    pub fn persisted_handle(&self) -> Arc<Mutex<String>> {
        self.persisted.clone()
    }

    pub fn on_change(&self, listener: ChangeListener) {
        self.listeners.lock().push(listener);
    }

    pub fn settings(&self) -> FlowPathSettings {
        self.ctx.settings.get()
    }

    pub fn metrics(&self) -> MetricsSummary {
        self.ctx.metrics.summary()
    }

    // ─── 内部 ───

    fn edit<R>(
        &self,
        f: impl FnOnce(&mut WidgetState) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let (result, snapshot) = {
            let mut state = self.state.lock();
            let result = f(&mut *state)?;
            (result, state.clone())
        };
        self.commit(&snapshot)?;
        Ok(result)
    }

    /// 永続化文字列を更新し、リスナーへ登録順に通知する
    fn commit(&self, state: &WidgetState) -> Result<(), AppError> {
        *self.persisted.lock() = state.to_json()?;
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(state);
        }
        Ok(())
    }

    fn broadcast(&self, change: PresetChange) -> SyncReport {
        let report = self
            .ctx
            .sync
            .broadcast(&self.ctx.document_id, &self.instance_id, &change);
        self.ctx.metrics.record_sync(
            report.delivered as u64,
            report.fallback as u64,
            report.failed as u64,
        );
        report
    }

    fn record<T>(&self, result: Result<T, AppError>) -> Result<T, AppError> {
        if let Err(e) = &result {
            self.ctx.metrics.inc_error(e.code);
        }
        result
    }

    // ─── セグメント・設定の編集 ───

    pub fn set_segment_enabled(&self, index: usize, enabled: bool) -> Result<(), AppError> {
        self.edit(|s| s.set_segment_enabled(index, enabled))
    }

    pub fn move_segment(&self, from: usize, drop_index: usize) -> Result<bool, AppError> {
        self.edit(|s| s.move_segment(from, drop_index))
    }

    pub fn insert_segment(&self, kind: SegmentType, value: Option<String>) -> Result<usize, AppError> {
        self.edit(|s| Ok(s.insert_segment(kind, value)))
    }

    pub fn remove_segment(&self, index: usize) -> Result<Segment, AppError> {
        self.edit(|s| s.remove_segment(index))
    }

    pub fn set_custom_value(&self, index: usize, value: &str) -> Result<(), AppError> {
        self.edit(|s| s.set_custom_value(index, value))
    }

    pub fn set_config_field(&self, field: ConfigField, value: &str) -> Result<(), AppError> {
        self.edit(|s| s.set_config_field(field, value))
    }

    pub fn available_segment_types(&self) -> Vec<SegmentType> {
        self.state.lock().available_segment_types()
    }

    // ─── プレビュー・出力 ───

    pub fn preview(&self) -> OutputPreview {
        let state = self.state.lock();
        PathBuilder::new(&state.segments, &state.config, self.ctx.clock.now()).preview()
    }

    /// `" / "` 区切りのプレビューパス
    pub fn build_path(&self) -> String {
        let state = self.state.lock();
        PathBuilder::new(&state.segments, &state.config, self.ctx.clock.now()).build_path()
    }

    /// 生成実行時のパスとファイル名。seed は実行中のプロンプトから取る。
    pub fn build_output(&self, prompt: &Value) -> BuiltOutput {
        let seed = detect_seed(&prompt_graph(prompt));
        let state = self.state.lock();
        let built = PathBuilder::new(&state.segments, &state.config, self.ctx.clock.now())
            .build_for_execution(seed.as_deref());
        log::debug!("実行パス: {} / {}", built.path, built.filename);
        built
    }

    /// コピー用パスを出力先へ渡す
    pub fn copy_path(&self) -> Result<String, AppError> {
        let path = self.preview().copyable_path;
        self.record(self.ctx.output.deliver(&path))?;
        Ok(path)
    }

    // ─── プリセット ───

    pub fn preset_listing(&self) -> PresetListing {
        let hide_defaults = self.ctx.settings.get().hide_default_presets;
        let state = self.state.lock();
        let (defaults, custom): (Vec<String>, Vec<String>) = state
            .presets
            .keys()
            .cloned()
            .partition(|name| is_default_preset(name));
        PresetListing {
            defaults: if hide_defaults { Vec::new() } else { defaults },
            custom,
            active: state.active_preset_name.clone(),
        }
    }

    /// 保存前の警告に使う、値が空の有効フィールド
    pub fn empty_required_fields(&self) -> Vec<&'static str> {
        self.state.lock().empty_required_fields()
    }

    /// 同名のカスタムプリセットがあるか（上書き確認用）
    pub fn has_preset(&self, name: &str) -> bool {
        self.state.lock().presets.contains_key(name.trim())
    }

    pub fn save_preset(&self, name: &str) -> Result<SaveOutcome, AppError> {
        let store = self.ctx.presets.clone();
        let (name, outcome) = self.record(self.edit(|s| {
            let WidgetState {
                segments,
                config,
                presets,
                active_preset_name,
            } = s;
            let (name, outcome) = store.save(presets, name, segments, config)?;
            *active_preset_name = Some(name.clone());
            Ok((name, outcome))
        }))?;

        self.ctx.metrics.inc_presets_saved();
        let preset = self.state.lock().presets.get(&name).cloned();
        if let Some(preset) = preset {
            self.broadcast(PresetChange::Upsert { name, preset });
        }
        Ok(outcome)
    }

    /// プリセットを読み込んで現在の segments/config を置き換える
    pub fn load_preset(&self, name: &str) -> Result<(), AppError> {
        let store = self.ctx.presets.clone();
        self.record(self.edit(|s| {
            let preset = store.load(&s.presets, name)?;
            s.apply_preset(name, preset);
            Ok(())
        }))?;
        self.ctx.metrics.inc_presets_loaded();
        log::info!("プリセット読み込み: \"{name}\"");
        Ok(())
    }

    pub fn delete_preset(&self, name: &str) -> Result<(), AppError> {
        let store = self.ctx.presets.clone();
        self.record(self.edit(|s| {
            store.delete(&mut s.presets, name)?;
            if s.active_preset_name.as_deref() == Some(name) {
                s.active_preset_name = None;
            }
            Ok(())
        }))?;
        self.ctx.metrics.inc_presets_deleted(1);
        self.broadcast(PresetChange::Delete {
            name: name.to_string(),
        });
        Ok(())
    }

    /// 選択したプリセットをまとめて削除する。組み込みは残し、`protected` に返す。
    pub fn delete_presets(&self, names: &[String]) -> Result<BatchDelete, AppError> {
        let store = self.ctx.presets.clone();
        let result = self.record(self.edit(|s| {
            let result = store.delete_many(&mut s.presets, names)?;
            if s
                .active_preset_name
                .as_ref()
                .is_some_and(|active| result.removed.contains(active))
            {
                s.active_preset_name = None;
            }
            Ok(result)
        }))?;
        self.ctx.metrics.inc_presets_deleted(result.removed.len() as u64);
        for name in &result.removed {
            self.broadcast(PresetChange::Delete { name: name.clone() });
        }
        Ok(result)
    }

    /// 上書きされた組み込みプリセットを元に戻す
    pub fn reset_default_preset(&self, name: &str) -> Result<(), AppError> {
        let store = self.ctx.presets.clone();
        let preset = self.record(self.edit(|s| store.reset_default(&mut s.presets, name)))?;
        self.broadcast(PresetChange::Upsert {
            name: name.to_string(),
            preset,
        });
        Ok(())
    }

    /// プリセット一覧を開いたときの再読込（追加のみ）。置き換えられた場合は None。
    pub async fn refresh_presets(&self) -> Result<Option<Vec<String>>, AppError> {
        let store = self.ctx.presets.clone();
        let started = Instant::now();
        let global = self
            .ctx
            .queue
            .run(&self.instance_id, RequestKind::RefreshPresets, async move {
                store.load_global()
            })
            .await;
        let Some(global) = self.record(global)? else {
            return Ok(None);
        };
        self.ctx
            .metrics
            .record_latency("refresh_presets", started.elapsed().as_millis() as u64);

        let added = self.edit(|s| Ok(absorb_new(&mut s.presets, global)))?;
        Ok(Some(added))
    }

    // ─── 検出 ───

    /// 読み込み時の自動検出。空欄だけを埋め、埋めたフィールドを返す。
    pub fn auto_detect(&self, graph: &Graph) -> Result<Vec<ConfigField>, AppError> {
        let settings = self.ctx.settings.get();
        let mut filled = Vec::new();

        let model = if settings.auto_detect_model == AutoDetectMode::Auto {
            detect_model(graph).map(|r| r.value)
        } else {
            None
        };
        let lora = if settings.auto_detect_lora {
            let names = detect_loras(graph);
            (!names.is_empty())
                .then(|| format_lora_path(&names, settings.lora_path_format).to_string())
        } else {
            None
        };

        if model.is_none() && lora.is_none() {
            return Ok(filled);
        }

        let mut state = self.state.lock();
        if let Some(model) = model {
            if state.config.model_name.is_empty() {
                state.config.model_name = model;
                filled.push(ConfigField::ModelName);
            }
        }
        if let Some(lora) = lora {
            if state.config.lora_name.is_empty() {
                state.config.lora_name = lora;
                filled.push(ConfigField::LoraName);
            }
        }
        if filled.is_empty() {
            return Ok(filled);
        }
        let snapshot = state.clone();
        drop(state);

        log::info!("自動検出: {filled:?}");
        self.commit(&snapshot)?;
        Ok(filled)
    }

    pub fn detect_model(&self, graph: &Graph) -> Result<DetectNotice, AppError> {
        let Some(result) = detect_model(graph) else {
            return Ok(DetectNotice::missing("No checkpoint node found in workflow"));
        };
        self.set_config_field(ConfigField::ModelName, &result.value)?;
        Ok(DetectNotice::found(if result.total > 1 {
            format!(
                "Model detected: {} ({} checkpoint nodes found, using first)",
                result.value, result.total
            )
        } else {
            format!("Model detected: {}", result.value)
        }))
    }

    pub fn detect_lora(&self, graph: &Graph) -> Result<DetectNotice, AppError> {
        let names = detect_loras(graph);
        if names.is_empty() {
            return Ok(DetectNotice::missing("No LoRA nodes found in workflow"));
        }
        let format = self.ctx.settings.get().lora_path_format;
        let value = format_lora_path(&names, format).to_string();
        self.set_config_field(ConfigField::LoraName, &value)?;
        Ok(DetectNotice::found(format!("Detected {} LoRA(s)", names.len())))
    }

    pub fn detect_resolution(&self, graph: &Graph) -> Result<DetectNotice, AppError> {
        let Some(result) = detect_resolution(graph) else {
            return Ok(DetectNotice::missing("No latent image node found in workflow"));
        };
        self.set_config_field(ConfigField::Resolution, &result.value)?;
        Ok(DetectNotice::found(if result.total > 1 {
            format!(
                "Resolution detected: {} ({} latent nodes found, using first)",
                result.value, result.total
            )
        } else {
            format!("Resolution detected: {}", result.value)
        }))
    }

    // ─── フォルダ ───

    fn current_folder_target(&self) -> Result<String, AppError> {
        let preview = self.preview();
        let mode = self.state.lock().config.output_mode;
        folder_target(&preview.copyable_path, mode)
    }

    /// 出力フォルダを開く。置き換えられた場合は None。
    pub async fn open_folder(&self) -> Result<Option<FolderOutcome>, AppError> {
        let target = self.record(self.current_folder_target())?;
        self.folder_request(RequestKind::OpenFolder, target).await
    }

    /// フォルダを作成してから開く
    pub async fn create_and_open_folder(&self) -> Result<Option<FolderOutcome>, AppError> {
        let target = self.record(self.current_folder_target())?;
        self.folder_request(RequestKind::CreateFolder, target).await
    }

    async fn folder_request(
        &self,
        kind: RequestKind,
        target: String,
    ) -> Result<Option<FolderOutcome>, AppError> {
        let client = self.ctx.folders.clone();
        let started = Instant::now();
        let result = self
            .ctx
            .queue
            .run(&self.instance_id, kind, async move {
                let outcome = match kind {
                    RequestKind::CreateFolder => client.create_and_open_folder(&target).await,
                    _ => client.open_folder(&target).await,
                };
                outcome.map_err(AppError::from)
            })
            .await;
        let outcome = self.record(result)?;
        if outcome.is_some() {
            self.ctx
                .metrics
                .record_latency("folder", started.elapsed().as_millis() as u64);
        }
        Ok(outcome)
    }

    // ─── テーマ ───

    pub fn theme(&self) -> Result<Theme, AppError> {
        let key = self.ctx.settings.get().theme;
        Ok(self.ctx.themes.resolve(&key)?)
    }

    /// テーマを選ぶ。未知のキーは既定テーマになる。設定以外は変更しない。
    pub fn select_theme(&self, key: &str) -> Result<Theme, AppError> {
        let custom = self.ctx.themes.load()?;
        let key = if crate::domain::theme::builtin_theme(key).is_some() || custom.contains_key(key)
        {
            key
        } else {
            log::warn!("不明なテーマ \"{key}\"、{FALLBACK_THEME} を使用");
            FALLBACK_THEME
        };
        self.ctx.settings.update(|s| s.theme = key.to_string())?;
        Ok(crate::domain::theme::resolve_theme(key, &custom))
    }
}

impl PresetSyncTarget for FlowPathWidget {
    fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn apply_preset_change(&self, change: &PresetChange) -> Result<(), AppError> {
        self.edit(|s| {
            match change {
                PresetChange::Upsert { name, preset } => {
                    s.presets.insert(name.clone(), preset.clone());
                }
                PresetChange::Delete { name } => {
                    s.presets.remove(name);
                    if s.active_preset_name.as_ref() == Some(name) {
                        s.active_preset_name = None;
                    }
                }
            }
            Ok(())
        })
    }
}
