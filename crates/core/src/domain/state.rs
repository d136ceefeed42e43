use serde::Serialize;
use serde_json::Value;

use super::config::{ConfigField, PathConfig};
use super::error::AppError;
use super::preset::{parse_preset_map, Preset, PresetMap};
use super::types::{Segment, SegmentType};

/// ウィジェットの永続化単位
///
/// ホストの隠しフィールドに JSON 文字列として保存される。
/// `active_preset_name` は手動編集のたびにクリアされる。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WidgetState {
    pub segments: Vec<Segment>,
    pub config: PathConfig,
    pub presets: PresetMap,
    #[serde(rename = "activePresetName")]
    pub active_preset_name: Option<String>,
}

impl WidgetState {
    /// 永続化文字列を読み込む。壊れた JSON は `{}` として扱い、失敗しない。
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::from_value(&Value::Object(Default::default()));
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                log::warn!("widget_data の解析に失敗、既定値を使用: {e}");
                Self::from_value(&Value::Object(Default::default()))
            }
        }
    }

    /// フィールド単位で既定値に置き換えながら読み込む
    pub fn from_value(value: &Value) -> Self {
        let segments = match value.get("segments") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match serde_json::from_value::<Segment>(item.clone()) {
                    Ok(seg) => Some(seg),
                    Err(e) => {
                        log::warn!("不正なセグメントをスキップ: {item} ({e})");
                        None
                    }
                })
                .collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                log::warn!("segments が配列ではありません: {other}");
                Vec::new()
            }
        };

        let config = PathConfig::from_value(value.get("config"));

        let presets = value
            .get("presets")
            .map(|p| parse_preset_map(p, "widget_data"))
            .unwrap_or_default();

        let active_preset_name = value
            .get("activePresetName")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            segments,
            config,
            presets,
            active_preset_name,
        }
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        serde_json::to_string(self)
            .map_err(|e| AppError::internal(format!("widget_data serialize: {e}")))
    }

    // --- Segments ---

    fn check_index(&self, index: usize) -> Result<(), AppError> {
        if index >= self.segments.len() {
            return Err(AppError::invalid_state(format!(
                "セグメント index {index} は範囲外です（{} 件）",
                self.segments.len()
            )));
        }
        Ok(())
    }

    pub fn set_segment_enabled(&mut self, index: usize, enabled: bool) -> Result<(), AppError> {
        self.check_index(index)?;
        self.segments[index].enabled = enabled;
        self.active_preset_name = None;
        Ok(())
    }

    /// `from` の要素をドロップ位置 `drop_index`（0..=len）へ移動する。
    ///
    /// 取り除いた後に挿入するため、`from < drop_index` なら挿入位置は1つ前になる。
    /// 位置が変わらない場合は何もせず `false` を返す。
    pub fn move_segment(&mut self, from: usize, drop_index: usize) -> Result<bool, AppError> {
        self.check_index(from)?;
        if drop_index > self.segments.len() {
            return Err(AppError::invalid_state(format!(
                "ドロップ位置 {drop_index} は範囲外です"
            )));
        }

        let target = if drop_index > from {
            drop_index - 1
        } else {
            drop_index
        };
        if target == from {
            return Ok(false);
        }

        let moved = self.segments.remove(from);
        self.segments.insert(target, moved);
        self.active_preset_name = None;
        Ok(true)
    }

    /// 末尾に追加し、追加位置を返す
    pub fn insert_segment(&mut self, kind: SegmentType, value: Option<String>) -> usize {
        let segment = match kind {
            SegmentType::Custom => Segment::custom(value.unwrap_or_default()),
            _ => Segment::new(kind),
        };
        self.segments.push(segment);
        self.active_preset_name = None;
        self.segments.len() - 1
    }

    pub fn remove_segment(&mut self, index: usize) -> Result<Segment, AppError> {
        self.check_index(index)?;
        let removed = self.segments.remove(index);
        self.active_preset_name = None;
        Ok(removed)
    }

    /// custom セグメントのテンプレートを更新する
    pub fn set_custom_value(&mut self, index: usize, value: &str) -> Result<(), AppError> {
        self.check_index(index)?;
        let segment = &mut self.segments[index];
        if segment.kind != SegmentType::Custom {
            return Err(AppError::invalid_state(format!(
                "{} セグメントは値を持ちません",
                segment.kind.as_str()
            )));
        }
        segment.value = Some(value.to_string());
        self.active_preset_name = None;
        Ok(())
    }

    pub fn is_segment_enabled(&self, kind: SegmentType) -> bool {
        self.segments.iter().any(|s| s.kind == kind && s.enabled)
    }

    /// まだ存在しないセグメント種別（custom は常に追加可能）
    pub fn available_segment_types(&self) -> Vec<SegmentType> {
        SegmentType::ALL
            .into_iter()
            .filter(|kind| {
                *kind == SegmentType::Custom || !self.segments.iter().any(|s| s.kind == *kind)
            })
            .collect()
    }

    // --- Config ---

    pub fn set_config_field(&mut self, field: ConfigField, value: &str) -> Result<(), AppError> {
        self.config.set(field, value)?;
        self.active_preset_name = None;
        Ok(())
    }

    // --- Presets ---

    /// プリセットを適用する。node_label は常に保持し、
    /// プリセットが output_mode を持たない場合は現在のモードを保持する。
    pub fn apply_preset(&mut self, name: &str, preset: Preset) {
        let node_label = std::mem::take(&mut self.config.node_label);
        let output_mode = self.config.output_mode;

        let mut config = preset.config.to_config();
        config.node_label = node_label;
        if preset.config.output_mode.is_none() {
            config.output_mode = output_mode;
        }

        self.segments = preset.segments;
        self.config = config;
        self.active_preset_name = Some(name.to_string());
    }

    /// 保存前の警告用: 有効なのに値が空のフィールド名
    pub fn empty_required_fields(&self) -> Vec<&'static str> {
        let mut empty = Vec::new();
        for seg in self.segments.iter().filter(|s| s.enabled) {
            let label = match seg.kind {
                SegmentType::Name => Some(("Name", ConfigField::Name)),
                SegmentType::Project => Some(("Project Name", ConfigField::ProjectName)),
                SegmentType::Series => Some(("Series Name", ConfigField::SeriesName)),
                SegmentType::Resolution => Some(("Resolution", ConfigField::Resolution)),
                SegmentType::Model => Some(("Model Name", ConfigField::ModelName)),
                SegmentType::Lora => Some(("LoRA Name", ConfigField::LoraName)),
                SegmentType::Custom => {
                    if seg.value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                        empty.push("Custom Template");
                    }
                    None
                }
                _ => None,
            };
            if let Some((label, field)) = label {
                if self.config.non_empty(field).is_none() {
                    empty.push(label);
                }
            }
        }
        empty
    }
}
