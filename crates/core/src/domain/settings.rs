use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::theme::FALLBACK_THEME;
use super::types::LoraPathFormat;

/// ユーザー設定（ホストの設定ストアにユーザー単位で保存）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowPathSettings {
    /// テーマキー
    pub theme: String,
    /// 読み込み時にモデル名を自動検出するか
    pub auto_detect_model: AutoDetectMode,
    /// 読み込み時に LoRA 名を自動検出するか
    pub auto_detect_lora: bool,
    /// 複数 LoRA のパス表現
    pub lora_path_format: LoraPathFormat,
    /// プレビューを常に表示
    pub sticky_preview: bool,
    pub show_emojis: bool,
    /// プリセット一覧から組み込みプリセットを隠す
    pub hide_default_presets: bool,
    pub show_loading_animation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoDetectMode {
    #[default]
    Manual,
    Auto,
}

impl Default for FlowPathSettings {
    fn default() -> Self {
        Self {
            theme: FALLBACK_THEME.to_string(),
            auto_detect_model: AutoDetectMode::Manual,
            auto_detect_lora: true,
            lora_path_format: LoraPathFormat::Primary,
            sticky_preview: true,
            show_emojis: true,
            hide_default_presets: false,
            show_loading_animation: false,
        }
    }
}

impl FlowPathSettings {
    /// フィールド単位で読み込む。型の合わない値は既定値のまま。
    pub fn from_value(value: &Value) -> Self {
        let mut settings = Self::default();
        let Some(map) = value.as_object() else {
            return settings;
        };

        macro_rules! field {
            ($key:literal, $slot:expr) => {
                if let Some(raw) = map.get($key) {
                    match serde_json::from_value(raw.clone()) {
                        Ok(v) => $slot = v,
                        Err(e) => log::warn!("設定 {} の値を無視: {e}", $key),
                    }
                }
            };
        }

        field!("theme", settings.theme);
        field!("auto_detect_model", settings.auto_detect_model);
        field!("auto_detect_lora", settings.auto_detect_lora);
        field!("lora_path_format", settings.lora_path_format);
        field!("sticky_preview", settings.sticky_preview);
        field!("show_emojis", settings.show_emojis);
        field!("hide_default_presets", settings.hide_default_presets);
        field!("show_loading_animation", settings.show_loading_animation);

        settings
    }
}
