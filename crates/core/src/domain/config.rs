use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::AppError;
use super::types::OutputMode;

pub const DEFAULT_FILE_TYPE: &str = "Image";
pub const DEFAULT_CATEGORY: &str = "Characters";
pub const DEFAULT_CONTENT_RATING: &str = "SFW";
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// 設定フィールド（固定キー集合。seed は含まない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    NodeLabel,
    FileType,
    Category,
    Name,
    ContentRating,
    DateFormat,
    ProjectName,
    SeriesName,
    Resolution,
    ModelName,
    LoraName,
    FilenameTemplate,
    OutputMode,
}

impl ConfigField {
    pub const ALL: [ConfigField; 13] = [
        ConfigField::NodeLabel,
        ConfigField::FileType,
        ConfigField::Category,
        ConfigField::Name,
        ConfigField::ContentRating,
        ConfigField::DateFormat,
        ConfigField::ProjectName,
        ConfigField::SeriesName,
        ConfigField::Resolution,
        ConfigField::ModelName,
        ConfigField::LoraName,
        ConfigField::FilenameTemplate,
        ConfigField::OutputMode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NodeLabel => "node_label",
            Self::FileType => "file_type",
            Self::Category => "category",
            Self::Name => "name",
            Self::ContentRating => "content_rating",
            Self::DateFormat => "date_format",
            Self::ProjectName => "project_name",
            Self::SeriesName => "series_name",
            Self::Resolution => "resolution",
            Self::ModelName => "model_name",
            Self::LoraName => "lora_name",
            Self::FilenameTemplate => "filename_template",
            Self::OutputMode => "output_mode",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }
}

/// パス生成設定（フラットな文字列マップ）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathConfig {
    pub node_label: String,
    pub file_type: String,
    pub category: String,
    pub name: String,
    pub content_rating: String,
    pub date_format: String,
    pub project_name: String,
    pub series_name: String,
    pub resolution: String,
    pub model_name: String,
    pub lora_name: String,
    pub filename_template: String,
    pub output_mode: OutputMode,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            node_label: String::new(),
            file_type: DEFAULT_FILE_TYPE.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            name: String::new(),
            content_rating: DEFAULT_CONTENT_RATING.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            project_name: String::new(),
            series_name: String::new(),
            resolution: String::new(),
            model_name: String::new(),
            lora_name: String::new(),
            filename_template: String::new(),
            output_mode: OutputMode::SaveImage,
        }
    }
}

impl PathConfig {
    /// 保存済みの部分マップをデフォルトに浅くマージする。
    /// 型の合わない値は警告して無視し、is_nsfw は content_rating へ移行する。
    pub fn from_value(value: Option<&Value>) -> Self {
        let mut config = Self::default();

        let map = match value {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => return config,
            Some(other) => {
                log::warn!("config が object ではありません: {other}");
                return config;
            }
        };

        for field in ConfigField::ALL {
            let Some(raw) = map.get(field.as_str()) else {
                continue;
            };
            let Some(text) = coerce_to_string(raw) else {
                if !raw.is_null() {
                    log::warn!("config.{} の値を無視: {raw}", field.as_str());
                }
                continue;
            };
            if let Err(e) = config.set(field, &text) {
                log::warn!("config.{} の値を無視: {e}", field.as_str());
            }
        }

        // 旧形式 is_nsfw: bool の移行
        match map.get("is_nsfw").and_then(Value::as_bool) {
            Some(true) => config.content_rating = "NSFW".to_string(),
            Some(false) => config.content_rating = "SFW".to_string(),
            None => {}
        }

        config.normalize();
        config
    }

    /// file_type / content_rating を空や "None" にしない
    pub fn normalize(&mut self) {
        if self.file_type.is_empty() || self.file_type == "None" {
            self.file_type = DEFAULT_FILE_TYPE.to_string();
        }
        if self.content_rating.is_empty() || self.content_rating == "None" {
            self.content_rating = DEFAULT_CONTENT_RATING.to_string();
        }
    }

    pub fn get(&self, field: ConfigField) -> &str {
        match field {
            ConfigField::NodeLabel => &self.node_label,
            ConfigField::FileType => &self.file_type,
            ConfigField::Category => &self.category,
            ConfigField::Name => &self.name,
            ConfigField::ContentRating => &self.content_rating,
            ConfigField::DateFormat => &self.date_format,
            ConfigField::ProjectName => &self.project_name,
            ConfigField::SeriesName => &self.series_name,
            ConfigField::Resolution => &self.resolution,
            ConfigField::ModelName => &self.model_name,
            ConfigField::LoraName => &self.lora_name,
            ConfigField::FilenameTemplate => &self.filename_template,
            ConfigField::OutputMode => self.output_mode.as_str(),
        }
    }

    pub fn set(&mut self, field: ConfigField, value: &str) -> Result<(), AppError> {
        let slot = match field {
            ConfigField::OutputMode => {
                self.output_mode = OutputMode::parse(value).ok_or_else(|| {
                    AppError::invalid_state(format!("不明な output_mode: {value}"))
                })?;
                return Ok(());
            }
            ConfigField::NodeLabel => &mut self.node_label,
            ConfigField::FileType => &mut self.file_type,
            ConfigField::Category => &mut self.category,
            ConfigField::Name => &mut self.name,
            ConfigField::ContentRating => &mut self.content_rating,
            ConfigField::DateFormat => &mut self.date_format,
            ConfigField::ProjectName => &mut self.project_name,
            ConfigField::SeriesName => &mut self.series_name,
            ConfigField::Resolution => &mut self.resolution,
            ConfigField::ModelName => &mut self.model_name,
            ConfigField::LoraName => &mut self.lora_name,
            ConfigField::FilenameTemplate => &mut self.filename_template,
        };
        *slot = value.to_string();
        Ok(())
    }

    /// trim 後に空でなければ値を返す
    pub fn non_empty(&self, field: ConfigField) -> Option<&str> {
        let value = self.get(field);
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// 文字列化できる JSON 値を文字列にする。
/// 文字列配列は旧形式の LoRA 一覧として " | " 区切りに畳む。
fn coerce_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
            parts.map(|p| p.join(" | "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

/// プリセットが保持する部分設定
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lora_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_mode: Option<OutputMode>,
}

impl ConfigPatch {
    /// 現在の設定を全フィールド指定のパッチとして写し取る
    pub fn snapshot(config: &PathConfig) -> Self {
        Self {
            node_label: Some(config.node_label.clone()),
            file_type: Some(config.file_type.clone()),
            category: Some(config.category.clone()),
            name: Some(config.name.clone()),
            content_rating: Some(config.content_rating.clone()),
            date_format: Some(config.date_format.clone()),
            project_name: Some(config.project_name.clone()),
            series_name: Some(config.series_name.clone()),
            resolution: Some(config.resolution.clone()),
            model_name: Some(config.model_name.clone()),
            lora_name: Some(config.lora_name.clone()),
            filename_template: Some(config.filename_template.clone()),
            output_mode: Some(config.output_mode),
        }
    }

    /// デフォルト設定にパッチを当てた完全な設定を返す
    pub fn to_config(&self) -> PathConfig {
        let mut config = PathConfig::default();
        let pairs: [(&Option<String>, &mut String); 12] = [
            (&self.node_label, &mut config.node_label),
            (&self.file_type, &mut config.file_type),
            (&self.category, &mut config.category),
            (&self.name, &mut config.name),
            (&self.content_rating, &mut config.content_rating),
            (&self.date_format, &mut config.date_format),
            (&self.project_name, &mut config.project_name),
            (&self.series_name, &mut config.series_name),
            (&self.resolution, &mut config.resolution),
            (&self.model_name, &mut config.model_name),
            (&self.lora_name, &mut config.lora_name),
            (&self.filename_template, &mut config.filename_template),
        ];
        for (patch, slot) in pairs {
            if let Some(value) = patch {
                *slot = value.clone();
            }
        }
        if let Some(mode) = self.output_mode {
            config.output_mode = mode;
        }
        config.normalize();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = PathConfig::from_value(Some(&json!({ "name": "Umbrael" })));
        assert_eq!(config.name, "Umbrael");
        assert_eq!(config.file_type, "Image");
        assert_eq!(config.category, "Characters");
        assert_eq!(config.date_format, "%Y-%m-%d");
        assert_eq!(config.output_mode, OutputMode::SaveImage);
    }

    #[test]
    fn test_is_nsfw_migration() {
        let config = PathConfig::from_value(Some(&json!({ "is_nsfw": true })));
        assert_eq!(config.content_rating, "NSFW");

        let config = PathConfig::from_value(Some(&json!({
            "is_nsfw": false,
            "content_rating": "NSFW"
        })));
        assert_eq!(config.content_rating, "SFW");
    }

    #[test]
    fn test_empty_and_none_are_normalized() {
        let config = PathConfig::from_value(Some(&json!({
            "file_type": "",
            "content_rating": "None"
        })));
        assert_eq!(config.file_type, "Image");
        assert_eq!(config.content_rating, "SFW");

        let config = PathConfig::from_value(Some(&json!({
            "file_type": "None",
            "content_rating": ""
        })));
        assert_eq!(config.file_type, "Image");
        assert_eq!(config.content_rating, "SFW");
    }

    #[test]
    fn test_bad_values_are_ignored() {
        let config = PathConfig::from_value(Some(&json!({
            "name": { "nested": true },
            "output_mode": "somethingElse",
            "resolution": 512
        })));
        assert_eq!(config.name, "");
        assert_eq!(config.output_mode, OutputMode::SaveImage);
        assert_eq!(config.resolution, "512");
    }

    #[test]
    fn test_legacy_lora_list() {
        let config = PathConfig::from_value(Some(&json!({ "lora_name": ["a", "b"] })));
        assert_eq!(config.lora_name, "a | b");
    }

    #[test]
    fn test_non_object_falls_back_to_defaults() {
        assert_eq!(PathConfig::from_value(Some(&json!("oops"))), PathConfig::default());
        assert_eq!(PathConfig::from_value(None), PathConfig::default());
    }

    #[test]
    fn test_set_output_mode() {
        let mut config = PathConfig::default();
        config.set(ConfigField::OutputMode, "imageSaver").unwrap();
        assert_eq!(config.output_mode, OutputMode::ImageSaver);
        assert!(config.set(ConfigField::OutputMode, "bogus").is_err());
        assert_eq!(config.output_mode, OutputMode::ImageSaver);
    }

    #[test]
    fn test_patch_snapshot_restores_config() {
        let mut config = PathConfig::default();
        config.name = "Umbrael".into();
        config.output_mode = OutputMode::ImageSaver;
        let patch = ConfigPatch::snapshot(&config);
        assert_eq!(patch.to_config(), config);
    }

    #[test]
    fn test_partial_patch_uses_defaults() {
        let patch = ConfigPatch {
            category: Some("Locations".into()),
            ..Default::default()
        };
        let config = patch.to_config();
        assert_eq!(config.category, "Locations");
        assert_eq!(config.file_type, "Image");
        assert_eq!(config.name, "");
    }
}
