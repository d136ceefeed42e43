use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::{ConfigPatch, PathConfig};
use super::error::AppError;
use super::types::{Segment, SegmentType};

/// プリセット名の最大長（文字数）
pub const PRESET_NAME_MAX_LEN: usize = 32;

/// 名前付きの (segments, config) スナップショット
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub config: ConfigPatch,
}

impl Preset {
    /// 現在の状態を写し取る（構造的なディープコピー）
    pub fn snapshot(segments: &[Segment], config: &PathConfig) -> Self {
        Self {
            segments: segments.to_vec(),
            config: ConfigPatch::snapshot(config),
        }
    }
}

/// 名前 → プリセット
pub type PresetMap = BTreeMap<String, Preset>;

/// 組み込みプリセット
#[derive(Debug, Clone)]
pub struct DefaultPreset {
    pub name: &'static str,
    pub preset: Preset,
    /// 同名の上書きを「リセット」で元に戻せるか
    pub resettable: bool,
}

fn segments_of(kinds: &[SegmentType]) -> Vec<Segment> {
    kinds.iter().copied().map(Segment::new).collect()
}

fn text(s: &str) -> Option<String> {
    Some(s.to_string())
}

/// 組み込みプリセット一覧（表示順）
pub fn builtin_presets() -> Vec<DefaultPreset> {
    use SegmentType::*;

    vec![
        DefaultPreset {
            name: "Blank",
            // output_mode は指定しない（読み込み時に現在のモードを保持する）
            preset: Preset {
                segments: Vec::new(),
                config: ConfigPatch {
                    file_type: text("Image"),
                    category: text("Characters"),
                    name: text(""),
                    content_rating: text("SFW"),
                    date_format: text("%Y-%m-%d"),
                    project_name: text(""),
                    series_name: text(""),
                    resolution: text(""),
                    model_name: text(""),
                    lora_name: text(""),
                    filename_template: text(""),
                    ..Default::default()
                },
            },
            resettable: false,
        },
        DefaultPreset {
            name: "Simple Daily",
            preset: Preset {
                segments: segments_of(&[FileType, Category, Name, Date]),
                config: ConfigPatch {
                    file_type: text("Image"),
                    category: text("Characters"),
                    content_rating: text("SFW"),
                    date_format: text("%Y-%m-%d"),
                    ..Default::default()
                },
            },
            resettable: true,
        },
        DefaultPreset {
            name: "Character Work",
            preset: Preset {
                segments: segments_of(&[FileType, Category, Name, ContentRating, Date]),
                config: ConfigPatch {
                    file_type: text("Image"),
                    category: text("Characters"),
                    name: text(""),
                    content_rating: text("SFW"),
                    date_format: text("%Y-%m-%d"),
                    ..Default::default()
                },
            },
            resettable: true,
        },
        DefaultPreset {
            name: "Project Organized",
            preset: Preset {
                segments: segments_of(&[FileType, Project, Category, Name, Date]),
                config: ConfigPatch {
                    file_type: text("Image"),
                    project_name: text(""),
                    category: text("Characters"),
                    name: text(""),
                    date_format: text("%Y-%m-%d"),
                    ..Default::default()
                },
            },
            resettable: true,
        },
        DefaultPreset {
            name: "Complete Metadata",
            preset: Preset {
                segments: segments_of(&[
                    FileType,
                    Category,
                    Name,
                    Date,
                    ContentRating,
                    Model,
                    Lora,
                    Seed,
                ]),
                config: ConfigPatch {
                    file_type: text("Image"),
                    category: text("Characters"),
                    name: text(""),
                    content_rating: text("SFW"),
                    date_format: text("%Y-%m-%d"),
                    model_name: text(""),
                    lora_name: text(""),
                    ..Default::default()
                },
            },
            resettable: true,
        },
    ]
}

/// 組み込みプリセットをマップとして返す
pub fn default_presets() -> PresetMap {
    builtin_presets()
        .into_iter()
        .map(|d| (d.name.to_string(), d.preset))
        .collect()
}

pub fn is_default_preset(name: &str) -> bool {
    builtin_presets().iter().any(|d| d.name == name)
}

/// 保存用のプリセット名を検証し、trim 済みの名前を返す
pub fn validate_preset_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_name("プリセット名が空です"));
    }
    if trimmed.chars().count() > PRESET_NAME_MAX_LEN {
        return Err(AppError::invalid_name(format!(
            "プリセット名は {PRESET_NAME_MAX_LEN} 文字以内にしてください"
        )));
    }
    if is_default_preset(trimmed) {
        return Err(AppError::protected_preset(trimmed));
    }
    Ok(trimmed.to_string())
}

/// 構造チェック: segments があれば配列、config があれば object
pub fn is_valid_preset_value(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    if obj.get("segments").is_some_and(|s| !s.is_array()) {
        return false;
    }
    if obj.get("config").is_some_and(|c| !c.is_object()) {
        return false;
    }
    true
}

/// 外部ストアのプリセット群を読み込む。不正なエントリだけを警告付きで捨てる。
pub fn parse_preset_map(value: &Value, source: &str) -> PresetMap {
    let mut presets = PresetMap::new();
    let Some(obj) = value.as_object() else {
        if !value.is_null() {
            log::warn!("{source}: プリセット一覧が object ではありません");
        }
        return presets;
    };

    for (name, raw) in obj {
        if !is_valid_preset_value(raw) {
            log::warn!("{source}: 不正なプリセット \"{name}\" をスキップ");
            continue;
        }
        match serde_json::from_value::<Preset>(raw.clone()) {
            Ok(preset) => {
                presets.insert(name.clone(), preset);
            }
            Err(e) => {
                log::warn!("{source}: プリセット \"{name}\" の読み込み失敗: {e}");
            }
        }
    }

    presets
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_names() {
        let names: Vec<String> = default_presets().into_keys().collect();
        assert_eq!(names.len(), 5);
        assert!(is_default_preset("Simple Daily"));
        assert!(is_default_preset("Blank"));
        assert!(!is_default_preset("simple daily"));
    }

    #[test]
    fn test_blank_preset_has_no_output_mode() {
        let presets = default_presets();
        assert!(presets["Blank"].config.output_mode.is_none());
        assert!(presets["Blank"].segments.is_empty());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_preset_name("  Portraits ").unwrap(), "Portraits");
        assert!(validate_preset_name("   ").is_err());
        assert!(validate_preset_name(&"x".repeat(33)).is_err());
        assert!(validate_preset_name(&"x".repeat(32)).is_ok());

        let err = validate_preset_name("Simple Daily").unwrap_err();
        assert_eq!(err.code, crate::domain::error::ErrorCode::ProtectedPreset);
    }

    #[test]
    fn test_parse_drops_only_invalid_entries() {
        let value = json!({
            "Good": { "segments": [{ "type": "name", "enabled": true }], "config": { "name": "A" } },
            "BadSegments": { "segments": "nope" },
            "BadConfig": { "config": [1, 2] },
            "UnknownType": { "segments": [{ "type": "wat" }] },
            "Empty": {}
        });
        let presets = parse_preset_map(&value, "test");
        assert_eq!(presets.len(), 2);
        assert!(presets.contains_key("Good"));
        assert!(presets.contains_key("Empty"));
        assert_eq!(presets["Good"].config.name.as_deref(), Some("A"));
    }

    #[test]
    fn test_parse_non_object() {
        assert!(parse_preset_map(&json!([1, 2]), "test").is_empty());
        assert!(parse_preset_map(&Value::Null, "test").is_empty());
    }
}
