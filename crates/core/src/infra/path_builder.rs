use std::path::MAIN_SEPARATOR_STR;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::config::{PathConfig, DEFAULT_CATEGORY, DEFAULT_CONTENT_RATING, DEFAULT_FILE_TYPE};
use crate::domain::types::{OutputMode, Segment, SegmentType};

use super::sanitize::{sanitize_component, sanitize_filename};
use super::template::{has_counter, Placeholders, TemplateResolver, SEED_SENTINEL};

/// プレビューでの区切り
pub const PATH_JOINER: &str = " / ";
/// lora_name に複数 LoRA を保存するときの区切り
pub const LORA_DELIMITER: &str = " | ";
/// ホストの出力ルート
pub const OUTPUT_ROOT: &str = "output";
/// saveImage モードで何も無いときのファイル名プレフィックス
pub const DEFAULT_PREFIX: &str = "ComfyUI";

const SAVE_IMAGE_SUFFIX: &str = "_#####.[ext]";
const IMAGE_SAVER_SUFFIX: &str = "_##.[ext]";
const EXT_SUFFIX: &str = ".[ext]";
const FILENAME_MARK: &str = "<filename>";

fn or_default<'s>(value: &'s str, default: &'s str) -> &'s str {
    if value.is_empty() {
        default
    } else {
        value
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// 出力プレビュー
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputPreview {
    pub mode: OutputMode,
    /// `" / "` 区切りのパス（空なら空文字列）
    pub path: String,
    /// `output` から始まるパンくず
    pub breadcrumb: Vec<String>,
    /// コピー用パス（`/` 区切り）
    pub copyable_path: String,
    /// ファイル名部分（saveImage ではプレフィックス末尾の連番表記）
    pub file: String,
}

impl OutputPreview {
    /// パンくずとファイル名をつないだ1行表示
    pub fn full(&self) -> String {
        match self.mode {
            OutputMode::SaveImage => format!("{}{}", self.breadcrumb.join("/"), self.file),
            OutputMode::ImageSaver => format!("{}/{}", self.breadcrumb.join("/"), self.file),
        }
    }
}

/// 実行時に使われる実パスとファイル名
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltOutput {
    pub path: String,
    pub filename: String,
}

/// セグメント列 + 設定からパスを組み立てる
pub struct PathBuilder<'a> {
    segments: &'a [Segment],
    config: &'a PathConfig,
    now: NaiveDateTime,
}

impl<'a> PathBuilder<'a> {
    pub fn new(segments: &'a [Segment], config: &'a PathConfig, now: NaiveDateTime) -> Self {
        Self {
            segments,
            config,
            now,
        }
    }

    fn resolver(&self) -> TemplateResolver<'a> {
        TemplateResolver::preview(self.segments, self.config, self.now)
    }

    /// プレビュー用のパス要素
    pub fn components(&self) -> Vec<String> {
        let c = self.config;
        let resolver = self.resolver();
        let mut parts = Vec::new();

        for seg in self.segments.iter().filter(|s| s.enabled) {
            match seg.kind {
                SegmentType::Label => parts.extend(non_empty(&c.node_label).map(str::to_string)),
                SegmentType::FileType => {
                    parts.push(or_default(&c.file_type, DEFAULT_FILE_TYPE).to_string())
                }
                SegmentType::Category => {
                    parts.push(or_default(&c.category, DEFAULT_CATEGORY).to_string())
                }
                SegmentType::Name => parts.extend(non_empty(&c.name).map(str::to_string)),
                SegmentType::ContentRating => {
                    parts.push(or_default(&c.content_rating, DEFAULT_CONTENT_RATING).to_string())
                }
                SegmentType::Date => parts.push(resolver.formatted_date()),
                SegmentType::Project => parts.extend(non_empty(&c.project_name).map(str::to_string)),
                SegmentType::Series => parts.extend(non_empty(&c.series_name).map(str::to_string)),
                SegmentType::Resolution => {
                    parts.extend(non_empty(&c.resolution).map(str::to_string))
                }
                SegmentType::Model => parts.extend(non_empty(&c.model_name).map(str::to_string)),
                SegmentType::Seed => parts.push(SEED_SENTINEL.to_string()),
                SegmentType::Lora => parts.extend(split_loras(&c.lora_name)),
                SegmentType::Custom => {
                    let template = seg
                        .value
                        .as_deref()
                        .filter(|v| !v.is_empty())
                        .unwrap_or("Custom");
                    let resolved = resolver.resolve(template, Placeholders::Bracket);
                    parts.extend(non_empty(&resolved).map(str::to_string));
                }
            }
        }

        parts
    }

    /// `" / "` 区切りのプレビューパス
    pub fn build_path(&self) -> String {
        self.components().join(PATH_JOINER)
    }

    pub fn preview(&self) -> OutputPreview {
        let parts = self.components();
        let mode = self.config.output_mode;

        let mut breadcrumb = vec![OUTPUT_ROOT.to_string()];
        if parts.is_empty() {
            if mode == OutputMode::SaveImage {
                breadcrumb.push(DEFAULT_PREFIX.to_string());
            }
        } else {
            breadcrumb.extend(parts.iter().cloned());
        }
        let copyable_path = breadcrumb.join("/");

        let file = match mode {
            OutputMode::SaveImage => SAVE_IMAGE_SUFFIX.to_string(),
            OutputMode::ImageSaver => self.preview_filename(),
        };

        OutputPreview {
            mode,
            path: parts.join(PATH_JOINER),
            breadcrumb,
            copyable_path,
            file,
        }
    }

    fn preview_filename(&self) -> String {
        let template = &self.config.filename_template;
        if template.trim().is_empty() {
            return format!("{FILENAME_MARK}{IMAGE_SAVER_SUFFIX}");
        }
        let resolved = self.resolver().resolve(template, Placeholders::Highlight);
        let shown = if resolved.is_empty() { template.as_str() } else { resolved.as_str() };
        let suffix = if has_counter(template) {
            EXT_SUFFIX
        } else {
            IMAGE_SAVER_SUFFIX
        };
        format!("{shown}{suffix}")
    }

    /// 生成実行時のパスとファイル名。
    ///
    /// ユーザー入力由来の要素は正規化し、OS のパス区切りで連結する。
    /// seed は実行中のグラフから得た値を使う。
    pub fn build_for_execution(&self, seed: Option<&str>) -> BuiltOutput {
        let c = self.config;
        let resolver = TemplateResolver::execution(c, self.now, seed);
        let mut parts: Vec<String> = Vec::new();

        for seg in self.segments.iter().filter(|s| s.enabled) {
            match seg.kind {
                SegmentType::Label => push_sanitized(&c.node_label, &mut parts),
                SegmentType::FileType => {
                    parts.push(or_default(&c.file_type, DEFAULT_FILE_TYPE).to_string())
                }
                SegmentType::Category => {
                    parts.push(or_default(&c.category, DEFAULT_CATEGORY).to_string())
                }
                SegmentType::Name => push_sanitized(&c.name, &mut parts),
                SegmentType::ContentRating => {
                    parts.push(or_default(&c.content_rating, DEFAULT_CONTENT_RATING).to_string())
                }
                SegmentType::Date => parts.push(resolver.formatted_date()),
                SegmentType::Project => push_sanitized(&c.project_name, &mut parts),
                SegmentType::Series => push_sanitized(&c.series_name, &mut parts),
                SegmentType::Resolution => push_sanitized(&c.resolution, &mut parts),
                SegmentType::Model => push_sanitized(&c.model_name, &mut parts),
                SegmentType::Seed => push_sanitized(seed.unwrap_or_default(), &mut parts),
                SegmentType::Lora => {
                    for lora in split_loras(&c.lora_name) {
                        push_sanitized(&lora, &mut parts);
                    }
                }
                SegmentType::Custom => {
                    let template = seg.value.as_deref().unwrap_or_default().trim();
                    if !template.is_empty() {
                        let resolved = resolver.resolve(template, Placeholders::Hide);
                        push_sanitized(&resolved, &mut parts);
                    }
                }
            }
        }

        let path = if parts.is_empty() {
            match c.output_mode {
                OutputMode::SaveImage => DEFAULT_PREFIX.to_string(),
                OutputMode::ImageSaver => String::new(),
            }
        } else {
            parts.join(MAIN_SEPARATOR_STR)
        };

        let filename = if c.filename_template.is_empty() {
            String::new()
        } else {
            sanitize_filename(&resolver.resolve(&c.filename_template, Placeholders::Hide))
        };

        log::debug!("実行時パス: {path:?} / ファイル名: {filename:?}");
        BuiltOutput { path, filename }
    }
}

fn push_sanitized(value: &str, parts: &mut Vec<String>) {
    let trimmed = value.trim();
    if !trimmed.is_empty() {
        parts.push(sanitize_component(trimmed));
    }
}

/// `" | "` 区切りの LoRA 名を個別の要素に分ける
pub fn split_loras(value: &str) -> Vec<String> {
    value
        .split(LORA_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
