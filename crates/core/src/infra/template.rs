use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::domain::config::{PathConfig, DEFAULT_DATE_FORMAT, DEFAULT_FILE_TYPE};
use crate::domain::types::{Segment, SegmentType};

use super::strftime::format_date;

/// プレビュー用のシード表示
pub const SEED_SENTINEL: &str = "[seed-auto]";
/// カウンタ表示（実際の連番は保存時にホスト側が決める）
pub const COUNTER_MARK: &str = "####";
/// 強調表示モードの未解決変数マーカー
pub const EMPTY_MARK_OPEN: &str = "\u{ab}";
pub const EMPTY_MARK_CLOSE: &str = "\u{bb}";

static VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_]+)\}").expect("template variable regex"));

/// 未解決変数の表示方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholders {
    /// 空文字列にする
    Hide,
    /// `[name]` を表示
    Bracket,
    /// `«[name]»` を表示（出力プレビュー用）
    Highlight,
}

enum Scope<'a> {
    /// プレビュー: セグメントが有効な変数だけを解決する
    Preview { segments: &'a [Segment] },
    /// 実行時: 設定値をそのまま使い、シードは実値
    Execution { seed: Option<&'a str> },
}

enum Var {
    Value(String),
    Empty(&'static str),
}

/// `{variable}` 形式のテンプレートを解決する
pub struct TemplateResolver<'a> {
    config: &'a PathConfig,
    now: NaiveDateTime,
    scope: Scope<'a>,
}

impl<'a> TemplateResolver<'a> {
    pub fn preview(segments: &'a [Segment], config: &'a PathConfig, now: NaiveDateTime) -> Self {
        Self {
            config,
            now,
            scope: Scope::Preview { segments },
        }
    }

    pub fn execution(config: &'a PathConfig, now: NaiveDateTime, seed: Option<&'a str>) -> Self {
        Self {
            config,
            now,
            scope: Scope::Execution { seed },
        }
    }

    /// 変数名は大文字小文字を区別しない。未知の `{x}` と `%x` はそのまま残す。
    pub fn resolve(&self, template: &str, placeholders: Placeholders) -> String {
        VAR_RE
            .replace_all(template, |caps: &Captures| {
                let name = caps[1].to_ascii_lowercase();
                match self.lookup(&name) {
                    Some(Var::Value(v)) => v,
                    Some(Var::Empty(placeholder)) => match placeholders {
                        Placeholders::Hide => String::new(),
                        Placeholders::Bracket => format!("[{placeholder}]"),
                        Placeholders::Highlight => {
                            format!("{EMPTY_MARK_OPEN}[{placeholder}]{EMPTY_MARK_CLOSE}")
                        }
                    },
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// date セグメント用の日付文字列
    pub fn formatted_date(&self) -> String {
        let format = if self.config.date_format.is_empty() {
            DEFAULT_DATE_FORMAT
        } else {
            self.config.date_format.as_str()
        };
        format_date(format, &self.now)
    }

    fn enabled(&self, kind: SegmentType) -> bool {
        match self.scope {
            Scope::Preview { segments } => segments.iter().any(|s| s.kind == kind && s.enabled),
            Scope::Execution { .. } => true,
        }
    }

    /// セグメントが有効で値が空でなければ値、そうでなければプレースホルダ
    fn gated(&self, kind: SegmentType, value: &str, placeholder: &'static str) -> Var {
        if !self.enabled(kind) {
            return Var::Empty(placeholder);
        }
        if value.trim().is_empty() {
            return Var::Empty(placeholder);
        }
        Var::Value(value.to_string())
    }

    fn lookup(&self, name: &str) -> Option<Var> {
        let c = self.config;
        let execution = matches!(self.scope, Scope::Execution { .. });

        let var = match name {
            "counter" if !execution => Var::Value(COUNTER_MARK.to_string()),
            "year" => Var::Value(self.now.format("%Y").to_string()),
            "month" => Var::Value(self.now.format("%m").to_string()),
            "day" => Var::Value(self.now.format("%d").to_string()),
            "label" | "output" => self.gated(SegmentType::Label, &c.node_label, "label"),
            "filetype" | "file_type" => {
                if self.enabled(SegmentType::FileType) {
                    let v = if c.file_type.is_empty() {
                        DEFAULT_FILE_TYPE
                    } else {
                        c.file_type.as_str()
                    };
                    Var::Value(v.to_string())
                } else {
                    Var::Empty("filetype")
                }
            }
            "category" => self.gated(SegmentType::Category, &c.category, "category"),
            "name" => self.gated(SegmentType::Name, &c.name, "name"),
            "content_rating" | "rating" => {
                self.gated(SegmentType::ContentRating, &c.content_rating, "rating")
            }
            "sfw" | "nsfw" => {
                let wanted = name.to_ascii_uppercase();
                if self.enabled(SegmentType::ContentRating) && c.content_rating == wanted {
                    Var::Value(wanted)
                } else {
                    Var::Value(String::new())
                }
            }
            "project" => self.gated(SegmentType::Project, &c.project_name, "project"),
            "series" => self.gated(SegmentType::Series, &c.series_name, "series"),
            "resolution" | "res" => {
                self.gated(SegmentType::Resolution, &c.resolution, "resolution")
            }
            "model" => self.gated(SegmentType::Model, &c.model_name, "model"),
            "lora" => self.gated(SegmentType::Lora, &c.lora_name, "lora"),
            "seed" => match self.scope {
                Scope::Preview { .. } => Var::Value(SEED_SENTINEL.to_string()),
                Scope::Execution { seed } => Var::Value(seed.unwrap_or_default().to_string()),
            },
            "date" => {
                if self.enabled(SegmentType::Date) {
                    Var::Value(self.formatted_date())
                } else {
                    Var::Empty("date")
                }
            }
            _ => return None,
        };
        Some(var)
    }
}

/// テンプレートがカウンタ変数を含むか（`%counter` または `{counter}`）
pub fn has_counter(template: &str) -> bool {
    template.contains("%counter") || template.to_ascii_lowercase().contains("{counter}")
}
