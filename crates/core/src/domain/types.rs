use serde::{Deserialize, Serialize};

use super::config::ConfigField;

/// パスセグメント種別（閉じた列挙）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    Label,
    FileType,
    Project,
    Category,
    Name,
    ContentRating,
    Date,
    Series,
    Resolution,
    Model,
    Seed,
    Lora,
    Custom,
}

impl SegmentType {
    /// UIの追加メニュー順
    pub const ALL: [SegmentType; 13] = [
        SegmentType::Label,
        SegmentType::FileType,
        SegmentType::Project,
        SegmentType::Category,
        SegmentType::Name,
        SegmentType::ContentRating,
        SegmentType::Date,
        SegmentType::Series,
        SegmentType::Resolution,
        SegmentType::Model,
        SegmentType::Seed,
        SegmentType::Lora,
        SegmentType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::FileType => "file_type",
            Self::Project => "project",
            Self::Category => "category",
            Self::Name => "name",
            Self::ContentRating => "content_rating",
            Self::Date => "date",
            Self::Series => "series",
            Self::Resolution => "resolution",
            Self::Model => "model",
            Self::Seed => "seed",
            Self::Lora => "lora",
            Self::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// 表示ラベル
    pub fn label(&self) -> &'static str {
        match self {
            Self::Label => "Output Label",
            Self::FileType => "File Type",
            Self::Project => "Project",
            Self::Category => "Category",
            Self::Name => "Name",
            Self::ContentRating => "Content Rating",
            Self::Date => "Date",
            Self::Series => "Series",
            Self::Resolution => "Resolution",
            Self::Model => "Model",
            Self::Seed => "Seed (Auto)",
            Self::Lora => "LoRA",
            Self::Custom => "Custom",
        }
    }

    /// このセグメントが参照する設定フィールド（seed と custom は持たない）
    pub fn config_field(&self) -> Option<ConfigField> {
        match self {
            Self::Label => Some(ConfigField::NodeLabel),
            Self::FileType => Some(ConfigField::FileType),
            Self::Project => Some(ConfigField::ProjectName),
            Self::Category => Some(ConfigField::Category),
            Self::Name => Some(ConfigField::Name),
            Self::ContentRating => Some(ConfigField::ContentRating),
            Self::Date => Some(ConfigField::DateFormat),
            Self::Series => Some(ConfigField::SeriesName),
            Self::Resolution => Some(ConfigField::Resolution),
            Self::Model => Some(ConfigField::ModelName),
            Self::Lora => Some(ConfigField::LoraName),
            Self::Seed | Self::Custom => None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// パステンプレートの1要素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "type")]
    pub kind: SegmentType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// custom セグメントのテンプレート文字列
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Segment {
    pub fn new(kind: SegmentType) -> Self {
        Self {
            kind,
            enabled: true,
            value: None,
        }
    }

    pub fn custom(template: impl Into<String>) -> Self {
        Self {
            kind: SegmentType::Custom,
            enabled: true,
            value: Some(template.into()),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// 出力モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputMode {
    /// パス全体がファイル名プレフィックスになる（標準 Save Image）
    #[default]
    SaveImage,
    /// パスはフォルダ、ファイル名は filename_template（Image Saver）
    ImageSaver,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SaveImage => "saveImage",
            Self::ImageSaver => "imageSaver",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "saveImage" => Some(Self::SaveImage),
            "imageSaver" => Some(Self::ImageSaver),
            _ => None,
        }
    }
}

/// 複数LoRAのパス表現
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoraPathFormat {
    #[default]
    Primary,
    PrimaryCount,
    All,
    Separate,
}
