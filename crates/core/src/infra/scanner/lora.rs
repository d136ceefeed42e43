use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::domain::graph::{Graph, NodeRef};
use crate::domain::types::LoraPathFormat;
use crate::infra::path_builder::LORA_DELIMITER;

use super::{collect_nodes, loosely_matches, model::clean_file_name};

/// `<lora:name:strength>` / `<lora:name:strength:clip>`
static LORA_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<lora:([^:>]+):([-\d\.]+)(?::([-\d\.]+))?>").expect("lora tag regex")
});

const MANAGER_TYPE: &str = "Lora Loader (LoraManager)";

const LOADER_TYPES: [&str; 4] = [
    "LoraLoader",
    "LoraLoaderModelOnly",
    "LoRA Stacker",
    "Power Lora Loader (rgthree)",
];

const TEXT_TYPES: [&str; 8] = [
    "ImpactWildcardEncode",
    "CLIPTextEncode",
    "BNK_CLIPTextEncodeAdvanced",
    "CLIPTextEncodeSDXL",
    "CLIPTextEncodeSDXLRefiner",
    "String Literal",
    "Text Multiline",
    "ShowText",
];

/// 出現順を保ったまま重複を除く
#[derive(Default)]
struct NameSet(Vec<String>);

impl NameSet {
    fn push(&mut self, name: &str) {
        if !name.is_empty() && !self.0.iter().any(|n| n == name) {
            self.0.push(name.to_string());
        }
    }

    fn push_tags(&mut self, text: &str) {
        for caps in LORA_TAG_RE.captures_iter(text) {
            self.push(&caps[1]);
        }
    }
}

fn is_manager(node: &NodeRef) -> bool {
    node.is_any_of(&[MANAGER_TYPE]) || node.type_name() == "lora"
}

fn is_text_node(node_type: &str) -> bool {
    TEXT_TYPES.contains(&node_type)
        || node_type.contains("TextEncode")
        || node_type.contains("Wildcard")
}

/// ローダーノードの LoRA 値から名前を取り出す
fn loader_value_name(value: &Value) -> Option<String> {
    let raw = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Array(items) => items.first()?.as_str()?.to_string(),
        Value::Object(obj) => match obj.get("content").and_then(Value::as_str) {
            Some(content) => content.to_string(),
            None => {
                log::warn!("想定外の LoRA 値: {value}");
                value.to_string()
            }
        },
        other => other.to_string(),
    };
    if raw.is_empty() || raw == "None" {
        return None;
    }
    Some(clean_file_name(&raw))
}

fn scan_manager(node: &NodeRef, names: &mut NameSet) {
    if let Some(entries) = node.lora_entries() {
        for entry in entries.iter().filter(|e| e.active) {
            names.push(&entry.name);
        }
        return;
    }
    // 構造化データが無い場合は入力テキストを解析する
    let text = node.widget("loras").or_else(|| node.widget("text"));
    if let Some(text) = text.as_ref().and_then(Value::as_str) {
        names.push_tags(text);
    }
}

fn scan_loader(node: &NodeRef, names: &mut NameSet) {
    let widgets = node.widgets();
    let widget = widgets.iter().find(|w| {
        w.name == "lora_name" || w.name == "lora" || w.name.to_lowercase().contains("lora")
    });
    if let Some(name) = widget.and_then(|w| loader_value_name(&w.value)) {
        names.push(&name);
    }
}

fn scan_text(node: &NodeRef, names: &mut NameSet) {
    for widget in node.widgets() {
        if let Some(text) = widget.value.as_str() {
            if text.contains("<lora:") {
                names.push_tags(text);
            }
        }
    }
}

/// ワークフロー中の LoRA 名（出現順、重複なし）
pub fn detect_loras(graph: &Graph) -> Vec<String> {
    let mut names = NameSet::default();

    for node in collect_nodes(graph) {
        if is_manager(&node) {
            scan_manager(&node, &mut names);
            continue;
        }
        let node_type = node.type_name();
        if loosely_matches(&node_type, &LOADER_TYPES) {
            scan_loader(&node, &mut names);
        }
        if is_text_node(&node_type) {
            scan_text(&node, &mut names);
        }
    }

    names.0
}

/// 複数 LoRA のパス表現
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoraPath {
    Single(String),
    /// フォルダを分ける（保存時は `" | "` 区切り）
    Separate(Vec<String>),
}

impl fmt::Display for LoraPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(s) => f.write_str(s),
            Self::Separate(names) => f.write_str(&names.join(LORA_DELIMITER)),
        }
    }
}

pub fn format_lora_path(names: &[String], format: LoraPathFormat) -> LoraPath {
    let Some(first) = names.first() else {
        return LoraPath::Single(String::new());
    };
    match format {
        LoraPathFormat::Primary => LoraPath::Single(first.clone()),
        LoraPathFormat::PrimaryCount if names.len() > 1 => {
            LoraPath::Single(format!("{first}_+{}more", names.len() - 1))
        }
        LoraPathFormat::PrimaryCount => LoraPath::Single(first.clone()),
        LoraPathFormat::All => LoraPath::Single(names.join(",")),
        LoraPathFormat::Separate => LoraPath::Separate(names.to_vec()),
    }
}
