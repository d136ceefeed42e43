use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::graph::Graph;

use super::{collect_nodes, ScanResult};

const CHECKPOINT_TYPES: [&str; 5] = [
    "CheckpointLoaderSimple",
    "CheckpointLoader",
    "UNETLoader",
    "CheckpointLoaderNF4",
    "Checkpoint Loader with Name (Image Saver)",
];

const MODEL_WIDGETS: [&str; 3] = ["ckpt_name", "unet_name", "model_name"];

static EXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(safetensors|ckpt|pt|bin)$").expect("model extension regex")
});

/// 拡張子とディレクトリ部分を落とす
pub fn clean_file_name(raw: &str) -> String {
    let stripped = EXT_RE.replace(raw, "");
    stripped
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// チェックポイントローダーからモデル名を探す
pub fn detect_model(graph: &Graph) -> Option<ScanResult> {
    let mut found = Vec::new();

    for node in collect_nodes(graph) {
        if !node.is_any_of(&CHECKPOINT_TYPES) {
            continue;
        }
        let widgets = node.widgets();
        let value = widgets
            .iter()
            .find(|w| MODEL_WIDGETS.contains(&w.name.as_str()))
            .and_then(|w| w.value.as_str())
            .filter(|v| !v.is_empty());
        if let Some(raw) = value {
            found.push(clean_file_name(raw));
        }
    }

    if found.is_empty() {
        log::debug!("チェックポイントノードが見つかりません");
    }
    ScanResult::from_all(found)
}
