use std::cmp::Ordering;

use serde_json::Value;

use crate::domain::graph::Graph;

use super::{collect_nodes, effective_type, loosely_matches};

/// 優先度順: シード生成 → ノイズ生成 → サンプラー
const SEED_SOURCES: [(&[&str], &str); 3] = [
    (&["Seed Generator"], "seed"),
    (&["RandomNoise", "DisableNoise"], "noise_seed"),
    (
        &[
            "KSampler",
            "KSamplerAdvanced",
            "SamplerCustom",
            "KSampler (Efficient)",
            "SamplerCustomAdvanced",
        ],
        "seed",
    ),
];

/// `[seed, batch_index]` は先頭を使い、数値文字列は整数として扱う
fn seed_string(value: &Value) -> Option<String> {
    let value = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    match value {
        Value::Null => None,
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(
            s.trim()
                .parse::<i64>()
                .map(|n| n.to_string())
                .unwrap_or_else(|_| s.clone()),
        ),
        other => Some(other.to_string()),
    }
}

/// 数値 ID は数値として比較する
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// グラフからシード値を探す。
///
/// 同じ優先度のノードが複数あればノード ID の若い方を採る。
pub fn detect_seed(graph: &Graph) -> Option<String> {
    let mut candidates: Vec<(usize, String, String)> = Vec::new();

    for node in collect_nodes(graph) {
        let node_type = effective_type(&node);
        let source = SEED_SOURCES
            .iter()
            .position(|(types, _)| loosely_matches(&node_type, types));
        let Some(priority) = source else {
            continue;
        };
        let widget = SEED_SOURCES[priority].1;
        if let Some(seed) = node.widget(widget).as_ref().and_then(seed_string) {
            candidates.push((priority, node.id(), seed));
        }
    }

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| compare_ids(&a.1, &b.1)));
    let (_, id, seed) = candidates.into_iter().next()?;
    log::debug!("シード検出: node {id} → {seed}");
    Some(seed)
}
