mod lora;
mod model;
mod resolution;
mod seed;

pub use lora::{detect_loras, format_lora_path, LoraPath};
pub use model::{clean_file_name, detect_model};
pub use resolution::detect_resolution;
pub use seed::detect_seed;

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::domain::graph::{Graph, NodeRef};

/// 「N 件見つかったので先頭を使う」形式のスキャン結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    /// 先頭の値
    pub value: String,
    pub total: usize,
    pub all: Vec<String>,
}

impl ScanResult {
    pub fn from_all(all: Vec<String>) -> Option<Self> {
        let value = all.first()?.clone();
        Some(Self {
            value,
            total: all.len(),
            all,
        })
    }
}

/// サブグラフ・グループノードの中まで含めた全ノード（訪問順）
///
/// 同じノードや同じサブグラフは二度辿らない。ノードは参照先と
/// (所属スコープ, id) の両方で判定するので、呼ぶたびに新しいノードを返す
/// アダプタでも止まる。
pub fn collect_nodes(graph: &Graph) -> Vec<NodeRef> {
    let mut walker = Walker::default();
    walker.visited_graphs.insert(graph.id.clone());
    walker.walk(&graph.id, &graph.id, &graph.nodes);
    walker.out
}

#[derive(Default)]
struct Walker {
    out: Vec<NodeRef>,
    visited_ptrs: HashSet<usize>,
    visited_ids: HashSet<(String, String)>,
    visited_graphs: HashSet<String>,
}

impl Walker {
    /// `graph` は直近のグラフ ID、`scope` はその中の所属（グループの内部ノードなら `graph#group`）
    fn walk(&mut self, graph: &str, scope: &str, nodes: &[NodeRef]) {
        for node in nodes {
            let ptr = Arc::as_ptr(node) as *const () as usize;
            let id = node.id();
            if !self.visited_ptrs.insert(ptr)
                || !self.visited_ids.insert((scope.to_string(), id.clone()))
            {
                continue;
            }
            self.out.push(Arc::clone(node));

            if let Some(sub) = node.subgraph() {
                if self.visited_graphs.insert(sub.id.clone()) {
                    self.walk(&sub.id, &sub.id, &sub.nodes);
                }
            }

            let inner = node.inner_nodes();
            if !inner.is_empty() {
                self.walk(graph, &format!("{graph}#{id}"), &inner);
            }
        }
    }
}

/// ウィジェット値を表示用の文字列にする
pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// 種別名（空ならクラス名）
pub(crate) fn effective_type(node: &NodeRef) -> String {
    let type_name = node.type_name();
    if type_name.is_empty() {
        node.class_name().unwrap_or_default()
    } else {
        type_name
    }
}

/// 部分一致（どちら向きでも可）。空の種別名は一致しない。
pub(crate) fn loosely_matches(node_type: &str, candidates: &[&str]) -> bool {
    !node_type.is_empty()
        && candidates
            .iter()
            .any(|c| node_type.contains(c) || c.contains(node_type))
}
