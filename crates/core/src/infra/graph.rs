use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::domain::graph::{Graph, GraphNode, LoraEntry, NodeRef, Subgraph, Widget};

// ─── In-memory node ───

#[derive(Default)]
struct NodeData {
    id: String,
    type_name: String,
    class_name: Option<String>,
    widgets: Vec<Widget>,
    lora_entries: Option<Vec<LoraEntry>>,
    subgraph: Option<Subgraph>,
    inner_nodes: Vec<NodeRef>,
}

/// テスト・埋め込み用のノード
///
/// ハンドルを共有したまま後からサブグラフを差し替えられるので、循環も組める。
#[derive(Clone)]
pub struct MemoryNode {
    data: Arc<RwLock<NodeData>>,
}

impl MemoryNode {
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            data: Arc::new(RwLock::new(NodeData {
                id: id.into(),
                type_name: type_name.into(),
                ..Default::default()
            })),
        }
    }

    pub fn with_class(self, class_name: impl Into<String>) -> Self {
        self.data.write().class_name = Some(class_name.into());
        self
    }

    pub fn with_widget(self, name: impl Into<String>, value: Value) -> Self {
        self.data.write().widgets.push(Widget::new(name, value));
        self
    }

    pub fn with_lora_entries(self, entries: Vec<LoraEntry>) -> Self {
        self.data.write().lora_entries = Some(entries);
        self
    }

    pub fn with_subgraph(self, id: impl Into<String>, nodes: Vec<NodeRef>) -> Self {
        self.set_subgraph(id, nodes);
        self
    }

    pub fn with_inner_nodes(self, nodes: Vec<NodeRef>) -> Self {
        self.set_inner_nodes(nodes);
        self
    }

    pub fn set_subgraph(&self, id: impl Into<String>, nodes: Vec<NodeRef>) {
        self.data.write().subgraph = Some(Subgraph {
            id: id.into(),
            nodes,
        });
    }

    pub fn set_inner_nodes(&self, nodes: Vec<NodeRef>) {
        self.data.write().inner_nodes = nodes;
    }

    pub fn into_ref(self) -> NodeRef {
        Arc::new(self)
    }
}

impl GraphNode for MemoryNode {
    fn id(&self) -> String {
        self.data.read().id.clone()
    }

    fn type_name(&self) -> String {
        self.data.read().type_name.clone()
    }

    fn class_name(&self) -> Option<String> {
        self.data.read().class_name.clone()
    }

    fn widgets(&self) -> Vec<Widget> {
        self.data.read().widgets.clone()
    }

    fn lora_entries(&self) -> Option<Vec<LoraEntry>> {
        self.data.read().lora_entries.clone()
    }

    fn subgraph(&self) -> Option<Subgraph> {
        self.data.read().subgraph.clone()
    }

    fn inner_nodes(&self) -> Vec<NodeRef> {
        self.data.read().inner_nodes.clone()
    }
}

// ─── Execution-time prompt ───

/// 実行時プロンプト JSON のノード
struct PromptNode {
    id: String,
    class_type: String,
    widgets: Vec<Widget>,
}

impl GraphNode for PromptNode {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn type_name(&self) -> String {
        self.class_type.clone()
    }

    fn widgets(&self) -> Vec<Widget> {
        self.widgets.clone()
    }
}

/// `[node_id, slot]` 形式のリンク入力か
fn is_link(value: &Value) -> bool {
    match value.as_array() {
        Some(items) if items.len() == 2 => items[0].is_string() && items[1].is_u64(),
        _ => false,
    }
}

/// 実行時プロンプト `{id: {class_type, inputs}}` をグラフに変換する。
/// リンク入力は値を持たないので捨てる。
pub fn prompt_graph(prompt: &Value) -> Graph {
    let Some(map) = prompt.as_object() else {
        if !prompt.is_null() {
            log::warn!("prompt が object ではありません");
        }
        return Graph::default();
    };

    let nodes = map
        .iter()
        .filter_map(|(id, data)| {
            let class_type = data.get("class_type")?.as_str()?.to_string();
            let widgets = data
                .get("inputs")
                .and_then(Value::as_object)
                .map(|inputs| {
                    inputs
                        .iter()
                        .filter(|(_, v)| !is_link(v))
                        .map(|(k, v)| Widget::new(k.clone(), v.clone()))
                        .collect()
                })
                .unwrap_or_default();
            let node: NodeRef = Arc::new(PromptNode {
                id: id.clone(),
                class_type,
                widgets,
            });
            Some(node)
        })
        .collect();

    Graph::new("prompt", nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_node_builders() {
        let node = MemoryNode::new("7", "LoraLoader")
            .with_class("LoraLoader")
            .with_widget("lora_name", json!("style.safetensors"));
        assert_eq!(node.widget("lora_name"), Some(json!("style.safetensors")));
        assert!(node.is_any_of(&["LoraLoader"]));
        assert!(node.widget("missing").is_none());
    }

    #[test]
    fn test_prompt_graph_skips_links() {
        let prompt = json!({
            "3": { "class_type": "KSampler", "inputs": { "seed": 42, "model": ["4", 0] } },
            "4": { "class_type": "CheckpointLoaderSimple", "inputs": { "ckpt_name": "sdxl.safetensors" } },
            "9": { "inputs": {} }
        });
        let graph = prompt_graph(&prompt);
        assert_eq!(graph.nodes.len(), 2);

        let sampler = graph.nodes.iter().find(|n| n.id() == "3").unwrap();
        assert_eq!(sampler.widget("seed"), Some(json!(42)));
        assert!(sampler.widget("model").is_none());
    }

    #[test]
    fn test_prompt_graph_non_object() {
        assert!(prompt_graph(&json!([1, 2])).nodes.is_empty());
        assert!(prompt_graph(&Value::Null).nodes.is_empty());
    }
}
