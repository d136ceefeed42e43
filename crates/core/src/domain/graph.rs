use std::sync::Arc;

use serde_json::Value;

/// ノードのウィジェット値
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub name: String,
    pub value: Value,
}

impl Widget {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// LoRA Manager が公開する構造化エントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoraEntry {
    pub name: String,
    pub active: bool,
}

/// サブグラフ（グループノードの中身）
#[derive(Clone)]
pub struct Subgraph {
    /// 循環検出に使う識別子
    pub id: String,
    pub nodes: Vec<NodeRef>,
}

/// ホストのノードグラフを抽象化した読み取り専用インターフェース
///
/// スキャナはこのトレイトだけに依存する。ホスト固有の形はアダプタ側で吸収する。
pub trait GraphNode: Send + Sync {
    fn id(&self) -> String;

    /// ノード種別（空文字列のこともある）
    fn type_name(&self) -> String;

    /// 登録クラス名。種別名と異なる場合のみ返す。
    fn class_name(&self) -> Option<String> {
        None
    }

    fn widgets(&self) -> Vec<Widget>;

    /// LoRA Manager の構造化データ
    fn lora_entries(&self) -> Option<Vec<LoraEntry>> {
        None
    }

    /// ネストされたサブグラフ
    fn subgraph(&self) -> Option<Subgraph> {
        None
    }

    /// グループノードが直接保持する内部ノード
    fn inner_nodes(&self) -> Vec<NodeRef> {
        Vec::new()
    }

    fn widget(&self, name: &str) -> Option<Value> {
        self.widgets()
            .into_iter()
            .find(|w| w.name == name)
            .map(|w| w.value)
    }

    /// 種別名かクラス名のどちらかが一致するか
    fn is_any_of(&self, types: &[&str]) -> bool {
        let type_name = self.type_name();
        let class_name = self.class_name();
        types
            .iter()
            .any(|t| *t == type_name || class_name.as_deref() == Some(*t))
    }
}

pub type NodeRef = Arc<dyn GraphNode>;

/// ルートグラフ
#[derive(Clone, Default)]
pub struct Graph {
    pub id: String,
    pub nodes: Vec<NodeRef>,
}

impl Graph {
    pub fn new(id: impl Into<String>, nodes: Vec<NodeRef>) -> Self {
        Self {
            id: id.into(),
            nodes,
        }
    }
}
