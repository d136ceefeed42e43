use crate::domain::graph::Graph;

use super::{collect_nodes, value_to_string, ScanResult};

const LATENT_TYPES: [&str; 3] = ["EmptyLatentImage", "LatentUpscale", "LatentUpscaleBy"];

/// 潜在画像ノードの width/height を `"{w}x{h}"` で返す
pub fn detect_resolution(graph: &Graph) -> Option<ScanResult> {
    let mut found = Vec::new();

    for node in collect_nodes(graph) {
        if !node.is_any_of(&LATENT_TYPES) {
            continue;
        }
        let width = node.widget("width").as_ref().and_then(value_to_string);
        let height = node.widget("height").as_ref().and_then(value_to_string);
        if let (Some(w), Some(h)) = (width, height) {
            found.push(format!("{w}x{h}"));
        }
    }

    ScanResult::from_all(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::graph::MemoryNode;
    use serde_json::json;

    #[test]
    fn test_detect_resolution() {
        let graph = Graph::new(
            "root",
            vec![
                MemoryNode::new("1", "EmptyLatentImage")
                    .with_widget("width", json!(832))
                    .with_widget("height", json!(1216))
                    .into_ref(),
                MemoryNode::new("2", "LatentUpscale")
                    .with_widget("width", json!(1024))
                    .into_ref(),
                MemoryNode::new("3", "LatentUpscaleBy")
                    .with_widget("width", json!(2048))
                    .with_widget("height", json!(2048))
                    .into_ref(),
            ],
        );
        let result = detect_resolution(&graph).unwrap();
        assert_eq!(result.value, "832x1216");
        assert_eq!(result.total, 2);
    }

    #[test]
    fn test_exact_type_only() {
        let graph = Graph::new(
            "root",
            vec![MemoryNode::new("1", "EmptyLatentImageCustom")
                .with_widget("width", json!(1))
                .with_widget("height", json!(1))
                .into_ref()],
        );
        assert!(detect_resolution(&graph).is_none());
    }
}
