pub mod align;
pub mod controller;
pub mod events;
pub mod graph;
pub mod overlay;
pub mod persist;
pub mod registry;
pub mod session;

use serde::{Deserialize, Serialize};

/// A node on the workflow canvas. `data` is an opaque config blob owned by
/// whichever panel edits the node; the canvas never interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub position: Position,
    pub label: String,
    #[serde(default)]
    pub data: serde_json::Value,
    /// Transient run highlight, never written to disk.
    #[serde(default, skip_serializing_if = "skip_if_false")]
    pub is_executing: bool,
}

fn skip_if_false(v: &bool) -> bool {
    !v
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Entry,
    AgentCall,
    Condition,
    Message,
    Delay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    /// Output handle on the source node. Condition nodes expose "true" and
    /// "false"; every other kind has a single unnamed output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    pub target: String,
    #[serde(rename = "type", default = "default_edge_type")]
    pub edge_type: String,
}

fn default_edge_type() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_roundtrip() {
        let node = Node {
            id: "n1".to_string(),
            kind: NodeKind::AgentCall,
            position: Position { x: 120.0, y: 80.0 },
            label: "Agent #1".to_string(),
            data: serde_json::json!({"agent_id": "triage"}),
            is_executing: false,
        };

        let json = serde_json::to_string(&node).unwrap();
        let parsed: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "n1");
        assert_eq!(parsed.kind, NodeKind::AgentCall);
        assert_eq!(parsed.label, "Agent #1");
        assert!(!parsed.is_executing);
    }

    #[test]
    fn test_node_kind_serialization() {
        assert_eq!(serde_json::to_string(&NodeKind::Entry).unwrap(), "\"entry\"");
        assert_eq!(
            serde_json::to_string(&NodeKind::AgentCall).unwrap(),
            "\"agent-call\""
        );
        assert_eq!(
            serde_json::to_string(&NodeKind::Condition).unwrap(),
            "\"condition\""
        );
        assert_eq!(
            serde_json::to_string(&NodeKind::Message).unwrap(),
            "\"message\""
        );
        assert_eq!(serde_json::to_string(&NodeKind::Delay).unwrap(), "\"delay\"");
    }

    #[test]
    fn test_executing_flag_not_serialized() {
        let node = Node {
            id: "n1".to_string(),
            kind: NodeKind::Delay,
            position: Position { x: 0.0, y: 0.0 },
            label: "Delay #1".to_string(),
            data: serde_json::Value::Null,
            is_executing: false,
        };
        let json = serde_json::to_string(&node).unwrap();
        assert!(!json.contains("is_executing"));
    }

    #[test]
    fn test_edge_type_defaults() {
        let edge: Edge = serde_json::from_str(r#"{"id":"e1","source":"a","target":"b"}"#).unwrap();
        assert_eq!(edge.edge_type, "default");
        assert!(edge.source_handle.is_none());

        let json = serde_json::to_string(&edge).unwrap();
        assert!(json.contains("\"type\":\"default\""));
        assert!(!json.contains("source_handle"));
    }
}
