use serde::{Deserialize, Serialize};

use super::graph::Graph;
use super::{Edge, Node};

/// The persisted shape of a canvas: exactly the node and edge arrays,
/// nothing about selection, gestures or run highlights.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowData {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl FlowData {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Projects the live graph into its stored form. Run highlights are
/// transient and never leave the editor.
pub fn to_persisted(graph: &Graph) -> FlowData {
    let mut nodes = graph.nodes().to_vec();
    for node in &mut nodes {
        node.is_executing = false;
    }
    FlowData {
        nodes,
        edges: graph.edges().to_vec(),
    }
}

/// Rebuilds a graph from stored data. Only a record with both nodes and
/// edges counts as a real drawing; anything less (a legacy record, a
/// never-edited one) starts the default single-entry canvas instead.
pub fn from_persisted(data: FlowData) -> Graph {
    if data.nodes.is_empty() || data.edges.is_empty() {
        return Graph::with_entry();
    }
    let mut nodes = data.nodes;
    for node in &mut nodes {
        node.is_executing = false;
    }
    Graph::from_parts(nodes, data.edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{NodeKind, Position};

    fn drawn_graph() -> Graph {
        let mut graph = Graph::with_entry();
        let entry = graph.entry().unwrap().id.clone();
        let agent = graph
            .add_node(NodeKind::AgentCall, Position::new(300.0, 100.0))
            .unwrap();
        graph.connect(&entry, None, &agent).unwrap();
        graph
    }

    #[test]
    fn test_roundtrip_preserves_drawing() {
        let mut graph = drawn_graph();
        let agent = graph.nodes()[1].id.clone();
        graph.set_node_label(&agent, "Classifier".to_string());

        let stored = to_persisted(&graph);
        let json = serde_json::to_string(&stored).unwrap();
        let parsed: FlowData = serde_json::from_str(&json).unwrap();
        let hydrated = from_persisted(parsed);

        assert_eq!(hydrated.nodes().len(), 2);
        assert_eq!(hydrated.edges().len(), 1);
        assert_eq!(hydrated.nodes()[1].label, "Classifier");
        assert_eq!(hydrated.nodes()[1].position, Position::new(300.0, 100.0));
        assert_eq!(hydrated.edges()[0].source, graph.entry().unwrap().id);
    }

    #[test]
    fn test_run_highlight_never_persisted() {
        let mut graph = drawn_graph();
        let agent = graph.nodes()[1].id.clone();
        graph.mark_executing(&agent);

        let stored = to_persisted(&graph);
        assert!(stored.nodes.iter().all(|n| !n.is_executing));
        let json = serde_json::to_string(&stored).unwrap();
        assert!(!json.contains("is_executing"));
    }

    #[test]
    fn test_hydrating_stored_highlight_clears_it() {
        let mut stored = to_persisted(&drawn_graph());
        stored.nodes[1].is_executing = true;
        let hydrated = from_persisted(stored);
        assert!(hydrated.executing_node().is_none());
    }

    #[test]
    fn test_hydrating_overflow_position_resets_it() {
        // An overflowing stored coordinate parses as infinity.
        let json = serde_json::to_string(&to_persisted(&drawn_graph()))
            .unwrap()
            .replace("300.0", "1e999");
        let parsed: FlowData = serde_json::from_str(&json).unwrap();
        assert!(parsed.nodes[1].position.x.is_infinite());

        let hydrated = from_persisted(parsed);
        assert_eq!(hydrated.nodes()[1].position, Position::new(0.0, 0.0));
        assert_eq!(hydrated.edges().len(), 1);
    }

    #[test]
    fn test_empty_record_starts_default_canvas() {
        let hydrated = from_persisted(FlowData::default());
        assert_eq!(hydrated.nodes().len(), 1);
        assert_eq!(hydrated.nodes()[0].kind, NodeKind::Entry);
        assert!(hydrated.edges().is_empty());
    }

    #[test]
    fn test_nodes_without_edges_start_default_canvas() {
        let stored = FlowData {
            nodes: to_persisted(&drawn_graph()).nodes,
            edges: Vec::new(),
        };
        let hydrated = from_persisted(stored);
        assert_eq!(hydrated.nodes().len(), 1);
        assert_eq!(hydrated.nodes()[0].kind, NodeKind::Entry);
    }

    #[test]
    fn test_edges_without_nodes_start_default_canvas() {
        let stored = FlowData {
            nodes: Vec::new(),
            edges: to_persisted(&drawn_graph()).edges,
        };
        let hydrated = from_persisted(stored);
        assert_eq!(hydrated.nodes().len(), 1);
        assert!(hydrated.edges().is_empty());
    }

    #[test]
    fn test_missing_fields_deserialize_as_empty() {
        let parsed: FlowData = serde_json::from_str("{}").unwrap();
        assert!(parsed.is_empty());
    }
}
