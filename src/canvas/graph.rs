use serde_json::json;
use uuid::Uuid;

use super::registry;
use super::{Edge, Node, NodeKind, Position};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("cannot connect a node to itself")]
    SelfLoop,
    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),
    #[error("target does not accept connections: {0}")]
    TargetNotConnectable(String),
    #[error("invalid source handle for node kind")]
    InvalidHandle,
    #[error("edge already exists")]
    Duplicate,
}

/// In-memory canvas graph. Mutations go through the operations below so
/// the structural rules hold at all times: at most one entry node, no
/// self-loops, no edge without both endpoints.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Graph {
    /// Fresh graph holding only the entry node.
    pub fn with_entry() -> Self {
        let mut graph = Self::default();
        graph.nodes.push(Node {
            id: Uuid::new_v4().to_string(),
            kind: NodeKind::Entry,
            position: ENTRY_POSITION,
            label: registry::spec(NodeKind::Entry).title.to_string(),
            data: json!({}),
            is_executing: false,
        });
        graph
    }

    /// Rebuilds a graph from stored parts. Nodes with non-finite stored
    /// positions are reset to the origin, and edges whose endpoints are
    /// missing are dropped up front rather than carried as dead weight.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut graph = Self { nodes, edges };
        for node in &mut graph.nodes {
            if !node.position.x.is_finite() || !node.position.y.is_finite() {
                tracing::warn!(node = %node.id, "reset non-finite stored position");
                node.position = Position::new(0.0, 0.0);
            }
        }
        let pruned = graph.prune_dangling_edges();
        if pruned > 0 {
            tracing::warn!(pruned, "dropped edges with missing endpoints");
        }
        graph
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn entry(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind == NodeKind::Entry)
    }

    /// Adds a node of the given kind and returns its id. Singleton kinds
    /// are refused once an instance exists.
    pub fn add_node(&mut self, kind: NodeKind, position: Position) -> Option<String> {
        let spec = registry::spec(kind);
        if spec.singleton && self.nodes.iter().any(|n| n.kind == kind) {
            return None;
        }
        let node = Node {
            id: Uuid::new_v4().to_string(),
            kind,
            position,
            label: registry::default_label(kind, &self.nodes),
            data: json!({}),
            is_executing: false,
        };
        let id = node.id.clone();
        self.nodes.push(node);
        Some(id)
    }

    pub fn move_node(&mut self, id: &str, position: Position) -> bool {
        if !position.x.is_finite() || !position.y.is_finite() {
            return false;
        }
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    pub fn set_node_label(&mut self, id: &str, label: String) -> bool {
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => {
                node.label = label;
                true
            }
            None => false,
        }
    }

    pub fn set_node_data(&mut self, id: &str, data: serde_json::Value) -> bool {
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => {
                node.data = data;
                true
            }
            None => false,
        }
    }

    /// Removes a node and every edge touching it. The entry node is not
    /// deletable and the call is a no-op for it.
    pub fn remove_node(&mut self, id: &str) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        if !registry::spec(node.kind).deletable {
            return false;
        }
        self.nodes.retain(|n| n.id != id);
        self.edges.retain(|e| e.source != id && e.target != id);
        true
    }

    /// Connects two nodes and returns the new edge id. Mirrors what the
    /// canvas allows interactively: no self-loops, both endpoints must
    /// exist, the target kind must accept incoming edges, the handle must
    /// belong to the source kind, and an identical connection is not
    /// added twice.
    pub fn connect(
        &mut self,
        source: &str,
        source_handle: Option<String>,
        target: &str,
    ) -> Result<String, ConnectError> {
        if source == target {
            return Err(ConnectError::SelfLoop);
        }
        let source_node = self
            .node(source)
            .ok_or_else(|| ConnectError::UnknownEndpoint(source.to_string()))?;
        let target_node = self
            .node(target)
            .ok_or_else(|| ConnectError::UnknownEndpoint(target.to_string()))?;
        if !registry::spec(target_node.kind).connectable_target {
            return Err(ConnectError::TargetNotConnectable(target.to_string()));
        }
        if !registry::valid_source_handle(source_node.kind, source_handle.as_deref()) {
            return Err(ConnectError::InvalidHandle);
        }
        let duplicate = self.edges.iter().any(|e| {
            e.source == source && e.target == target && e.source_handle == source_handle
        });
        if duplicate {
            return Err(ConnectError::Duplicate);
        }
        let id = Uuid::new_v4().to_string();
        self.edges.push(Edge {
            id: id.clone(),
            source: source.to_string(),
            source_handle,
            target: target.to_string(),
            edge_type: "default".to_string(),
        });
        Ok(id)
    }

    pub fn remove_edge(&mut self, id: &str) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| e.id != id);
        self.edges.len() < before
    }

    /// Drops edges referencing nodes that are not present. Returns how
    /// many were removed.
    pub fn prune_dangling_edges(&mut self) -> usize {
        let before = self.edges.len();
        let nodes = &self.nodes;
        self.edges
            .retain(|e| nodes.iter().any(|n| n.id == e.source) && nodes.iter().any(|n| n.id == e.target));
        before - self.edges.len()
    }

    /// Flags a single node as the one currently executing. Any previous
    /// flag is cleared so at most one node carries the highlight. An
    /// unknown id changes nothing.
    pub fn mark_executing(&mut self, id: &str) -> bool {
        if !self.nodes.iter().any(|n| n.id == id) {
            return false;
        }
        for node in &mut self.nodes {
            node.is_executing = node.id == id;
        }
        true
    }

    pub fn clear_executing(&mut self) {
        for node in &mut self.nodes {
            node.is_executing = false;
        }
    }

    pub fn executing_node(&self) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| n.is_executing)
            .map(|n| n.id.as_str())
    }
}

/// Where the entry node lands on a fresh canvas.
pub const ENTRY_POSITION: Position = Position { x: 80.0, y: 120.0 };
