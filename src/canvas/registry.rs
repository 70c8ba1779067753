use serde_json::{Value, json};

use super::{Node, NodeKind};

/// Per-kind editing rules. The canvas consults this table instead of
/// hardcoding kind checks in the interaction paths.
#[derive(Debug, Clone, Copy)]
pub struct KindSpec {
    pub kind: NodeKind,
    /// Human title, also the stem for default labels.
    pub title: &'static str,
    /// Whether the user may delete nodes of this kind.
    pub deletable: bool,
    /// Whether edges may terminate at nodes of this kind.
    pub connectable_target: bool,
    /// At most one instance per graph.
    pub singleton: bool,
    /// Named output handles. Empty means a single unnamed output.
    pub source_handles: &'static [&'static str],
}

pub const KINDS: [KindSpec; 5] = [
    KindSpec {
        kind: NodeKind::Entry,
        title: "Start",
        deletable: false,
        connectable_target: false,
        singleton: true,
        source_handles: &[],
    },
    KindSpec {
        kind: NodeKind::AgentCall,
        title: "Agent",
        deletable: true,
        connectable_target: true,
        singleton: false,
        source_handles: &[],
    },
    KindSpec {
        kind: NodeKind::Condition,
        title: "Condition",
        deletable: true,
        connectable_target: true,
        singleton: false,
        source_handles: &["true", "false"],
    },
    KindSpec {
        kind: NodeKind::Message,
        title: "Message",
        deletable: true,
        connectable_target: true,
        singleton: false,
        source_handles: &[],
    },
    KindSpec {
        kind: NodeKind::Delay,
        title: "Delay",
        deletable: true,
        connectable_target: true,
        singleton: false,
        source_handles: &[],
    },
];

pub fn spec(kind: NodeKind) -> &'static KindSpec {
    match kind {
        NodeKind::Entry => &KINDS[0],
        NodeKind::AgentCall => &KINDS[1],
        NodeKind::Condition => &KINDS[2],
        NodeKind::Message => &KINDS[3],
        NodeKind::Delay => &KINDS[4],
    }
}

pub fn parse_kind(raw: &str) -> Option<NodeKind> {
    match raw {
        "entry" => Some(NodeKind::Entry),
        "agent-call" => Some(NodeKind::AgentCall),
        "condition" => Some(NodeKind::Condition),
        "message" => Some(NodeKind::Message),
        "delay" => Some(NodeKind::Delay),
        _ => None,
    }
}

/// Label for a freshly dropped node: the entry keeps its fixed title,
/// everything else gets an ordinal counted over nodes of the same kind.
pub fn default_label(kind: NodeKind, existing: &[Node]) -> String {
    let spec = spec(kind);
    if kind == NodeKind::Entry {
        return spec.title.to_string();
    }
    let ordinal = existing.iter().filter(|n| n.kind == kind).count() + 1;
    format!("{} #{}", spec.title, ordinal)
}

/// Checks a proposed source handle against the kind's declared outputs.
/// Kinds with a single unnamed output only accept an absent handle.
pub fn valid_source_handle(kind: NodeKind, handle: Option<&str>) -> bool {
    let handles = spec(kind).source_handles;
    match handle {
        None => handles.is_empty(),
        Some(h) => handles.contains(&h),
    }
}

/// Palette description served to the frontend.
pub fn palette() -> Value {
    let kinds: Vec<Value> = KINDS
        .iter()
        .map(|s| {
            json!({
                "kind": s.kind,
                "title": s.title,
                "deletable": s.deletable,
                "connectable_target": s.connectable_target,
                "singleton": s.singleton,
                "source_handles": s.source_handles,
            })
        })
        .collect();
    json!({ "node_kinds": kinds })
}
