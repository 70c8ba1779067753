use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::align::{self, GuideLine};
use super::graph::Graph;
use super::registry;
use super::{Edge, Node, NodeKind, Position};

/// Rendered context menu size, used to keep it inside the canvas pane.
pub const MENU_WIDTH: f64 = 160.0;
pub const MENU_HEIGHT: f64 = 120.0;

/// One pointer or keyboard event forwarded by the canvas frontend.
/// Coordinates are screen pixels for palette drops and menu clicks and
/// canvas units for node moves, matching what the renderer has at hand.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CanvasInput {
    SetView {
        pan_x: f64,
        pan_y: f64,
        zoom: f64,
        width: f64,
        height: f64,
    },
    PaletteDrop {
        kind: String,
        x: f64,
        y: f64,
    },
    DragStart {
        node_id: String,
    },
    MoveNodes {
        moves: Vec<NodeMove>,
    },
    DragEnd,
    ConnectStart {
        source: String,
        #[serde(default)]
        handle: Option<String>,
    },
    ConnectEnd {
        #[serde(default)]
        target: Option<String>,
    },
    NodeClick {
        node_id: String,
    },
    EdgeClick {
        edge_id: String,
    },
    CanvasClick,
    OpenNodeMenu {
        node_id: String,
        x: f64,
        y: f64,
    },
    DeleteNode {
        node_id: String,
    },
    DeleteEdge {
        edge_id: String,
    },
    Escape {
        #[serde(default)]
        editing_label: bool,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeMove {
    pub node_id: String,
    pub x: f64,
    pub y: f64,
}

/// What an input did to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Applied {
    /// Graph content changed; the document is dirty until saved.
    Mutated,
    /// Only interaction state changed: selection, gesture, menu, view.
    Interaction,
    /// The input referenced something missing or inert and was dropped.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    fn to_canvas(&self, x: f64, y: f64) -> Position {
        Position::new((x - self.pan_x) / self.zoom, (y - self.pan_y) / self.zoom)
    }
}

/// Size of the canvas pane in screen pixels. Until the frontend reports
/// one, the pane is treated as unbounded and the menu never flips.
#[derive(Debug, Clone, Copy)]
struct PaneBounds {
    width: f64,
    height: f64,
}

impl Default for PaneBounds {
    fn default() -> Self {
        Self {
            width: f64::INFINITY,
            height: f64::INFINITY,
        }
    }
}

/// An open per-node context menu. `x`/`y` are the top-left corner in
/// screen pixels, already flipped away from the pane edges.
#[derive(Debug, Clone, Serialize)]
pub struct ContextMenu {
    pub node_id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Idle,
    Dragging { node_id: String },
    Connecting { source: String, handle: Option<String> },
}

/// Everything the renderer needs to draw one frame of the editor.
#[derive(Debug, Clone, Serialize)]
pub struct CanvasView {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub selected_node: Option<String>,
    pub selected_edge: Option<String>,
    pub menu: Option<ContextMenu>,
    pub guides: Vec<GuideLine>,
    pub has_changes: bool,
}

/// Interaction state machine for one open canvas. Translates frontend
/// events into graph mutations, keeping selection, drag and connection
/// gestures, the context menu and the dirty flag coherent.
#[derive(Debug)]
pub struct Controller {
    graph: Graph,
    viewport: Viewport,
    bounds: PaneBounds,
    gesture: Gesture,
    selected_node: Option<String>,
    selected_edge: Option<String>,
    menu: Option<ContextMenu>,
    guides: Vec<GuideLine>,
    has_changes: bool,
    revision: u64,
}

impl Controller {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            viewport: Viewport::default(),
            bounds: PaneBounds::default(),
            gesture: Gesture::Idle,
            selected_node: None,
            selected_edge: None,
            menu: None,
            guides: Vec::new(),
            has_changes: false,
            revision: 0,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    pub fn set_has_changes(&mut self, dirty: bool) {
        self.has_changes = dirty;
    }

    /// Bumped on every graph mutation. The save path captures it with a
    /// snapshot to spot edits that landed while the write was in flight.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn mutated(&mut self) -> Applied {
        self.has_changes = true;
        self.revision += 1;
        Applied::Mutated
    }

    pub fn view(&self) -> CanvasView {
        CanvasView {
            nodes: self.graph.nodes().to_vec(),
            edges: self.graph.edges().to_vec(),
            selected_node: self.selected_node.clone(),
            selected_edge: self.selected_edge.clone(),
            menu: self.menu.clone(),
            guides: self.guides.clone(),
            has_changes: self.has_changes,
        }
    }

    /// Side-panel edit of a node's label and/or config blob.
    pub fn update_node(&mut self, id: &str, label: Option<String>, data: Option<Value>) -> Applied {
        if self.graph.node(id).is_none() {
            return Applied::Ignored;
        }
        let mut touched = false;
        if let Some(label) = label {
            touched |= self.graph.set_node_label(id, label);
        }
        if let Some(data) = data {
            touched |= self.graph.set_node_data(id, data);
        }
        if touched {
            self.mutated()
        } else {
            Applied::Ignored
        }
    }

    pub fn apply(&mut self, input: CanvasInput) -> Applied {
        match input {
            CanvasInput::SetView {
                pan_x,
                pan_y,
                zoom,
                width,
                height,
            } => self.set_view(pan_x, pan_y, zoom, width, height),
            CanvasInput::PaletteDrop { kind, x, y } => self.palette_drop(&kind, x, y),
            CanvasInput::DragStart { node_id } => self.drag_start(node_id),
            CanvasInput::MoveNodes { moves } => self.move_nodes(moves),
            CanvasInput::DragEnd => self.drag_end(),
            CanvasInput::ConnectStart { source, handle } => self.connect_start(source, handle),
            CanvasInput::ConnectEnd { target } => self.connect_end(target),
            CanvasInput::NodeClick { node_id } => self.node_click(&node_id),
            CanvasInput::EdgeClick { edge_id } => self.edge_click(&edge_id),
            CanvasInput::CanvasClick => self.canvas_click(),
            CanvasInput::OpenNodeMenu { node_id, x, y } => self.open_node_menu(node_id, x, y),
            CanvasInput::DeleteNode { node_id } => self.delete_node(&node_id),
            CanvasInput::DeleteEdge { edge_id } => self.delete_edge(&edge_id),
            CanvasInput::Escape { editing_label } => self.escape(editing_label),
        }
    }

    fn set_view(&mut self, pan_x: f64, pan_y: f64, zoom: f64, width: f64, height: f64) -> Applied {
        let sane = pan_x.is_finite()
            && pan_y.is_finite()
            && zoom.is_finite()
            && zoom > 0.0
            && width.is_finite()
            && width >= 0.0
            && height.is_finite()
            && height >= 0.0;
        if !sane {
            return Applied::Ignored;
        }
        self.viewport = Viewport { pan_x, pan_y, zoom };
        self.bounds = PaneBounds { width, height };
        Applied::Interaction
    }

    fn palette_drop(&mut self, kind: &str, x: f64, y: f64) -> Applied {
        let Some(kind) = registry::parse_kind(kind) else {
            return Applied::Ignored;
        };
        if !x.is_finite() || !y.is_finite() {
            return Applied::Ignored;
        }
        let position = self.viewport.to_canvas(x, y);
        match self.graph.add_node(kind, position) {
            Some(id) => {
                tracing::debug!(node = %id, kind = ?kind, "node dropped");
                self.mutated()
            }
            None => Applied::Ignored,
        }
    }

    fn drag_start(&mut self, node_id: String) -> Applied {
        if self.graph.node(&node_id).is_none() {
            return Applied::Ignored;
        }
        self.gesture = Gesture::Dragging { node_id };
        self.guides.clear();
        Applied::Interaction
    }

    fn move_nodes(&mut self, moves: Vec<NodeMove>) -> Applied {
        // Guides only accompany a plain one-node drag. Any other change
        // set moves nodes verbatim and clears them.
        let single_drag = match (&self.gesture, moves.as_slice()) {
            (Gesture::Dragging { node_id }, [only]) => *node_id == only.node_id,
            _ => false,
        };
        self.guides.clear();

        let mut moved = false;
        if single_drag {
            let m = &moves[0];
            let snap = align::snap_position(&m.node_id, Position::new(m.x, m.y), self.graph.nodes());
            if self.graph.move_node(&m.node_id, snap.position) {
                self.guides = snap.guides;
                moved = true;
            }
        } else {
            for m in &moves {
                moved |= self.graph.move_node(&m.node_id, Position::new(m.x, m.y));
            }
        }

        if moved {
            self.mutated()
        } else {
            Applied::Ignored
        }
    }

    fn drag_end(&mut self) -> Applied {
        self.guides.clear();
        if matches!(self.gesture, Gesture::Dragging { .. }) {
            self.gesture = Gesture::Idle;
            Applied::Interaction
        } else {
            Applied::Ignored
        }
    }

    fn connect_start(&mut self, source: String, handle: Option<String>) -> Applied {
        if self.graph.node(&source).is_none() {
            return Applied::Ignored;
        }
        self.gesture = Gesture::Connecting { source, handle };
        Applied::Interaction
    }

    /// Finishing a connection always drops the gesture, whether or not
    /// the release point yields a valid edge. A stuck Connecting state
    /// would swallow every later pointer event.
    fn connect_end(&mut self, target: Option<String>) -> Applied {
        let Gesture::Connecting { source, handle } =
            std::mem::replace(&mut self.gesture, Gesture::Idle)
        else {
            return Applied::Ignored;
        };
        let Some(target) = target else {
            return Applied::Interaction;
        };
        match self.graph.connect(&source, handle, &target) {
            Ok(edge_id) => {
                tracing::debug!(edge = %edge_id, %source, %target, "edge connected");
                self.mutated()
            }
            Err(err) => {
                tracing::debug!(%source, %target, error = %err, "connection rejected");
                Applied::Interaction
            }
        }
    }

    fn node_click(&mut self, node_id: &str) -> Applied {
        let Some(node) = self.graph.node(node_id) else {
            return Applied::Ignored;
        };
        if node.kind == NodeKind::Entry {
            return Applied::Ignored;
        }
        self.selected_node = Some(node_id.to_string());
        self.selected_edge = None;
        self.menu = None;
        Applied::Interaction
    }

    fn edge_click(&mut self, edge_id: &str) -> Applied {
        if self.graph.edge(edge_id).is_none() {
            return Applied::Ignored;
        }
        self.selected_edge = Some(edge_id.to_string());
        self.selected_node = None;
        self.menu = None;
        Applied::Interaction
    }

    fn canvas_click(&mut self) -> Applied {
        if self.selected_node.is_none() && self.selected_edge.is_none() && self.menu.is_none() {
            return Applied::Ignored;
        }
        self.selected_node = None;
        self.selected_edge = None;
        self.menu = None;
        Applied::Interaction
    }

    fn open_node_menu(&mut self, node_id: String, x: f64, y: f64) -> Applied {
        let Some(node) = self.graph.node(&node_id) else {
            return Applied::Ignored;
        };
        if node.kind == NodeKind::Entry {
            return Applied::Ignored;
        }
        if !x.is_finite() || !y.is_finite() {
            return Applied::Ignored;
        }
        // Flip the anchor corner instead of letting the menu overflow the
        // pane on the right or bottom.
        let anchor_x = if x + MENU_WIDTH > self.bounds.width {
            x - MENU_WIDTH
        } else {
            x
        };
        let anchor_y = if y + MENU_HEIGHT > self.bounds.height {
            y - MENU_HEIGHT
        } else {
            y
        };
        self.menu = Some(ContextMenu {
            node_id,
            x: anchor_x,
            y: anchor_y,
        });
        Applied::Interaction
    }

    fn delete_node(&mut self, node_id: &str) -> Applied {
        if !self.graph.remove_node(node_id) {
            return Applied::Ignored;
        }
        if self.selected_node.as_deref() == Some(node_id) {
            self.selected_node = None;
        }
        if self.menu.as_ref().is_some_and(|m| m.node_id == node_id) {
            self.menu = None;
        }
        if matches!(&self.gesture, Gesture::Dragging { node_id: dragged } if dragged == node_id) {
            self.gesture = Gesture::Idle;
            self.guides.clear();
        }
        // The cascade may have taken the selected edge with it.
        let edge_gone = self
            .selected_edge
            .as_ref()
            .is_some_and(|id| self.graph.edge(id).is_none());
        if edge_gone {
            self.selected_edge = None;
        }
        self.mutated()
    }

    fn delete_edge(&mut self, edge_id: &str) -> Applied {
        if !self.graph.remove_edge(edge_id) {
            return Applied::Ignored;
        }
        if self.selected_edge.as_deref() == Some(edge_id) {
            self.selected_edge = None;
        }
        self.mutated()
    }

    fn escape(&mut self, editing_label: bool) -> Applied {
        // A label mid-edit owns the Escape key; its editor reverts the
        // text itself.
        if editing_label {
            return Applied::Ignored;
        }
        if self.selected_node.take().is_some() {
            Applied::Interaction
        } else {
            Applied::Ignored
        }
    }
}
