use serde::Serialize;

use super::{Node, Position};

/// Node cards render at a fixed size, so alignment works on known
/// geometry instead of measured DOM boxes.
pub const NODE_WIDTH: f64 = 220.0;
pub const NODE_HEIGHT: f64 = 88.0;

/// How close two candidate lines must be, in canvas units, before the
/// dragged node snaps onto the stationary one. Inclusive.
pub const SNAP_TOLERANCE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

/// A guide rendered across the canvas while a snap is active. Vertical
/// guides sit at an x coordinate, horizontal guides at a y coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GuideLine {
    pub orientation: Orientation,
    pub at: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapResult {
    pub position: Position,
    pub guides: Vec<GuideLine>,
}

fn x_candidates(x: f64) -> [f64; 3] {
    [x, x + NODE_WIDTH / 2.0, x + NODE_WIDTH]
}

fn y_candidates(y: f64) -> [f64; 3] {
    [y, y + NODE_HEIGHT / 2.0, y + NODE_HEIGHT]
}

/// Snaps a proposed drag position against every stationary node. The two
/// axes are resolved independently: candidate xs are the left, center and
/// right lines of each card, candidate ys the top, center and bottom
/// lines. The first candidate pair within tolerance wins for its axis,
/// scanning stationary nodes in graph order. A match on the x axis moves
/// the node onto the stationary line and reports a vertical guide there;
/// a y match does the same with a horizontal guide.
pub fn snap_position(dragged_id: &str, proposed: Position, nodes: &[Node]) -> SnapResult {
    let mut result = SnapResult {
        position: proposed,
        guides: Vec::new(),
    };
    if !proposed.x.is_finite() || !proposed.y.is_finite() {
        return result;
    }

    let drag_xs = x_candidates(proposed.x);
    let drag_ys = y_candidates(proposed.y);
    let mut snapped_x: Option<(f64, f64)> = None;
    let mut snapped_y: Option<(f64, f64)> = None;

    for other in nodes.iter().filter(|n| n.id != dragged_id) {
        if snapped_x.is_none() {
            'x: for drag in drag_xs {
                for stat in x_candidates(other.position.x) {
                    if (drag - stat).abs() <= SNAP_TOLERANCE {
                        snapped_x = Some((proposed.x + (stat - drag), stat));
                        break 'x;
                    }
                }
            }
        }
        if snapped_y.is_none() {
            'y: for drag in drag_ys {
                for stat in y_candidates(other.position.y) {
                    if (drag - stat).abs() <= SNAP_TOLERANCE {
                        snapped_y = Some((proposed.y + (stat - drag), stat));
                        break 'y;
                    }
                }
            }
        }
        if snapped_x.is_some() && snapped_y.is_some() {
            break;
        }
    }

    if let Some((x, guide_at)) = snapped_x {
        result.position.x = x;
        result.guides.push(GuideLine {
            orientation: Orientation::Vertical,
            at: guide_at,
        });
    }
    if let Some((y, guide_at)) = snapped_y {
        result.position.y = y;
        result.guides.push(GuideLine {
            orientation: Orientation::Horizontal,
            at: guide_at,
        });
    }
    result
}
