use std::time::Duration;

use super::graph::Graph;

/// How long a run highlight stays on a node before it clears itself.
pub const CLEAR_AFTER: Duration = Duration::from_secs(5);

/// Tracks which node the runner last reported as active. Every
/// successful mark bumps an epoch; the auto-clear timer captures the
/// epoch it was scheduled for and only wipes the marker while that epoch
/// is still current, so re-marking restarts the five second window
/// instead of being cut short by an older timer.
#[derive(Debug, Default)]
pub struct ExecutionOverlay {
    current: Option<String>,
    epoch: u64,
}

impl ExecutionOverlay {
    /// Points the marker at a node and mirrors it onto the node flags.
    /// Returns the epoch to schedule the auto-clear under. An unknown
    /// node changes nothing: the previous highlight stays as it was.
    pub fn mark(&mut self, graph: &mut Graph, node_id: &str) -> Option<u64> {
        if !graph.mark_executing(node_id) {
            return None;
        }
        self.current = Some(node_id.to_string());
        self.epoch += 1;
        Some(self.epoch)
    }

    pub fn clear(&mut self, graph: &mut Graph) {
        self.current = None;
        graph.clear_executing();
    }

    /// Clear on behalf of the timer scheduled at `epoch`. A stale epoch
    /// means a newer mark took over and this timer must not touch it.
    pub fn clear_if_current(&mut self, graph: &mut Graph, epoch: u64) -> bool {
        if self.epoch != epoch || self.current.is_none() {
            return false;
        }
        self.clear(graph);
        true
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }
}
