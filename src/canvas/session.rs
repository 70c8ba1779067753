use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;

use super::controller::{Applied, CanvasInput, CanvasView, Controller};
use super::events::{CanvasEvent, CanvasEventType};
use super::overlay::{CLEAR_AFTER, ExecutionOverlay};
use super::persist::{self, FlowData};

/// One agent's open canvas: the interaction controller, the run
/// highlight and the pending auto-clear timer.
pub struct EditorSession {
    agent_id: String,
    controller: Controller,
    overlay: ExecutionOverlay,
    clear_task: Option<JoinHandle<()>>,
    events_tx: Option<broadcast::Sender<CanvasEvent>>,
}

impl EditorSession {
    fn emit(&self, event_type: CanvasEventType, node_id: Option<String>) {
        if let Some(tx) = &self.events_tx {
            let _ = tx.send(CanvasEvent {
                agent_id: self.agent_id.clone(),
                timestamp: Utc::now(),
                node_id,
                event_type,
            });
        }
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        if let Some(handle) = self.clear_task.take() {
            handle.abort();
        }
    }
}

/// Cloneable handle to a shared session. The highlight timer re-enters
/// through the same lock, so everything the frontend sees comes from one
/// serialized sequence of edits.
#[derive(Clone)]
pub struct EditorHandle {
    inner: Arc<RwLock<EditorSession>>,
}

impl EditorHandle {
    pub fn open(
        agent_id: String,
        flow: FlowData,
        events_tx: Option<broadcast::Sender<CanvasEvent>>,
    ) -> Self {
        let controller = Controller::new(persist::from_persisted(flow));
        Self {
            inner: Arc::new(RwLock::new(EditorSession {
                agent_id,
                controller,
                overlay: ExecutionOverlay::default(),
                clear_task: None,
                events_tx,
            })),
        }
    }

    pub async fn view(&self) -> CanvasView {
        self.inner.read().await.controller.view()
    }

    pub async fn apply(&self, input: CanvasInput) -> Applied {
        self.inner.write().await.controller.apply(input)
    }

    pub async fn update_node(
        &self,
        node_id: &str,
        label: Option<String>,
        data: Option<serde_json::Value>,
    ) -> Applied {
        self.inner
            .write()
            .await
            .controller
            .update_node(node_id, label, data)
    }

    /// Current drawing in its stored shape plus the revision it was
    /// taken at, for the save path.
    pub async fn snapshot(&self) -> (FlowData, u64) {
        let guard = self.inner.read().await;
        (
            persist::to_persisted(guard.controller.graph()),
            guard.controller.revision(),
        )
    }

    /// Called once the snapshot taken at `revision` has been written
    /// out. The dirty flag only clears when no edit landed since; a
    /// drawing that moved on during the write stays dirty.
    pub async fn mark_saved(&self, revision: u64) {
        let mut guard = self.inner.write().await;
        if guard.controller.revision() == revision {
            guard.controller.set_has_changes(false);
        }
        guard.emit(CanvasEventType::Saved, None);
    }

    /// Highlights a node as executing and schedules the auto-clear.
    /// Re-marking restarts the window; the previous timer is cancelled
    /// and its epoch is dead anyway. An unknown node changes nothing:
    /// the current highlight and its timer keep running.
    pub async fn mark_executing(&self, node_id: &str) -> bool {
        let mut guard = self.inner.write().await;
        let session = &mut *guard;
        let Some(epoch) = session.overlay.mark(session.controller.graph_mut(), node_id) else {
            return false;
        };
        if let Some(handle) = session.clear_task.take() {
            handle.abort();
        }
        session.emit(CanvasEventType::NodeExecuting, Some(node_id.to_string()));

        let inner = Arc::clone(&self.inner);
        session.clear_task = Some(tokio::spawn(async move {
            tokio::time::sleep(CLEAR_AFTER).await;
            let mut guard = inner.write().await;
            let session = &mut *guard;
            if session
                .overlay
                .clear_if_current(session.controller.graph_mut(), epoch)
            {
                session.clear_task = None;
                session.emit(CanvasEventType::ExecutionCleared, None);
            }
        }));
        true
    }

    pub async fn clear_executing(&self) {
        let mut guard = self.inner.write().await;
        let session = &mut *guard;
        if let Some(handle) = session.clear_task.take() {
            handle.abort();
        }
        let was_set = session.overlay.current().is_some();
        session.overlay.clear(session.controller.graph_mut());
        if was_set {
            session.emit(CanvasEventType::ExecutionCleared, None);
        }
    }

    /// Tears the session down. The timer must not outlive the editor.
    pub async fn close(&self) {
        let mut guard = self.inner.write().await;
        if let Some(handle) = guard.clear_task.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn open_default() -> EditorHandle {
        EditorHandle::open("agent-1".to_string(), FlowData::default(), None)
    }

    async fn entry_id(handle: &EditorHandle) -> String {
        handle.view().await.nodes[0].id.clone()
    }

    async fn executing(handle: &EditorHandle) -> Option<String> {
        handle
            .view()
            .await
            .nodes
            .iter()
            .find(|n| n.is_executing)
            .map(|n| n.id.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn test_highlight_auto_clears_after_window() {
        let handle = open_default();
        let entry = entry_id(&handle).await;

        assert!(handle.mark_executing(&entry).await);
        assert_eq!(executing(&handle).await, Some(entry));

        tokio::time::sleep(CLEAR_AFTER + Duration::from_millis(50)).await;
        assert_eq!(executing(&handle).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remark_restarts_window() {
        let handle = open_default();
        let entry = entry_id(&handle).await;

        handle.mark_executing(&entry).await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        handle.mark_executing(&entry).await;

        // Six seconds after the first mark, three after the second.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(executing(&handle).await, Some(entry));

        tokio::time::sleep(CLEAR_AFTER).await;
        assert_eq!(executing(&handle).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_clear_cancels_timer() {
        let handle = open_default();
        let entry = entry_id(&handle).await;

        handle.mark_executing(&entry).await;
        handle.clear_executing().await;
        assert_eq!(executing(&handle).await, None);
        assert!(handle.inner.read().await.clear_task.is_none());

        tokio::time::sleep(CLEAR_AFTER * 2).await;
        assert_eq!(executing(&handle).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_unknown_node_keeps_current_highlight() {
        let (tx, mut rx) = broadcast::channel(16);
        let handle = EditorHandle::open("agent-1".to_string(), FlowData::default(), Some(tx));
        let entry = entry_id(&handle).await;

        handle.mark_executing(&entry).await;
        assert_eq!(
            rx.recv().await.unwrap().event_type,
            CanvasEventType::NodeExecuting
        );

        // A bogus id is refused without touching the highlight, its
        // timer, or the event stream.
        assert!(!handle.mark_executing("ghost").await);
        assert_eq!(executing(&handle).await, Some(entry.clone()));
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(CLEAR_AFTER + Duration::from_millis(50)).await;
        assert_eq!(executing(&handle).await, None);
        assert_eq!(
            rx.recv().await.unwrap().event_type,
            CanvasEventType::ExecutionCleared
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_emitted_for_highlight_cycle() {
        let (tx, mut rx) = broadcast::channel(16);
        let handle = EditorHandle::open("agent-1".to_string(), FlowData::default(), Some(tx));
        let entry = entry_id(&handle).await;

        handle.mark_executing(&entry).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, CanvasEventType::NodeExecuting);
        assert_eq!(event.node_id.as_deref(), Some(entry.as_str()));
        assert_eq!(event.agent_id, "agent-1");

        tokio::time::sleep(CLEAR_AFTER + Duration::from_millis(50)).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, CanvasEventType::ExecutionCleared);
        assert!(event.node_id.is_none());
    }

    #[tokio::test]
    async fn test_save_cycle_resets_dirty_flag() {
        let (tx, mut rx) = broadcast::channel(16);
        let handle = EditorHandle::open("agent-1".to_string(), FlowData::default(), Some(tx));

        handle
            .apply(CanvasInput::PaletteDrop {
                kind: "message".to_string(),
                x: 400.0,
                y: 300.0,
            })
            .await;
        assert!(handle.view().await.has_changes);

        let (snapshot, revision) = handle.snapshot().await;
        assert_eq!(snapshot.nodes.len(), 2);
        handle.mark_saved(revision).await;
        assert!(!handle.view().await.has_changes);
        assert_eq!(rx.recv().await.unwrap().event_type, CanvasEventType::Saved);
    }

    #[tokio::test]
    async fn test_edit_during_save_keeps_dirty_flag() {
        let handle = open_default();
        handle
            .apply(CanvasInput::PaletteDrop {
                kind: "message".to_string(),
                x: 400.0,
                y: 300.0,
            })
            .await;
        let (_, revision) = handle.snapshot().await;

        // Another edit lands while the snapshot is being written out.
        handle
            .apply(CanvasInput::PaletteDrop {
                kind: "delay".to_string(),
                x: 500.0,
                y: 400.0,
            })
            .await;
        handle.mark_saved(revision).await;
        assert!(handle.view().await.has_changes);

        // The next save picks the late edit up and settles the flag.
        let (snapshot, revision) = handle.snapshot().await;
        assert_eq!(snapshot.nodes.len(), 3);
        handle.mark_saved(revision).await;
        assert!(!handle.view().await.has_changes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_aborts_pending_timer() {
        let handle = open_default();
        let entry = entry_id(&handle).await;
        handle.mark_executing(&entry).await;
        handle.close().await;

        tokio::time::sleep(CLEAR_AFTER * 2).await;
        // The timer was aborted; the flag stays because nothing cleared it.
        assert_eq!(executing(&handle).await, Some(entry));
    }

    #[tokio::test]
    async fn test_open_hydrates_stored_flow() {
        let mut graph = crate::canvas::graph::Graph::with_entry();
        let entry = graph.entry().unwrap().id.clone();
        let agent = graph
            .add_node(
                crate::canvas::NodeKind::AgentCall,
                crate::canvas::Position::new(300.0, 100.0),
            )
            .unwrap();
        graph.connect(&entry, None, &agent).unwrap();
        let stored = persist::to_persisted(&graph);

        let handle = EditorHandle::open("agent-1".to_string(), stored, None);
        let view = handle.view().await;
        assert_eq!(view.nodes.len(), 2);
        assert_eq!(view.edges.len(), 1);
        assert!(!view.has_changes);
    }
}
