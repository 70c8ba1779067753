pub mod agents;
pub mod canvas;
pub mod middleware;
mod routes;

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use tokio::sync::{RwLock, broadcast};

use crate::agents::Agent;
use crate::agents::repository::AgentRepository;
use crate::canvas::events::CanvasEvent;
use crate::canvas::session::EditorHandle;

#[derive(Clone)]
pub struct AppState {
    pub agent_repo: Arc<dyn AgentRepository>,
    /// Open canvas editors keyed by agent id. One editor per agent; a
    /// second open returns the existing session.
    pub editors: Arc<RwLock<HashMap<String, EditorHandle>>>,
    pub events_tx: broadcast::Sender<CanvasEvent>,
}

impl AppState {
    pub async fn editor(&self, agent_id: &str) -> Option<EditorHandle> {
        self.editors.read().await.get(agent_id).cloned()
    }

    /// Returns the agent's open editor, hydrating one from the stored
    /// flow if none is open yet.
    pub async fn open_editor(&self, agent: &Agent) -> EditorHandle {
        let mut editors = self.editors.write().await;
        if let Some(handle) = editors.get(&agent.id) {
            return handle.clone();
        }
        tracing::info!(agent = %agent.id, "opening canvas editor");
        let handle = EditorHandle::open(
            agent.id.clone(),
            agent.flow.clone(),
            Some(self.events_tx.clone()),
        );
        editors.insert(agent.id.clone(), handle.clone());
        handle
    }

    /// Drops the agent's editor, discarding unsaved edits and stopping
    /// any highlight timer.
    pub async fn close_editor(&self, agent_id: &str) -> bool {
        let handle = self.editors.write().await.remove(agent_id);
        match handle {
            Some(handle) => {
                handle.close().await;
                tracing::info!(agent = %agent_id, "closed canvas editor");
                true
            }
            None => false,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    routes::build_router(state)
}
