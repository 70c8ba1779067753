use std::convert::Infallible;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post, put};
use futures::stream::Stream;
use hyper::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use crate::canvas::controller::CanvasInput;
use crate::canvas::registry;
use crate::canvas::session::EditorHandle;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/node-kinds", get(node_kinds))
        .route("/agents/{id}/canvas", get(open_canvas).delete(close_canvas))
        .route("/agents/{id}/canvas/input", post(canvas_input))
        .route(
            "/agents/{id}/canvas/nodes/{node_id}",
            put(update_canvas_node),
        )
        .route("/agents/{id}/canvas/save", post(save_canvas))
        .route("/agents/{id}/canvas/executing", post(set_executing))
        .route("/agents/{id}/canvas/events", get(stream_canvas_events))
}

pub(crate) async fn node_kinds() -> Json<Value> {
    Json(registry::palette())
}

/// Opens (or returns the already open) editor for an agent and renders
/// the current view. Reading is idempotent; edits live in the session
/// until an explicit save.
pub(crate) async fn open_canvas(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let agent = state.agent_repo.get(&id).await.ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "agent not found" })),
        )
    })?;

    let handle = state.open_editor(&agent).await;
    let view = handle.view().await;
    Ok(Json(json!({ "agent_id": id, "view": view })))
}

async fn editor_or_not_open(
    state: &AppState,
    id: &str,
) -> Result<EditorHandle, (StatusCode, Json<Value>)> {
    state.editor(id).await.ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "canvas not open" })),
        )
    })
}

pub(crate) async fn canvas_input(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CanvasInput>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let handle = editor_or_not_open(&state, &id).await?;
    let applied = handle.apply(input).await;
    let view = handle.view().await;
    Ok(Json(json!({ "applied": applied, "view": view })))
}

#[derive(Deserialize)]
pub(crate) struct UpdateNodeRequest {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// Side-panel write-back for the selected node's label and config blob.
pub(crate) async fn update_canvas_node(
    State(state): State<AppState>,
    Path((id, node_id)): Path<(String, String)>,
    Json(body): Json<UpdateNodeRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let handle = editor_or_not_open(&state, &id).await?;
    let known = handle
        .view()
        .await
        .nodes
        .iter()
        .any(|n| n.id == node_id);
    if !known {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "node not found" })),
        ));
    }

    let applied = handle.update_node(&node_id, body.label, body.data).await;
    let view = handle.view().await;
    Ok(Json(json!({ "applied": applied, "view": view })))
}

pub(crate) async fn save_canvas(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let handle = editor_or_not_open(&state, &id).await?;
    let (flow, revision) = handle.snapshot().await;
    let node_count = flow.nodes.len();
    let edge_count = flow.edges.len();

    match state.agent_repo.set_flow(&id, flow).await {
        Ok(true) => {}
        Ok(false) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "agent not found" })),
            ));
        }
        Err(e) => {
            tracing::error!(agent = %id, error = %e, "failed to persist canvas");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("failed to persist canvas: {e}") })),
            ));
        }
    }

    handle.mark_saved(revision).await;
    tracing::info!(agent = %id, nodes = node_count, edges = edge_count, "canvas saved");
    Ok(Json(json!({
        "status": "saved",
        "node_count": node_count,
        "edge_count": edge_count,
    })))
}

#[derive(Deserialize)]
pub(crate) struct ExecutingRequest {
    #[serde(default)]
    node_id: Option<String>,
}

/// The runner reports which node is active. A node id starts (or
/// restarts) the five second highlight, null clears it immediately.
pub(crate) async fn set_executing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ExecutingRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let handle = editor_or_not_open(&state, &id).await?;
    match body.node_id {
        Some(node_id) => {
            if handle.mark_executing(&node_id).await {
                Ok(Json(json!({ "executing": node_id })))
            } else {
                Err((
                    StatusCode::NOT_FOUND,
                    Json(json!({ "error": "node not found" })),
                ))
            }
        }
        None => {
            handle.clear_executing().await;
            Ok(Json(json!({ "executing": null })))
        }
    }
}

pub(crate) async fn stream_canvas_events(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.events_tx.subscribe();
    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if event.agent_id != agent_id {
                        continue;
                    }
                    let sse_event_name = event.event_type.as_sse_event();
                    let data = serde_json::to_string(&event).unwrap_or_default();
                    yield Ok(Event::default().event(sse_event_name).data(data));
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(agent_id = %agent_id, skipped = n, "SSE subscriber lagged");
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::new().interval(std::time::Duration::from_secs(15)))
}

pub(crate) async fn close_canvas(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if state.close_editor(&id).await {
        Ok(Json(json!({ "status": "closed" })))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "canvas not open" })),
        ))
    }
}
