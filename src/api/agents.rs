use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::get;
use hyper::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use crate::agents::Agent;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/agents", get(list_agents).post(create_agent))
        .route(
            "/agents/{id}",
            get(get_agent).put(update_agent).delete(delete_agent),
        )
}

pub(crate) async fn list_agents(State(state): State<AppState>) -> Json<Value> {
    let agents = state.agent_repo.list().await;

    let summaries: Vec<Value> = agents
        .iter()
        .map(|a| {
            json!({
                "id": a.id,
                "name": a.name,
                "description": a.description,
                "node_count": a.flow.nodes.len(),
                "edge_count": a.flow.edges.len(),
                "created_at": a.created_at,
                "updated_at": a.updated_at,
            })
        })
        .collect();

    Json(json!({ "agents": summaries }))
}

pub(crate) async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let agent = state.agent_repo.get(&id).await.ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "agent not found" })),
        )
    })?;

    Ok(Json(serde_json::to_value(&agent).unwrap_or_default()))
}

#[derive(Deserialize)]
pub(crate) struct CreateAgentRequest {
    name: String,
    #[serde(default)]
    description: String,
}

pub(crate) async fn create_agent(
    State(state): State<AppState>,
    Json(body): Json<CreateAgentRequest>,
) -> (StatusCode, Json<Value>) {
    let agent = Agent::new(body.name, body.description);
    let id = agent.id.clone();
    if let Err(e) = state.agent_repo.save(agent).await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("failed to save agent: {e}") })),
        );
    }

    (StatusCode::CREATED, Json(json!({ "id": id })))
}

#[derive(Deserialize)]
pub(crate) struct UpdateAgentRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

pub(crate) async fn update_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateAgentRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut agent = state.agent_repo.get(&id).await.ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "agent not found" })),
        )
    })?;

    if let Some(name) = body.name {
        agent.name = name;
    }
    if let Some(description) = body.description {
        agent.description = description;
    }
    agent.updated_at = chrono::Utc::now();

    if let Err(e) = state.agent_repo.save(agent.clone()).await {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("failed to save agent: {e}") })),
        ));
    }

    Ok(Json(serde_json::to_value(&agent).unwrap_or_default()))
}

pub(crate) async fn delete_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    // An open editor for the agent goes with it.
    state.close_editor(&id).await;

    match state.agent_repo.delete(&id).await {
        Ok(true) => Ok(Json(json!({ "status": "deleted" }))),
        Ok(false) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "agent not found" })),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("failed to delete agent: {e}") })),
        )),
    }
}
