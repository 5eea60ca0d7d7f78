use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::info;
use webapi_core::Action;

use crate::guard::{self, INVALID_ACTION_ID};
use crate::rejection::Rejection;
use crate::router::AppState;

const LIST_FAILED: &str = "The actions information could not be retrieved.";
const SAVE_FAILED: &str = "There was an error while saving the action to the database.";
const UPDATE_FAILED: &str = "The action information could not be modified.";
const REMOVE_FAILED: &str = "The action could not be removed.";

/// Read-only routes mounted under `/api/actions`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/:id", get(show))
}

/// POST /api/projects/actions
///
/// Answers with the body exactly as the client sent it.
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), Rejection> {
    let validated = guard::action_body(&state, payload).await?;

    let action = state
        .storage()
        .actions()
        .insert(&validated.action)
        .await
        .map_err(|err| Rejection::storage("action", &err, SAVE_FAILED))?;

    info!(stage = "app", action_id = action.id, project_id = action.project_id, "action created");
    Ok((StatusCode::CREATED, Json(validated.body)))
}

/// PUT /api/projects/actions/:action_id
pub async fn update(
    State(state): State<AppState>,
    Path(action_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Action>, Rejection> {
    let action = guard::action_exists(&state, &action_id).await?;
    let validated = guard::action_body(&state, payload).await?;

    state
        .storage()
        .actions()
        .update(action.id, &validated.action)
        .await
        .map_err(|err| Rejection::storage("action", &err, UPDATE_FAILED))?
        .map(Json)
        .ok_or_else(|| Rejection::bad_request(INVALID_ACTION_ID))
}

/// DELETE /api/projects/actions/:action_id
pub async fn remove(
    State(state): State<AppState>,
    Path(action_id): Path<String>,
) -> Result<Json<Value>, Rejection> {
    let action = guard::action_exists(&state, &action_id).await?;

    let removed = state
        .storage()
        .actions()
        .remove(action.id)
        .await
        .map_err(|err| Rejection::storage("action", &err, REMOVE_FAILED))?;
    if removed == 0 {
        return Err(Rejection::bad_request(INVALID_ACTION_ID));
    }

    info!(stage = "app", action_id = action.id, "action removed");
    Ok(Json(json!({
        "message": format!("Action {} was deleted successfully.", action.id)
    })))
}

/// GET /api/actions
async fn list(State(state): State<AppState>) -> Result<Json<Vec<Action>>, Rejection> {
    state
        .storage()
        .actions()
        .list()
        .await
        .map(Json)
        .map_err(|err| Rejection::storage("action", &err, LIST_FAILED))
}

/// GET /api/actions/:id
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Action>, Rejection> {
    guard::action_exists(&state, &id).await.map(Json)
}
