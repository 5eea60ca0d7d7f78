use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::info;
use webapi_core::{Project, ProjectWithActions};

use crate::actions;
use crate::guard::{self, INVALID_PROJECT_ID};
use crate::rejection::Rejection;
use crate::router::AppState;

const LIST_FAILED: &str = "The projects information could not be retrieved.";
const SAVE_FAILED: &str = "There was an error while saving the project to the database.";
const UPDATE_FAILED: &str = "The project information could not be modified.";
const REMOVE_FAILED: &str = "The project could not be removed.";
const ACTIONS_FAILED: &str = "The actions for this project could not be retrieved.";
const NO_ACTIONS: &str = "This project doesn't have any actions yet.";

/// Routes mounted under `/api/projects`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/actions", post(actions::create))
        .route(
            "/actions/:action_id",
            put(actions::update).delete(actions::remove),
        )
        .route("/:id", get(show).put(update).delete(remove))
        .route("/:id/actions", get(project_actions))
}

/// POST /api/projects
async fn create(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, Rejection> {
    let new_project = guard::project_body(payload)?;

    let project = state
        .storage()
        .projects()
        .insert(&new_project)
        .await
        .map_err(|err| Rejection::storage("project", &err, SAVE_FAILED))?;

    info!(stage = "app", project_id = project.id, "project created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Project created successfully.",
            "project": project,
        })),
    )
        .into_response())
}

/// GET /api/projects
async fn list(State(state): State<AppState>) -> Result<Json<Vec<Project>>, Rejection> {
    state
        .storage()
        .projects()
        .list()
        .await
        .map(Json)
        .map_err(|err| Rejection::storage("project", &err, LIST_FAILED))
}

/// GET /api/projects/:id
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectWithActions>, Rejection> {
    let project = guard::project_exists(&state, &id).await?;

    let actions = state
        .storage()
        .projects()
        .project_actions(project.id)
        .await
        .map_err(|err| Rejection::storage("project", &err, guard::PROJECT_LOOKUP_FAILED))?;

    Ok(Json(ProjectWithActions { project, actions }))
}

/// GET /api/projects/:id/actions
async fn project_actions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, Rejection> {
    let project = guard::project_exists(&state, &id).await?;

    let actions = state
        .storage()
        .projects()
        .project_actions(project.id)
        .await
        .map_err(|err| Rejection::storage("action", &err, ACTIONS_FAILED))?;

    if actions.is_empty() {
        return Ok(Json(json!({ "message": NO_ACTIONS })).into_response());
    }
    Ok(Json(actions).into_response())
}

/// DELETE /api/projects/:id
async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, Rejection> {
    let project = guard::project_exists(&state, &id).await?;

    let removed = state
        .storage()
        .projects()
        .remove(project.id)
        .await
        .map_err(|err| Rejection::storage("project", &err, REMOVE_FAILED))?;
    if removed == 0 {
        return Err(Rejection::bad_request(INVALID_PROJECT_ID));
    }

    info!(stage = "app", project_id = project.id, "project removed");
    Ok(Json(json!({
        "message": format!("Project {} was deleted successfully.", project.id)
    })))
}

/// PUT /api/projects/:id
async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Project>, Rejection> {
    let project = guard::project_exists(&state, &id).await?;
    let changes = guard::project_body(payload)?;

    state
        .storage()
        .projects()
        .update(project.id, &changes)
        .await
        .map_err(|err| Rejection::storage("project", &err, UPDATE_FAILED))?
        .map(Json)
        .ok_or_else(|| Rejection::bad_request(INVALID_PROJECT_ID))
}
