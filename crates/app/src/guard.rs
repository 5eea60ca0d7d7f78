//! Validators that run ahead of a handler.
//!
//! Each guard either hands back what it checked (`Ok`) so the handler can go
//! on, or a terminal [`Rejection`]. Handlers call them in route order with `?`.

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use metrics::counter;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use webapi_core::{
    validate_action, Action, ActionPayload, NewAction, NewProject, Project, ProjectPayload,
    ValidationError,
};

use crate::rejection::{Rejection, RejectionBody};
use crate::router::AppState;

pub const INVALID_PROJECT_ID: &str = "invalid project id";
pub const INVALID_ACTION_ID: &str = "invalid action id";
pub const PROJECT_LOOKUP_FAILED: &str = "The project information could not be retrieved.";
pub const ACTION_LOOKUP_FAILED: &str = "The action information could not be retrieved.";

/// Action body that passed every check, with the body as the client sent it.
#[derive(Debug)]
pub struct ValidatedAction {
    pub action: NewAction,
    pub body: Value,
}

/// Resolves the `:id` path segment to an existing project.
pub async fn project_exists(state: &AppState, raw_id: &str) -> Result<Project, Rejection> {
    match parse_id(raw_id) {
        Some(id) => lookup_project(state, id).await,
        None => Err(not_found("invalid_project_id", INVALID_PROJECT_ID)),
    }
}

/// Resolves the `:action_id` path segment to an existing action.
pub async fn action_exists(state: &AppState, raw_id: &str) -> Result<Action, Rejection> {
    let Some(id) = parse_id(raw_id) else {
        return Err(not_found("invalid_action_id", INVALID_ACTION_ID));
    };

    match state.storage().actions().get(id).await {
        Ok(Some(action)) => Ok(action),
        Ok(None) => Err(not_found("invalid_action_id", INVALID_ACTION_ID)),
        Err(err) => Err(Rejection::storage("action", &err, ACTION_LOOKUP_FAILED)),
    }
}

/// Requires a project body with a non-empty `name` and `description`.
///
/// A body that is not a JSON object counts as missing both.
pub fn project_body(payload: Result<Json<Value>, JsonRejection>) -> Result<NewProject, Rejection> {
    let payload = match payload {
        Ok(Json(value)) if value.is_object() => {
            ProjectPayload::deserialize(&value).unwrap_or_default()
        }
        Ok(Json(_)) => {
            debug!(stage = "validation", "project body is not an object");
            ProjectPayload::default()
        }
        Err(err) => {
            debug!(stage = "validation", error = %err, "unreadable project body");
            ProjectPayload::default()
        }
    };

    payload.validate().map_err(|err| {
        invalid_shape(err, |message| {
            Rejection::new(StatusCode::BAD_REQUEST, RejectionBody::ErrorMessage(message))
        })
    })
}

/// Checks the project named by the body's `project_id`, then the action fields
/// in order.
///
/// Only a JSON object counts as a body. Inside it, a field of the wrong type is
/// reported by that field's own check.
pub async fn action_body(
    state: &AppState,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<ValidatedAction, Rejection> {
    let body = match payload {
        Ok(Json(value)) => Some(value),
        Err(err) => {
            debug!(stage = "validation", error = %err, "unreadable action body");
            None
        }
    };
    let parsed = body
        .as_ref()
        .filter(|value| value.is_object())
        .and_then(|value| ActionPayload::deserialize(value).ok());

    match parsed.as_ref().and_then(|payload| payload.project_id) {
        Some(project_id) => {
            lookup_project(state, project_id).await?;
        }
        None => return Err(not_found("invalid_project_id", INVALID_PROJECT_ID)),
    }

    let action = validate_action(parsed)
        .map_err(|err| invalid_shape(err, |message| Rejection::bad_request(message)))?;

    Ok(ValidatedAction {
        action,
        body: body.unwrap_or(Value::Null),
    })
}

async fn lookup_project(state: &AppState, id: i64) -> Result<Project, Rejection> {
    match state.storage().projects().get(id).await {
        Ok(Some(project)) => Ok(project),
        Ok(None) => Err(not_found("invalid_project_id", INVALID_PROJECT_ID)),
        Err(err) => Err(Rejection::storage("project", &err, PROJECT_LOOKUP_FAILED)),
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

fn not_found(reason: &'static str, message: &str) -> Rejection {
    counter!("validation_rejections_total", "reason" => reason).increment(1);
    Rejection::bad_request(message)
}

fn invalid_shape(err: ValidationError, build: impl FnOnce(String) -> Rejection) -> Rejection {
    info!(stage = "validation", reason = err.reason(), "request body rejected");
    counter!("validation_rejections_total", "reason" => err.reason()).increment(1);
    build(err.to_string())
}
