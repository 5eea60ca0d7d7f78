use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::Serialize;
use tracing::error;
use webapi_storage::RepositoryError;

/// JSON body of a terminal response. The variant picks the single key clients
/// read the text from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectionBody {
    Message(String),
    Error(String),
    ErrorMessage(String),
}

/// Terminal response produced by a guard or a failed persistence call.
#[derive(Debug)]
pub struct Rejection {
    status: StatusCode,
    body: RejectionBody,
}

impl Rejection {
    pub fn new(status: StatusCode, body: RejectionBody) -> Self {
        Self { status, body }
    }

    /// 400 with a `message` key.
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, RejectionBody::Message(message.into()))
    }

    /// 500 with an `error` key.
    pub fn internal<S: Into<String>>(error: S) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            RejectionBody::Error(error.into()),
        )
    }

    /// Logs a failed database call and turns it into a 500 with `message`.
    pub fn storage(entity: &'static str, err: &RepositoryError, message: &str) -> Self {
        error!(stage = "storage", entity, error = %err, "{}", message);
        counter!("storage_errors_total", "entity" => entity).increment(1);
        Self::internal(message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &RejectionBody {
        &self.body
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
