//! Response envelope and error mapping
//!
//! Every JSON body is either `{"data": ...}` or `{"error": "..."}`.

use safeline_core::{IncidentError, TokenError};
use serde::Serialize;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Reply;

const INTERNAL_MESSAGE: &str = "Something went wrong. Please try again later.";

#[derive(Serialize)]
struct Data<'a, T: Serialize> {
    data: &'a T,
}

#[derive(Serialize)]
struct Failure<'a> {
    error: &'a str,
}

/// `{"data": value}` with `status`
pub fn data<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(&Data { data: value }), status).into_response()
}

/// `{"error": message}` with `status`
#[must_use]
pub fn error(message: &str, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(&Failure { error: message }), status).into_response()
}

/// HTTP status for a lifecycle error
#[must_use]
pub fn status_for(err: &IncidentError) -> StatusCode {
    match err {
        IncidentError::Validation(_) => StatusCode::BAD_REQUEST,
        IncidentError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        IncidentError::Forbidden(_) | IncidentError::Token(_) => StatusCode::FORBIDDEN,
        IncidentError::NotFound(_) => StatusCode::NOT_FOUND,
        IncidentError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error response; upstream details are logged, never returned
#[must_use]
pub fn from_error(err: &IncidentError) -> Response {
    let status = status_for(err);
    match err {
        IncidentError::Upstream(detail) => {
            tracing::error!("Request failed upstream: {}", detail);
            error(INTERNAL_MESSAGE, status)
        }
        IncidentError::Token(TokenError::Expired) => error("Video link expired.", status),
        IncidentError::Token(TokenError::Invalid) => error("Invalid video token.", status),
        IncidentError::Validation(message)
        | IncidentError::Unauthorized(message)
        | IncidentError::Forbidden(message)
        | IncidentError::NotFound(message) => error(message, status),
    }
}

/// Reply with `value` or the mapped error
pub fn result<T: Serialize>(outcome: Result<T, IncidentError>, status: StatusCode) -> Response {
    match outcome {
        Ok(value) => data(&value, status),
        Err(err) => from_error(&err),
    }
}
