//! Request handlers
//!
//! Thin adapters: parse path parameters, call [`IncidentService`], map the
//! outcome through [`crate::reply`].
//!
//! [`IncidentService`]: safeline_core::IncidentService

use crate::reply;
use crate::state::AppState;
use safeline_core::{
    merge_provider_response, CreateOutcome, IncidentDraft, IncidentError, IncidentId, ShareRequest,
    UserId, NOT_REGISTERED_MESSAGE,
};
use serde::Deserialize;
use serde_json::Value;
use std::convert::Infallible;
use std::str::FromStr;
use warp::http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use warp::http::StatusCode;
use warp::reply::Response;

/// Query string of the video route
#[derive(Debug, Default, Deserialize)]
pub struct VideoQuery {
    pub token: Option<String>,
}

fn parse_incident_id(raw: &str) -> Result<IncidentId, IncidentError> {
    IncidentId::from_str(raw)
}

pub(crate) async fn create_incident(caller: UserId, body: Value, state: AppState) -> Result<Response, Infallible> {
    let draft = match IncidentDraft::from_json(body) {
        Ok(draft) => draft,
        Err(err) => return Ok(reply::from_error(&err)),
    };

    Ok(match state.service.create(&caller, draft).await {
        Ok(CreateOutcome::Delivered {
            incident,
            provider_response,
        }) => reply::data(
            &merge_provider_response(&provider_response, &incident),
            StatusCode::CREATED,
        ),
        Ok(CreateOutcome::Undelivered { incident }) => reply::data(&incident, StatusCode::OK),
        Ok(CreateOutcome::NotRegistered) => reply::error(NOT_REGISTERED_MESSAGE, StatusCode::OK),
        Err(err) => reply::from_error(&err),
    })
}

pub(crate) async fn list_incidents(user_id: String, caller: UserId, state: AppState) -> Result<Response, Infallible> {
    let outcome = state.service.list_incidents(&caller, &UserId::new(user_id)).await;
    Ok(reply::result(outcome, StatusCode::OK))
}

pub(crate) async fn get_incident(
    user_id: String,
    incident_id: String,
    caller: UserId,
    state: AppState,
) -> Result<Response, Infallible> {
    let outcome = match parse_incident_id(&incident_id) {
        Ok(id) => state.service.get_incident(&caller, &UserId::new(user_id), &id).await,
        Err(err) => Err(err),
    };
    Ok(reply::result(outcome, StatusCode::OK))
}

pub(crate) async fn delete_video(incident_id: String, caller: UserId, state: AppState) -> Result<Response, Infallible> {
    let outcome = match parse_incident_id(&incident_id) {
        Ok(id) => state.service.delete_video(&caller, &id).await,
        Err(err) => Err(err),
    };
    Ok(reply::result(outcome, StatusCode::OK))
}

pub(crate) async fn create_share(
    incident_id: String,
    caller: UserId,
    request: ShareRequest,
    state: AppState,
) -> Result<Response, Infallible> {
    let outcome = match parse_incident_id(&incident_id) {
        Ok(id) => state.service.create_share(&caller, &id, request).await,
        Err(err) => Err(err),
    };
    Ok(reply::result(outcome, StatusCode::CREATED))
}

pub(crate) async fn list_shares(user_id: String, caller: UserId, state: AppState) -> Result<Response, Infallible> {
    let outcome = state.service.list_shares(&caller, &UserId::new(user_id)).await;
    Ok(reply::result(outcome, StatusCode::OK))
}

pub(crate) async fn video_token(caller: UserId, state: AppState) -> Result<Response, Infallible> {
    let issued = state.service.issue_video_token(&caller);
    tracing::debug!("Issued video token for {} until {}", caller, issued.expires_at);
    Ok(reply::data(&issued, StatusCode::OK))
}

pub(crate) async fn open_video(filename: String, query: VideoQuery, state: AppState) -> Result<Response, Infallible> {
    let payload = match state.service.open_video(query.token.as_deref(), &filename).await {
        Ok(payload) => payload,
        Err(err) => return Ok(reply::from_error(&err)),
    };

    let length = payload.bytes.len();
    let mut response = Response::new(payload.bytes.into());
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(payload.content_type));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    Ok(response)
}
