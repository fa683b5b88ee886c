//! HTTP routes
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | POST | `/incidents` | bearer |
//! | GET | `/incidents/{userId}` | bearer |
//! | GET | `/incidents/{userId}/{incidentId}` | bearer |
//! | GET | `/incidents/video/token` | bearer |
//! | GET | `/incidents/video/shares/{userId}` | bearer |
//! | POST | `/incidents/video/shares/{incidentId}` | bearer |
//! | DELETE | `/incidents/video/{incidentId}` | bearer |
//! | GET | `/incidents/video/{filename}?token=` | video token |
//!
//! Literal segments are matched before parameters, so `token` and `shares`
//! never reach the filename route.

use crate::auth::Authenticator;
use crate::handlers::{self, VideoQuery};
use crate::reply;
use crate::state::AppState;
use safeline_core::UserId;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// Request carried no recognised credential
#[derive(Debug)]
pub struct Unauthenticated;

impl warp::reject::Reject for Unauthenticated {}

/// The full API, with rejections turned into envelope responses
pub fn api(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let auth = authenticated(state.auth.clone());
    let limit = state.max_body_bytes;

    let video_token = warp::path!("incidents" / "video" / "token")
        .and(warp::get())
        .and(auth.clone())
        .and(with_state(state.clone()))
        .and_then(handlers::video_token);

    let list_shares = warp::path!("incidents" / "video" / "shares" / String)
        .and(warp::get())
        .and(auth.clone())
        .and(with_state(state.clone()))
        .and_then(handlers::list_shares);

    let create_share = warp::path!("incidents" / "video" / "shares" / String)
        .and(warp::post())
        .and(auth.clone())
        .and(json_body(limit))
        .and(with_state(state.clone()))
        .and_then(handlers::create_share);

    let open_video = warp::get()
        .and(video_filename())
        .and(warp::query::<VideoQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::open_video);

    let delete_video = warp::path!("incidents" / "video" / String)
        .and(warp::delete())
        .and(auth.clone())
        .and(with_state(state.clone()))
        .and_then(handlers::delete_video);

    let create = warp::path!("incidents")
        .and(warp::post())
        .and(auth.clone())
        .and(json_body(limit))
        .and(with_state(state.clone()))
        .and_then(handlers::create_incident);

    let get_one = warp::path!("incidents" / String / String)
        .and(warp::get())
        .and(auth.clone())
        .and(with_state(state.clone()))
        .and_then(handlers::get_incident);

    let list = warp::path!("incidents" / String)
        .and(warp::get())
        .and(auth)
        .and(with_state(state))
        .and_then(handlers::list_incidents);

    video_token
        .or(list_shares)
        .or(create_share)
        .or(open_video)
        .or(delete_video)
        .or(create)
        .or(get_one)
        .or(list)
        .recover(handle_rejection)
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn authenticated(auth: Arc<dyn Authenticator>) -> impl Filter<Extract = (UserId,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let auth = auth.clone();
        async move {
            auth.authenticate(header.as_deref())
                .await
                .ok_or_else(|| warp::reject::custom(Unauthenticated))
        }
    })
}

fn json_body<T: DeserializeOwned + Send>(limit: u64) -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(limit).and(warp::body::json())
}

fn video_filename() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::path!("incidents" / "video" / String).and_then(|filename: String| async move {
        if filename == "token" || filename == "shares" {
            Err(warp::reject::not_found())
        } else {
            Ok(filename)
        }
    })
}

/// Turn filter rejections into envelope responses
pub async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let response = if rejection.is_not_found() {
        reply::error("Not found.", StatusCode::NOT_FOUND)
    } else if rejection.find::<Unauthenticated>().is_some() {
        reply::error("Authentication required.", StatusCode::UNAUTHORIZED)
    } else if let Some(e) = rejection.find::<warp::body::BodyDeserializeError>() {
        reply::error(&format!("invalid request body: {e}"), StatusCode::BAD_REQUEST)
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        reply::error("Request body too large.", StatusCode::PAYLOAD_TOO_LARGE)
    } else if rejection.find::<warp::reject::LengthRequired>().is_some() {
        reply::error("Content-Length required.", StatusCode::LENGTH_REQUIRED)
    } else if rejection.find::<warp::reject::UnsupportedMediaType>().is_some() {
        reply::error("Expected a JSON body.", StatusCode::UNSUPPORTED_MEDIA_TYPE)
    } else if rejection.find::<warp::reject::InvalidQuery>().is_some() {
        reply::error("Invalid query string.", StatusCode::BAD_REQUEST)
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        reply::error("Method not allowed.", StatusCode::METHOD_NOT_ALLOWED)
    } else {
        tracing::error!("Unhandled rejection: {:?}", rejection);
        reply::error("Something went wrong. Please try again later.", StatusCode::INTERNAL_SERVER_ERROR)
    };
    Ok(response)
}
