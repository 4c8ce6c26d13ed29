use axum::{
    middleware::Next,
    extract::State,
    http::{
        Request,
        header::{
            HeaderValue,
            ORIGIN,
            VARY,
            ACCESS_CONTROL_ALLOW_ORIGIN,
            ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS,
        }
    },
    response::Response,
    body::Body,
};

use crate::State::AppState;

pub const ALLOWED_METHODS: &str = "POST, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type";

// Applied to every response, errors and preflights included
#[tracing::instrument(skip(appstate, req, next))]
pub async fn middleware(State(appstate): State<AppState>, req: Request<Body>, next: Next<Body>) -> Response {
    let origin = req.headers()
        .get(ORIGIN)
        .and_then(|origin| origin.to_str().ok())
        .map(str::to_owned);
    let response = next.run(req).await;
    let (mut parts, body) = response.into_parts();

    let allowed_origin = appstate.cors.allow_origin(origin.as_deref());
    match HeaderValue::from_str(allowed_origin) {
        Ok(value) => {
            parts.headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        Err(err) => {
            tracing::error!("Failed to build Access-Control-Allow-Origin from {allowed_origin:?}, {err}");
        }
    }
    parts.headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
    parts.headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
    parts.headers.append(VARY, HeaderValue::from_static("Origin"));
    Response::from_parts(parts, body)
}
