use ::std::net::IpAddr;
use axum::{
    middleware::Next,
    extract::State,
    http::Request,
    response::Response,
    body::Body,
};
use common_types::Ip::try_fetch_client_ip;

use crate::State::AppState;

#[derive(Clone, Debug)]
pub struct RequestDescription {
    // None when no forwarding header carried a usable address
    pub ip: Option<IpAddr>,
}

#[tracing::instrument(skip(appstate, req, next))]
pub async fn middleware(State(appstate): State<AppState>, req: Request<Body>, next: Next<Body>) -> Response {
    let (parts, body) = req.into_parts();
    // Attempt to find client IP from headers
    let ip = try_fetch_client_ip(&parts.headers, appstate.development_mode);
    if ip.is_none() {
        tracing::debug!("No client IP found in request headers");
    }
    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(RequestDescription {
        ip,
    });
    // Call handler
    next.run(req).await
}
