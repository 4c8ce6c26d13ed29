use axum::{
    routing,
    Router,
    middleware as axum_middleware,
};
use tower::ServiceBuilder;

use crate::{
    Middleware::{request_describer, set_cors_headers},
    State::AppState,
};

pub mod contact;

// Both paths are served so the function works behind a bare function URL
// as well as behind an API gateway route
pub fn router(appstate: AppState) -> Router {
    let contact_routes = routing::post(contact::request)
        .options(contact::preflight)
        .fallback(contact::method_not_allowed);

    Router::new()
        .route("/", contact_routes.clone())
        .route("/contact", contact_routes)
        .layer(ServiceBuilder::new()
               .layer(axum_middleware::from_fn_with_state(appstate.clone(), set_cors_headers::middleware))
               .layer(axum_middleware::from_fn_with_state(appstate.clone(), request_describer::middleware))
        )
        .with_state(appstate)
}
