//! Application setup and server configuration.

use std::time::Duration;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::EngineDeps;
use crate::server::routes::{
    accept_request_handler, cancel_handler, checklist_handler, complete_handler,
    create_booking_handler, en_route_handler, force_cancel_handler, get_booking_handler,
    health_handler, list_requests_handler, payment_handler, reject_request_handler, start_handler,
    stream_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub deps: EngineDeps,
}

/// Build the Axum application router.
///
/// All command routes are JSON-in/JSON-out with the actor identity in
/// gateway headers; `/api/streams/:topic` serves SSE.
pub fn build_app(deps: EngineDeps) -> Router {
    let app_state = AxumAppState { deps };

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            axum::http::HeaderName::from_static("x-actor-id"),
            axum::http::HeaderName::from_static("x-actor-role"),
        ]);

    // Command routes get a request timeout; the SSE route must stay open
    let commands = Router::new()
        .route("/api/bookings", post(create_booking_handler))
        .route("/api/bookings/:id", get(get_booking_handler))
        .route("/api/bookings/:id/en-route", post(en_route_handler))
        .route("/api/bookings/:id/start", post(start_handler))
        .route("/api/bookings/:id/complete", post(complete_handler))
        .route("/api/bookings/:id/cancel", post(cancel_handler))
        .route("/api/bookings/:id/force-cancel", post(force_cancel_handler))
        .route("/api/bookings/:id/checklist", patch(checklist_handler))
        .route("/api/bookings/:id/payment", post(payment_handler))
        .route("/api/bookings/:id/requests", get(list_requests_handler))
        .route("/api/requests/:id/accept", post(accept_request_handler))
        .route("/api/requests/:id/reject", post(reject_request_handler))
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    Router::new()
        .merge(commands)
        .route("/api/streams/:topic", get(stream_handler))
        .route("/health", get(health_handler))
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
