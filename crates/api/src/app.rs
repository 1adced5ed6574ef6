use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use domain::{MeetupCore, MeetupStore};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{chat_webhooks, health};

#[derive(Clone)]
pub struct AppState<S: MeetupStore> {
    pub core: MeetupCore<S>,
    pub config: Arc<Config>,
}

pub fn create_app<S: MeetupStore>(config: Config, core: MeetupCore<S>) -> Router {
    let config = Arc::new(config);
    let state = AppState {
        core,
        config: config.clone(),
    };

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check::<S>))
        .route("/api/health/ready", get(health::ready::<S>))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Authenticated by the provider's body signature
    let webhook_routes = Router::new().route(
        "/api/v1/webhooks/chat",
        post(chat_webhooks::receive_chat_event::<S>),
    );

    Router::new()
        .merge(public_routes)
        .merge(webhook_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .with_state(state)
}
