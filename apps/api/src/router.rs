use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};

use booking_cell::router::booking_routes;
use identity_cell::router::user_routes;
use medical_records_cell::router::records_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    let api = Router::new()
        .nest("/bookings", booking_routes(state.clone()))
        .nest("/users", user_routes(state.clone()))
        .merge(records_routes(state));

    Router::new()
        .route("/", get(|| async { "Hospital booking API is running!" }))
        .nest("/api", api)
}
