use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn booking_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::get_booked_slots).post(handlers::create_booking),
        )
        .route(
            "/me",
            get(handlers::list_my_bookings).patch(handlers::update_my_booking),
        )
        .route(
            "/doctor",
            get(handlers::list_bookings_for_staff).patch(handlers::update_booking_status),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
