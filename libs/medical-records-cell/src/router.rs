use std::sync::Arc;

use axum::{
    middleware,
    routing::get,
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn records_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/medical-history",
            get(handlers::list_medical_history).post(handlers::add_medical_history),
        )
        .route(
            "/allergies",
            get(handlers::list_allergies).post(handlers::add_allergy),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
