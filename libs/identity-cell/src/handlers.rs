use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::Principal;
use shared_models::error::AppError;

use crate::services::IdentityService;

#[axum::debug_handler]
pub async fn get_me(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let service = IdentityService::new(&config);

    let user = service.resolve(&principal.id, auth.token()).await?;

    Ok(Json(json!(user)))
}
