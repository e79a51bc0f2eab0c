use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use identity_cell::services::IdentityService;
use shared_config::AppConfig;
use shared_models::auth::Principal;
use shared_models::error::AppError;

use crate::models::{CreateAllergyRequest, CreateMedicalHistoryRequest};
use crate::services::RecordsService;

#[axum::debug_handler]
pub async fn list_medical_history(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let actor = IdentityService::new(&config).resolve(&principal.id, token).await?;

    let records = RecordsService::new(&config)
        .list_history(actor.id, token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(records)))
}

#[axum::debug_handler]
pub async fn add_medical_history(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateMedicalHistoryRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let actor = IdentityService::new(&config).resolve(&principal.id, token).await?;

    if request.condition.trim().is_empty() {
        return Err(AppError::BadRequest("A condition is required".to_string()));
    }

    let record = RecordsService::new(&config)
        .add_history(actor.id, request, token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(record)))
}

#[axum::debug_handler]
pub async fn list_allergies(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let actor = IdentityService::new(&config).resolve(&principal.id, token).await?;

    let records = RecordsService::new(&config)
        .list_allergies(actor.id, token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(records)))
}

#[axum::debug_handler]
pub async fn add_allergy(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateAllergyRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let actor = IdentityService::new(&config).resolve(&principal.id, token).await?;

    if request.substance.trim().is_empty() {
        return Err(AppError::BadRequest("A substance is required".to_string()));
    }

    let record = RecordsService::new(&config)
        .add_allergy(actor.id, request, token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(record)))
}
