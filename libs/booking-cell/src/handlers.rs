use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use identity_cell::models::UserRecord;
use identity_cell::services::IdentityService;
use shared_config::AppConfig;
use shared_models::auth::Principal;
use shared_models::error::AppError;

use crate::models::{BookingError, CreateBookingRequest, DateQuery, UpdateBookingStatusRequest};
use crate::services::availability::{parse_date, AvailabilityService};
use crate::services::booking::BookingService;
use crate::services::policy::{authorize, BookingOperation, Decision, DenyReason};

async fn resolve_actor(
    config: &AppConfig,
    principal: &Principal,
    auth_token: &str,
) -> Result<UserRecord, AppError> {
    let identity = IdentityService::new(config);
    Ok(identity.resolve(&principal.id, auth_token).await?)
}

fn ensure_allowed(decision: Decision) -> Result<(), AppError> {
    match decision {
        Decision::Allow => Ok(()),
        Decision::Deny(DenyReason::StaffOnly) => {
            Err(AppError::Forbidden("Access denied".to_string()))
        }
        Decision::Deny(reason) => Err(BookingError::from(reason).into()),
    }
}

/// GET /api/bookings?date=YYYY-MM-DD — slots already taken on that day.
#[axum::debug_handler]
pub async fn get_booked_slots(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    resolve_actor(&config, &principal, token).await?;

    let raw_date = query
        .date
        .ok_or_else(|| AppError::BadRequest("A date is required".to_string()))?;
    let date = parse_date(&raw_date).map_err(AppError::from)?;

    let service = AvailabilityService::new(&config);
    let booked = service.booked_slots(date, token).await?;

    Ok(Json(json!({ "bookedSlots": booked })))
}

/// POST /api/bookings — create a booking (always PENDING) for the caller.
#[axum::debug_handler]
pub async fn create_booking(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let actor = resolve_actor(&config, &principal, token).await?;

    ensure_allowed(authorize(&actor, &BookingOperation::CreateOwn))?;

    let service = BookingService::new(&config);
    let booking = service.create(&actor, request, token).await?;

    Ok(Json(json!({ "booking": booking })))
}

/// GET /api/bookings/me — the caller's bookings, oldest date first.
#[axum::debug_handler]
pub async fn list_my_bookings(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let actor = resolve_actor(&config, &principal, token).await?;

    ensure_allowed(authorize(&actor, &BookingOperation::ListOwn))?;

    let service = BookingService::new(&config);
    let bookings = service.list_for_owner(&actor, token).await?;

    Ok(Json(json!({ "bookings": bookings })))
}

/// PATCH /api/bookings/me — owner cancellation, the only patient transition.
#[axum::debug_handler]
pub async fn update_my_booking(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let actor = resolve_actor(&config, &principal, token).await?;

    let service = BookingService::new(&config);
    let booking = service
        .cancel_as_owner(&actor, request.booking_id, &request.status, token)
        .await?;

    Ok(Json(json!({ "booking": booking })))
}

/// GET /api/bookings/doctor?date=YYYY-MM-DD — staff listing with owner
/// profiles embedded; the date filter is optional.
#[axum::debug_handler]
pub async fn list_bookings_for_staff(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let actor = resolve_actor(&config, &principal, token).await?;

    ensure_allowed(authorize(&actor, &BookingOperation::ListAll))?;

    let date_filter = match query.date.as_deref() {
        Some(raw) => Some(parse_date(raw).map_err(AppError::from)?),
        None => None,
    };

    let service = BookingService::new(&config);
    let bookings = service.list_for_staff(date_filter, token).await?;

    Ok(Json(json!(bookings)))
}

/// PATCH /api/bookings/doctor — staff may move any booking to any of the
/// four statuses.
#[axum::debug_handler]
pub async fn update_booking_status(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let actor = resolve_actor(&config, &principal, token).await?;

    ensure_allowed(authorize(&actor, &BookingOperation::UpdateAnyStatus))?;

    let service = BookingService::new(&config);
    let booking = service
        .update_status_as_staff(request.booking_id, &request.status, token)
        .await?;

    Ok(Json(json!(booking)))
}
