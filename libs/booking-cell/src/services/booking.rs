use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use identity_cell::models::UserRecord;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Booking, BookingError, BookingStatus, BookingWithPatient, CreateBookingRequest, TimeSlot,
};
use crate::services::availability::{day_bounds, format_timestamp, parse_date, AvailabilityService};
use crate::services::policy::{authorize, BookingOperation, Decision};

/// Booking lifecycle manager: creation, role-scoped listings, and status
/// transitions over the PENDING/CONFIRMED/CANCELLED/COMPLETED machine.
pub struct BookingService {
    supabase: Arc<SupabaseClient>,
    availability: AvailabilityService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let availability = AvailabilityService::with_client(Arc::clone(&supabase));

        Self {
            supabase,
            availability,
        }
    }

    /// Creates a booking in PENDING for the actor. The availability pre-check
    /// gives a friendly error for the common case; the datastore's unique
    /// index on (scheduled_date, time_slot) is the real guard, and its
    /// violation surfaces as the same slot-taken conflict.
    pub async fn create(
        &self,
        actor: &UserRecord,
        request: CreateBookingRequest,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let date = parse_date(&request.date)?;
        let slot: TimeSlot = request.time_slot.parse()?;

        let taken = self.availability.booked_slots(date, auth_token).await?;
        if taken.contains(&slot) {
            return Err(BookingError::SlotTaken(slot, date));
        }

        let (start_of_day, _) = day_bounds(date);
        let booking_data = json!({
            "user_id": actor.id,
            "scheduled_date": format_timestamp(start_of_day),
            "time_slot": slot,
            "status": BookingStatus::Pending,
            "reason": request.reason,
            "notes": request.notes,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Booking> = match self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/bookings",
                Some(auth_token),
                Some(booking_data),
                Some(headers),
            )
            .await
        {
            Ok(rows) => rows,
            Err(e) if e.is_conflict() => return Err(BookingError::SlotTaken(slot, date)),
            Err(e) => return Err(e.into()),
        };

        let booking = result
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::Internal("Booking row was not returned after insert".to_string()))?;

        info!("Booking {} created for user {} ({} {})", booking.id, actor.id, date, slot);
        Ok(booking)
    }

    /// Staff listing with embedded owner profiles, ordered by
    /// (scheduled_date, time_slot) ascending. An absent filter returns every
    /// booking; a date filter is inclusive midnight-to-midnight.
    pub async fn list_for_staff(
        &self,
        date_filter: Option<NaiveDate>,
        auth_token: &str,
    ) -> Result<Vec<BookingWithPatient>, BookingError> {
        let mut path = String::from(
            "/rest/v1/bookings?select=*,user:users(*)&order=scheduled_date.asc,time_slot.asc",
        );

        if let Some(date) = date_filter {
            let (start, end) = day_bounds(date);
            path.push_str(&format!(
                "&scheduled_date=gte.{}&scheduled_date=lte.{}",
                format_timestamp(start),
                format_timestamp(end)
            ));
        }

        debug!("Listing bookings for staff (filter: {:?})", date_filter);

        let bookings: Vec<BookingWithPatient> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(bookings)
    }

    /// All bookings owned by the actor, oldest scheduled date first.
    pub async fn list_for_owner(
        &self,
        actor: &UserRecord,
        auth_token: &str,
    ) -> Result<Vec<Booking>, BookingError> {
        let path = format!(
            "/rest/v1/bookings?user_id=eq.{}&order=scheduled_date.asc",
            actor.id
        );

        let bookings: Vec<Booking> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(bookings)
    }

    pub async fn get(&self, booking_id: Uuid, auth_token: &str) -> Result<Booking, BookingError> {
        let path = format!("/rest/v1/bookings?id=eq.{}", booking_id);

        let result: Vec<Booking> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        result.into_iter().next().ok_or(BookingError::NotFound)
    }

    /// Staff status update. Validates only that the target status is one of
    /// the four known values; staff may move a booking between any of them,
    /// terminal or not.
    pub async fn update_status_as_staff(
        &self,
        booking_id: Uuid,
        raw_status: &str,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let status: BookingStatus = raw_status.parse()?;

        // 404 before write, so an unknown id never reaches the datastore patch.
        self.get(booking_id, auth_token).await?;

        let updated = self.set_status(booking_id, status, auth_token).await?;
        info!("Booking {} moved to {} by staff", booking_id, status);
        Ok(updated)
    }

    /// Owner-initiated cancellation: the only transition a patient may drive.
    pub async fn cancel_as_owner(
        &self,
        actor: &UserRecord,
        booking_id: Uuid,
        raw_status: &str,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let requested: BookingStatus = raw_status.parse()?;
        if requested != BookingStatus::Cancelled {
            return Err(BookingError::OnlyCancellationAllowed);
        }

        let booking = self.get(booking_id, auth_token).await?;

        let op = BookingOperation::CancelOwn {
            booking: &booking,
            requested,
        };
        if let Decision::Deny(reason) = authorize(actor, &op) {
            return Err(reason.into());
        }

        let updated = self
            .set_status(booking_id, BookingStatus::Cancelled, auth_token)
            .await?;
        info!("Booking {} cancelled by its owner {}", booking_id, actor.id);
        Ok(updated)
    }

    async fn set_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let path = format!("/rest/v1/bookings?id=eq.{}", booking_id);
        let update_data = json!({
            "status": status,
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Booking> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(update_data), Some(headers))
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::Internal("Booking row was not returned after update".to_string()))
    }
}
