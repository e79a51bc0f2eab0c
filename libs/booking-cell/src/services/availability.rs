use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Method;
use serde::Deserialize;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{BookingError, TimeSlot};

pub fn parse_date(raw: &str) -> Result<NaiveDate, BookingError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| BookingError::InvalidDate(raw.to_string()))
}

/// Inclusive bounds of a calendar day, local midnight to 23:59:59, matching
/// how bookings are stored (midnight timestamp plus a slot enum).
pub fn day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    (
        date.and_hms_opt(0, 0, 0).unwrap(),
        date.and_hms_opt(23, 59, 59).unwrap(),
    )
}

pub(crate) fn format_timestamp(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[derive(Debug, Deserialize)]
struct SlotRow {
    time_slot: TimeSlot,
}

/// Answers "which slots are already taken on this day". Counts bookings of
/// every status: a cancelled booking still occupies its slot, matching the
/// upstream behavior this service replaces.
pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn booked_slots(
        &self,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<TimeSlot>, BookingError> {
        debug!("Loading booked slots for {}", date);

        let (start, end) = day_bounds(date);
        let path = format!(
            "/rest/v1/bookings?select=time_slot&scheduled_date=gte.{}&scheduled_date=lte.{}",
            format_timestamp(start),
            format_timestamp(end)
        );

        let rows: Vec<SlotRow> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(rows.into_iter().map(|row| row.time_slot).collect())
    }
}
