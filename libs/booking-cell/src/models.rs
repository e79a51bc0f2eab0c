use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use identity_cell::models::UserRecord;
use shared_database::DatabaseError;
use shared_models::error::AppError;

// ==============================================================================
// CORE BOOKING MODELS
// ==============================================================================

/// One requested appointment slot. Created in PENDING by a patient action;
/// never physically deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub scheduled_date: NaiveDateTime,
    pub time_slot: TimeSlot,
    pub status: BookingStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking with the owner's profile embedded, as served to staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingWithPatient {
    #[serde(flatten)]
    pub booking: Booking,
    pub user: UserRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "PENDING"),
            BookingStatus::Confirmed => write!(f, "CONFIRMED"),
            BookingStatus::Cancelled => write!(f, "CANCELLED"),
            BookingStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "COMPLETED" => Ok(BookingStatus::Completed),
            other => Err(BookingError::InvalidStatus(other.to_string())),
        }
    }
}

/// Fixed daily appointment intervals. Variant order is chronological, and so
/// is the lexicographic order of the wire values the datastore sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeSlot {
    #[serde(rename = "SLOT_09_10")]
    Slot0910,
    #[serde(rename = "SLOT_10_11")]
    Slot1011,
    #[serde(rename = "SLOT_11_12")]
    Slot1112,
    #[serde(rename = "SLOT_12_13")]
    Slot1213,
    #[serde(rename = "SLOT_14_15")]
    Slot1415,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 5] = [
        TimeSlot::Slot0910,
        TimeSlot::Slot1011,
        TimeSlot::Slot1112,
        TimeSlot::Slot1213,
        TimeSlot::Slot1415,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::Slot0910 => "SLOT_09_10",
            TimeSlot::Slot1011 => "SLOT_10_11",
            TimeSlot::Slot1112 => "SLOT_11_12",
            TimeSlot::Slot1213 => "SLOT_12_13",
            TimeSlot::Slot1415 => "SLOT_14_15",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeSlot::Slot0910 => "09:00-10:00",
            TimeSlot::Slot1011 => "10:00-11:00",
            TimeSlot::Slot1112 => "11:00-12:00",
            TimeSlot::Slot1213 => "12:00-13:00",
            TimeSlot::Slot1415 => "14:00-15:00",
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimeSlot {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| BookingError::InvalidSlot(s.to_string()))
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Body of `POST /api/bookings`. `date` and `time_slot` arrive as strings and
/// are validated into their enums by the lifecycle manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub date: String,
    pub time_slot: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// Body of the PATCH endpoints (`/me` and `/doctor` share the shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingStatusRequest {
    pub booking_id: Uuid,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Booking not found")]
    NotFound,

    #[error("You cannot modify another user's booking")]
    NotOwner,

    #[error("Patients can only cancel bookings")]
    OnlyCancellationAllowed,

    #[error("Only PENDING bookings can be cancelled")]
    NotPending,

    #[error("Time slot {0} is already booked on {1}")]
    SlotTaken(TimeSlot, NaiveDate),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid time slot: {0}")]
    InvalidSlot(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound => AppError::NotFound(err.to_string()),
            BookingError::NotOwner => AppError::Forbidden(err.to_string()),
            // The observed API surfaces the not-PENDING precondition as a
            // plain 400, so the Conflict status is reserved for slot
            // collisions on create.
            BookingError::OnlyCancellationAllowed
            | BookingError::NotPending
            | BookingError::InvalidDate(_)
            | BookingError::InvalidSlot(_)
            | BookingError::InvalidStatus(_) => AppError::BadRequest(err.to_string()),
            BookingError::SlotTaken(_, _) => AppError::Conflict(err.to_string()),
            BookingError::Database(e) => AppError::Database(e.to_string()),
            BookingError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
