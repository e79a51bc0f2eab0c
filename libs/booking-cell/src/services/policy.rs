use identity_cell::models::{UserRecord, UserRole};

use crate::models::{Booking, BookingError, BookingStatus};

/// Operations the booking API exposes, as the access policy sees them.
#[derive(Debug)]
pub enum BookingOperation<'a> {
    /// Staff listing of every booking, optionally date-filtered.
    ListAll,
    /// Staff status update of any booking.
    UpdateAnyStatus,
    /// Listing the actor's own bookings.
    ListOwn,
    /// Creating a booking for the actor themselves.
    CreateOwn,
    /// Owner-initiated status change on a specific booking.
    CancelOwn {
        booking: &'a Booking,
        requested: BookingStatus,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    StaffOnly,
    NotOwner,
    OnlyCancellation,
    NotPending,
}

impl From<DenyReason> for BookingError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            // StaffOnly is surfaced by the handlers as a Forbidden response;
            // NotOwner rides the same 403 via BookingError.
            DenyReason::StaffOnly | DenyReason::NotOwner => BookingError::NotOwner,
            DenyReason::OnlyCancellation => BookingError::OnlyCancellationAllowed,
            DenyReason::NotPending => BookingError::NotPending,
        }
    }
}

/// Pure decision function gating every booking operation by role and
/// ownership. No datastore access; callers load whatever resource the
/// operation refers to first.
pub fn authorize(actor: &UserRecord, op: &BookingOperation<'_>) -> Decision {
    match op {
        BookingOperation::ListAll | BookingOperation::UpdateAnyStatus => match actor.role {
            UserRole::Doctor | UserRole::Admin => Decision::Allow,
            UserRole::Patient => Decision::Deny(DenyReason::StaffOnly),
        },

        BookingOperation::ListOwn | BookingOperation::CreateOwn => Decision::Allow,

        BookingOperation::CancelOwn { booking, requested } => {
            if booking.user_id != actor.id {
                return Decision::Deny(DenyReason::NotOwner);
            }
            if *requested != BookingStatus::Cancelled {
                return Decision::Deny(DenyReason::OnlyCancellation);
            }
            match booking.status {
                BookingStatus::Pending => Decision::Allow,
                BookingStatus::Confirmed | BookingStatus::Cancelled | BookingStatus::Completed => {
                    Decision::Deny(DenyReason::NotPending)
                }
            }
        }
    }
}
