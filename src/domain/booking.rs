use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    Funds,
    Points,
}

/// Amount blocked when the booking was created.
///
/// Fixed for the life of the booking: it is either captured or released in
/// full, never changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeldAmount {
    pub method: PaymentMethod,
    pub value: i64,
}

impl HeldAmount {
    /// No money attached (instructor-subsidized seats).
    pub fn none() -> Self {
        Self {
            method: PaymentMethod::Funds,
            value: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }
}

/// One player's enrollment request against a slot.
#[derive(Clone, Debug)]
pub struct Booking {
    pub booking_id: Uuid,
    pub slot_id: Uuid,
    pub player_id: Uuid,
    /// Group-size option this booking races for; `None` for recycled
    /// bookings, which consume vacated capacity outside the race.
    pub chosen_option: Option<u8>,
    /// Seats this booking occupies (1 for race bookings; recycled
    /// bookings may take several).
    pub seats: u32,
    pub status: BookingStatus,
    pub amount: HeldAmount,
    pub is_recycled: bool,
    pub is_instructor_subsidy: bool,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn pending(player_id: Uuid, slot_id: Uuid, group_size: u8, amount: HeldAmount) -> Self {
        Self {
            booking_id: Uuid::new_v4(),
            slot_id,
            player_id,
            chosen_option: Some(group_size),
            seats: 1,
            status: BookingStatus::Pending,
            amount,
            is_recycled: false,
            is_instructor_subsidy: false,
            created_at: Utc::now(),
        }
    }

    pub fn subsidy(instructor_id: Uuid, slot_id: Uuid, group_size: u8) -> Self {
        Self {
            is_instructor_subsidy: true,
            ..Self::pending(instructor_id, slot_id, group_size, HeldAmount::none())
        }
    }

    /// A booking against recycled capacity: confirmed on the spot, the
    /// court already exists.
    pub fn recycled(player_id: Uuid, slot_id: Uuid, seats: u32, amount: HeldAmount) -> Self {
        Self {
            booking_id: Uuid::new_v4(),
            slot_id,
            player_id,
            chosen_option: None,
            seats,
            status: BookingStatus::Confirmed,
            amount,
            is_recycled: true,
            is_instructor_subsidy: false,
            created_at: Utc::now(),
        }
    }

    /// Still holds a seat (PENDING or CONFIRMED).
    pub fn is_active(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }
}
