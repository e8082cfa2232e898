use uuid::Uuid;

use crate::domain::{Booking, CancelOutcome, NewBooking, SlotSnapshot};

/// The booking store: every method is one serializable atomic unit over
/// the affected slot's booking set and the club's court-occupancy view.
/// An `Err` from a mutating method means nothing was written.
#[mockall::automock]
#[async_trait::async_trait]
pub trait StorePort {
    async fn create_booking(&self, req: NewBooking) -> Result<Booking, Error>;
    async fn cancel_booking(&self, booking_id: Uuid) -> Result<CancelOutcome, Error>;
    async fn subsidize_seat(
        &self,
        instructor_id: Uuid,
        slot_id: Uuid,
        group_size: u8,
    ) -> Result<Booking, Error>;
    async fn book_recycled_seat(
        &self,
        player_id: Uuid,
        slot_id: Uuid,
        seats: u32,
        points: i64,
    ) -> Result<Booking, Error>;
    async fn slot_snapshot(&self, slot_id: Uuid) -> Result<SlotSnapshot, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Domain-level rejection or rollback (option full, no court, ...).
    #[error("domain error: {0}")]
    Domain(#[from] crate::domain::Error),

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
