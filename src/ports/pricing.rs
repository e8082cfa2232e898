use uuid::Uuid;

#[mockall::automock]
#[async_trait::async_trait]
pub trait PricingPort {
    async fn slot_pricing(&self, slot_id: Uuid) -> Result<SlotPricing, Error>;
}

/// Pricing for one slot, as supplied by the external pricing tables.
#[derive(Clone, Copy, Debug)]
pub struct SlotPricing {
    /// Total price of the class, split between the participants.
    pub total_cents: i64,
    /// Points cost of one points-redeemable seat.
    pub seat_points: i64,
}

impl SlotPricing {
    /// Cost of one seat when `group_size` players share the class.
    pub fn per_seat_cents(&self, group_size: u8) -> i64 {
        self.total_cents / i64::from(group_size.max(1))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Domain-level error when no pricing exists for a slot
    #[error("no pricing available for slot {0}")]
    PricingUnavailable(Uuid),

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
