use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use crate::{
    domain::{
        courts::Club, Booking, CancelOutcome, ClassSlot, EngineState, NewBooking, PlayerLedger,
        SlotSnapshot,
    },
    ports::store::{Error, StorePort},
};

/// In-memory booking store.
///
/// One mutex over the whole [`EngineState`] is the serializability
/// guarantee: atomic units commit in lock-acquisition order, so no two
/// requests can both observe "option not yet full" for the same slot or
/// race into the same court. Mutations run against a clone of the state
/// and the clone replaces the original only on success, which makes the
/// resolver's all-or-nothing requirement structural.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<EngineState>>,
}

impl MemoryStore {
    fn commit<T>(
        &self,
        op: impl FnOnce(&mut EngineState) -> Result<T, crate::domain::Error>,
    ) -> Result<T, Error> {
        let mut state = self.state.lock()?;
        let mut draft = state.clone();
        let out = op(&mut draft)?;
        *state = draft;
        Ok(out)
    }

    fn read<T>(
        &self,
        op: impl FnOnce(&EngineState) -> Result<T, crate::domain::Error>,
    ) -> Result<T, Error> {
        let state = self.state.lock()?;
        Ok(op(&state)?)
    }

    // Seeding entry points for the out-of-scope collaborators (club CRUD,
    // proposal generator, funds top-ups).

    pub fn register_club(&self, club: Club) -> Result<(), Error> {
        self.state.lock()?.register_club(club);
        Ok(())
    }

    pub fn publish_slot(&self, slot: ClassSlot) -> Result<(), Error> {
        self.state.lock()?.publish_slot(slot);
        Ok(())
    }

    pub fn open_ledger(&self, ledger: PlayerLedger) -> Result<(), Error> {
        self.state.lock()?.open_ledger(ledger);
        Ok(())
    }

    pub fn booking(&self, booking_id: Uuid) -> Result<Booking, Error> {
        self.read(|state| state.booking(booking_id).cloned())
    }

    pub fn ledger(&self, player_id: Uuid) -> Result<Option<PlayerLedger>, Error> {
        self.read(|state| Ok(state.ledger(player_id).cloned()))
    }

    /// Periodic consistency check: re-derives every cached counter and
    /// ledger balance from first principles.
    pub fn verify(&self) -> Result<(), Error> {
        self.read(|state| state.verify())
    }
}

#[async_trait::async_trait]
impl StorePort for MemoryStore {
    async fn create_booking(&self, req: NewBooking) -> Result<Booking, Error> {
        self.commit(|state| state.create_booking(req))
    }

    async fn cancel_booking(&self, booking_id: Uuid) -> Result<CancelOutcome, Error> {
        self.commit(|state| state.cancel_booking(booking_id))
    }

    async fn subsidize_seat(
        &self,
        instructor_id: Uuid,
        slot_id: Uuid,
        group_size: u8,
    ) -> Result<Booking, Error> {
        self.commit(|state| state.subsidize_seat(instructor_id, slot_id, group_size))
    }

    async fn book_recycled_seat(
        &self,
        player_id: Uuid,
        slot_id: Uuid,
        seats: u32,
        points: i64,
    ) -> Result<Booking, Error> {
        self.commit(|state| state.book_recycled_seat(player_id, slot_id, seats, points))
    }

    async fn slot_snapshot(&self, slot_id: Uuid) -> Result<SlotSnapshot, Error> {
        self.read(|state| state.snapshot(slot_id))
    }
}

/// Erased [`PoisonError`]
///
/// `PoisonError` keeps the `MutexGuard` internally, which is not send. Thus we erase the error
/// and only keep the string representation instead.
#[derive(Debug, thiserror::Error)]
#[error("poison error: {0}")]
pub struct ErasedPoisonError(String);

/// We need to create a custom `From` implementation here for an error that's specific to this
/// adapter.
impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError(err.to_string())))
    }
}
