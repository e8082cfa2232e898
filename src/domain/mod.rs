use uuid::Uuid;

pub mod booking;
pub mod courts;
pub mod ledger;
pub mod slot;
pub mod state;

pub use booking::{Booking, BookingStatus, HeldAmount, PaymentMethod};
pub use ledger::{LedgerTransaction, PlayerLedger, TransactionKind};
pub use slot::{ClassSlot, Classification, Gender, GroupOption, LevelRange, SlotSnapshot};
pub use state::{CancelOutcome, EngineState, NewBooking};

/// Attributes of a player as the booking engine needs them.
///
/// The identity layer authenticates the player; the engine only consumes
/// the id plus the level/gender attributes that drive slot classification.
#[derive(Clone, Debug)]
pub struct PlayerProfile {
    pub player_id: Uuid,
    /// Playing level in tenths (e.g. `35` for a 3.5 player).
    pub level_tenths: i32,
    pub gender: Gender,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("slot {0} does not exist")]
    SlotNotFound(Uuid),

    #[error("booking {0} does not exist")]
    BookingNotFound(Uuid),

    #[error("slot offers no option for {group_size} players")]
    UnknownOption { group_size: u8 },

    /// Every seat of the chosen option is already taken.
    #[error("the {group_size}-player option is already full")]
    OptionFull { group_size: u8 },

    /// The slot already has a court; the race is over.
    #[error("slot {0} is already confirmed")]
    SlotAlreadyConfirmed(Uuid),

    #[error("insufficient {method:?}: {required} required, {available} available")]
    InsufficientFunds {
        method: PaymentMethod,
        required: i64,
        available: i64,
    },

    /// Money and seat quantities must be strictly positive.
    #[error("a positive amount is required, got {0}")]
    NonPositiveAmount(i64),

    /// Every court of the club is occupied for the requested window.
    #[error("no court available at club {club_id} for the requested window")]
    NoCourtAvailable { club_id: Uuid },

    #[error("booking {0} is already cancelled")]
    AlreadyCancelled(Uuid),

    #[error("{requested} recycled seat(s) requested but only {available} available")]
    RecycledSeatsExhausted { requested: u32, available: u32 },

    #[error("instructor {instructor_id} does not own slot {slot_id}")]
    NotAuthorizedForSlot { instructor_id: Uuid, slot_id: Uuid },

    /// Points payment against an option that is not points-redeemable.
    #[error("the {group_size}-player option does not accept points")]
    PointsNotAccepted { group_size: u8 },

    /// The ledger detected a balance mismatch earlier and refuses writes
    /// until reconciled.
    #[error("ledger of player {0} is frozen pending reconciliation")]
    LedgerFrozen(Uuid),

    /// A recorded balance no longer matches the replayed transaction log.
    #[error("ledger of player {player_id} is corrupted: {detail}")]
    LedgerCorrupted { player_id: Uuid, detail: String },

    /// A derived value diverged from its cached counterpart.
    #[error("consistency violation: {0}")]
    Inconsistent(String),
}
