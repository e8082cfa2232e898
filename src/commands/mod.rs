use std::{borrow::Cow, sync::Arc};

pub mod book_recycled_seat;
pub mod cancel_booking;
pub mod create_booking;
pub mod slot_snapshot;
pub mod subsidize_seat;

/// The command surface of the engine: one [`tower::Service`] impl per
/// exposed operation, all sharing the same port handles.
pub struct DomainLogic<S, P, R> {
    store: Arc<S>,
    players: Arc<P>,
    pricing: Arc<R>,
}

impl<S, P, R> DomainLogic<S, P, R> {
    pub fn new(store: Arc<S>, players: Arc<P>, pricing: Arc<R>) -> Self {
        Self {
            store,
            players,
            pricing,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("store port error: {0:?}")]
    Store(#[from] crate::ports::store::Error),
    #[error("player port error: {0:?}")]
    Player(#[from] crate::ports::player::Error),
    #[error("pricing port error: {0:?}")]
    Pricing(#[from] crate::ports::pricing::Error),

    #[error("invalid state")]
    InvalidState(Cow<'static, str>),
}

impl Error {
    /// The domain rejection behind this error, if that is what it is.
    pub fn as_domain(&self) -> Option<&crate::domain::Error> {
        match self {
            Error::Store(crate::ports::store::Error::Domain(err)) => Some(err),
            _ => None,
        }
    }
}
