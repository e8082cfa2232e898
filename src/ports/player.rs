use uuid::Uuid;

use crate::domain::Gender;

#[mockall::automock]
#[async_trait::async_trait]
pub trait PlayerPort {
    async fn get_player(&self, player_id: Uuid) -> Result<Player, Error>;
}

/// Player record as the identity layer exposes it. The engine trusts the
/// id as authenticated and only consumes the classification attributes.
pub struct Player {
    pub player_id: Uuid,
    pub level_tenths: i32,
    pub gender: Gender,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Domain-level error when a player does not exist
    #[error("player {0} does not exist")]
    PlayerDoesNotExist(Uuid),

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
