//! Game room management.

use std::collections::HashSet;
use tactics_core::{
    Action, ClientId, GameError, GameEvent, GameSnapshot, GameState, GameSummary, Seat,
};
use thiserror::Error;

use crate::protocol::RoomId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("Room {0} not found")]
    RoomNotFound(RoomId),

    #[error("Not in a game")]
    NotInRoom,

    #[error("Spectators cannot act")]
    Spectator,

    #[error(transparent)]
    Game(#[from] GameError),
}

/// A room hosting one game, plus everyone watching or playing it.
pub struct GameRoom {
    pub id: RoomId,
    pub game: GameState,
    /// Seated players and spectators
    pub members: HashSet<ClientId>,
}

impl GameRoom {
    pub fn new(id: RoomId, game: GameState) -> Self {
        Self {
            id,
            game,
            members: HashSet::new(),
        }
    }

    /// Add a client, seating them if a seat is free.
    ///
    /// Returns the seat, or `None` when the client joins as a spectator.
    pub fn join(&mut self, client_id: ClientId) -> Option<Seat> {
        self.members.insert(client_id);
        self.game.add_player(client_id)
    }

    /// Remove a client, returning the seat they freed
    pub fn leave(&mut self, client_id: ClientId) -> Option<Seat> {
        self.members.remove(&client_id);
        self.game.remove_player(client_id)
    }

    pub fn seat_of(&self, client_id: ClientId) -> Option<Seat> {
        self.game.has_player(client_id)
    }

    /// Validate and apply an action on behalf of a member
    pub fn apply_action(
        &mut self,
        client_id: ClientId,
        action: &Action,
    ) -> Result<Vec<GameEvent>, RoomError> {
        if !self.members.contains(&client_id) {
            return Err(RoomError::NotInRoom);
        }
        let seat = self.seat_of(client_id).ok_or(RoomError::Spectator)?;
        self.game.check_action(seat, action)?;
        Ok(self.game.do_action(action))
    }

    /// Members other than `except`
    pub fn others(&self, except: ClientId) -> Vec<ClientId> {
        self.members
            .iter()
            .copied()
            .filter(|&id| id != except)
            .collect()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.game.dump()
    }

    pub fn summary(&self) -> GameSummary {
        self.game.summary()
    }
}
