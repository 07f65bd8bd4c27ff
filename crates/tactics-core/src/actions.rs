//! Player actions and the events they produce.
//!
//! Actions travel on the wire as `{"type": "move" | "end" | "ability", ...}`.

use crate::hex::{Direction, HexCoord};
use crate::unit::Seat;
use serde::{Deserialize, Serialize};

/// Everything a seated player can do on their turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Step the unit on `unit` one cell in `dir`
    Move { unit: HexCoord, dir: Direction },

    /// End the current turn
    #[serde(rename = "end")]
    EndTurn,

    /// Use ability number `ability` of the unit on `unit`, aimed at `target`
    #[serde(rename = "ability")]
    UseAbility {
        unit: HexCoord,
        ability: usize,
        target: HexCoord,
    },
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    UnitMoved {
        seat: Seat,
        from: HexCoord,
        to: HexCoord,
        steps: u32,
    },

    AbilityUsed {
        seat: Seat,
        caster: HexCoord,
        ability: String,
        target: HexCoord,
        /// Health change applied to the unit on `target`, if one was there
        health_change: Option<i32>,
        /// Where the caster moved to, for movement abilities
        caster_moved_to: Option<HexCoord>,
    },

    TurnEnded {
        seat: Seat,
        next_seat: Seat,
    },
}
