//! Core game state machine.
//!
//! A `GameState` owns one map, the seat roster, and the turn pointer. It is
//! only mutated through the validate-then-apply protocol: callers check an
//! action with [`GameState::valid_action`] and then apply it with
//! [`GameState::do_action`]. Both ends of the wire run the same code, and any
//! divergence is repaired by replacing the whole state from a
//! [`GameSnapshot`].

use crate::actions::{Action, GameEvent};
use crate::catalog::{CatalogError, CATALOG_VERSION};
use crate::effect::{EffectResolver, FixedDeltaResolver};
use crate::hex::HexCoord;
use crate::map::{Map, MapError, MapSnapshot};
use crate::unit::{Seat, Unit};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// External identity of a connected player
pub type ClientId = Uuid;

/// Largest grid side accepted from a [`GameConfig`]
pub const MAX_MAP_SIDE: usize = 64;

/// Errors that can occur when validating actions or building state
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("No unit at ({}, {})", .0.q, .0.r)]
    NoUnit(HexCoord),

    #[error("Unit at ({}, {}) belongs to another seat", .0.q, .0.r)]
    NotYourUnit(HexCoord),

    #[error("Cell ({}, {}) is not walkable", .0.q, .0.r)]
    Blocked(HexCoord),

    #[error("Unit at ({}, {}) has no steps left", .0.q, .0.r)]
    OutOfSteps(HexCoord),

    #[error("Unit at ({}, {}) already used an ability this turn", .0.q, .0.r)]
    AbilityAlreadyUsed(HexCoord),

    #[error("No ability with index {0}")]
    UnknownAbility(usize),

    #[error("{0} is passive and cannot be used")]
    PassiveAbility(String),

    #[error("Invalid target ({}, {})", .0.q, .0.r)]
    InvalidTarget(HexCoord),

    #[error("Catalog version mismatch: expected {expected}, found {found}")]
    CatalogMismatch { expected: u32, found: u32 },

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Invalid game config: {0}")]
    InvalidConfig(String),

    #[error("No free cell to place a unit")]
    NoRoomForUnit,

    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Race and class of a unit every seat starts with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub race: String,
    pub class: String,
}

impl UnitSpec {
    pub fn new(race: &str, class: &str) -> Self {
        Self {
            race: race.to_string(),
            class: class.to_string(),
        }
    }
}

/// Settings for a new game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub seats: Seat,
    pub rows: usize,
    pub cols: usize,
    /// Silhouette radius; the largest hexagon that fits when unset
    pub radius: Option<u32>,
    /// Probability of a cell starting as a wall
    pub wall_chance: f64,
    /// Seed for terrain and spawn placement; random when unset
    pub seed: Option<u64>,
    /// Units spawned for every seat
    pub roster: Vec<UnitSpec>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seats: 2,
            rows: 15,
            cols: 15,
            radius: None,
            wall_chance: 0.2,
            seed: None,
            roster: vec![UnitSpec::new("human", "wizard")],
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), GameError> {
        if self.seats == 0 {
            return Err(GameError::InvalidConfig("at least one seat is required".into()));
        }
        if !(1..=MAX_MAP_SIDE).contains(&self.rows) || !(1..=MAX_MAP_SIDE).contains(&self.cols) {
            return Err(GameError::InvalidConfig(format!(
                "map sides must be between 1 and {}",
                MAX_MAP_SIDE
            )));
        }
        if !(0.0..=1.0).contains(&self.wall_chance) {
            return Err(GameError::InvalidConfig("wall chance must be within 0..=1".into()));
        }
        for spec in &self.roster {
            crate::catalog::race(&spec.race)?;
            crate::catalog::class(&spec.class)?;
        }
        Ok(())
    }
}

/// Whether a game is still filling its seats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    AwaitingPlayers,
    Active,
}

/// Cheap lobby listing of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub capacity: Seat,
    pub seated: usize,
    pub rows: usize,
    pub cols: usize,
}

/// Everything needed to rebuild a game on another machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub catalog_version: u32,
    pub capacity: Seat,
    pub map: MapSnapshot,
    pub players: Vec<Option<ClientId>>,
    pub current_turn: Seat,
}

/// A partial state change; only the present fields are applied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<Option<ClientId>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_turn: Option<Seat>,
}

/// The complete game state
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    capacity: Seat,
    /// Seat -> occupant; `None` marks a freed seat
    players: Vec<Option<ClientId>>,
    current_turn: Seat,
    map: Map,
    /// Actions performed locally since the last [`Self::clear_turn`]
    local_turn: Vec<Action>,
}

impl GameState {
    /// Create a game with a carved, randomly walled map and each seat's roster spawned
    pub fn new(config: &GameConfig) -> Result<Self, GameError> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut map = Map::generate(config.rows, config.cols, config.wall_chance, &mut rng);
        let radius = config.radius.unwrap_or_else(|| map.default_radius());
        map.carve_shape(radius);

        for seat in 0..config.seats {
            for spec in &config.roster {
                let pos = map
                    .random_open_tile(&mut rng)
                    .ok_or(GameError::NoRoomForUnit)?;
                map.add_unit(Unit::new(pos, Some(seat), &spec.race, &spec.class)?)?;
            }
        }

        Self::with_map(config.seats, map)
    }

    /// Create a game around an already prepared map
    pub fn with_map(capacity: Seat, map: Map) -> Result<Self, GameError> {
        if capacity == 0 {
            return Err(GameError::InvalidConfig("at least one seat is required".into()));
        }
        Ok(Self {
            capacity,
            players: Vec::new(),
            current_turn: 0,
            map,
            local_turn: Vec::new(),
        })
    }

    /// Rebuild a game from a snapshot
    pub fn from_snapshot(snapshot: GameSnapshot) -> Result<Self, GameError> {
        if snapshot.catalog_version != CATALOG_VERSION {
            return Err(GameError::CatalogMismatch {
                expected: CATALOG_VERSION,
                found: snapshot.catalog_version,
            });
        }
        if snapshot.capacity == 0 {
            return Err(GameError::InvalidSnapshot("capacity is zero".into()));
        }
        if snapshot.current_turn >= snapshot.capacity {
            return Err(GameError::InvalidSnapshot(format!(
                "turn {} outside {} seats",
                snapshot.current_turn, snapshot.capacity
            )));
        }
        if snapshot.players.len() > snapshot.capacity as usize {
            return Err(GameError::InvalidSnapshot(format!(
                "{} players for {} seats",
                snapshot.players.len(),
                snapshot.capacity
            )));
        }

        Ok(Self {
            capacity: snapshot.capacity,
            players: snapshot.players,
            current_turn: snapshot.current_turn,
            map: Map::load(snapshot.map)?,
            local_turn: Vec::new(),
        })
    }

    pub fn capacity(&self) -> Seat {
        self.capacity
    }

    pub fn players(&self) -> &[Option<ClientId>] {
        &self.players
    }

    pub fn current_turn(&self) -> Seat {
        self.current_turn
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    /// Mutable map access for scenario setup
    pub fn map_mut(&mut self) -> &mut Map {
        &mut self.map
    }

    pub fn phase(&self) -> GamePhase {
        if self.players.len() < self.capacity as usize {
            GamePhase::AwaitingPlayers
        } else {
            GamePhase::Active
        }
    }

    /// Number of seats currently bound to a player
    pub fn seated_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_some()).count()
    }

    /// Occupant of a seat
    pub fn player_at(&self, seat: Seat) -> Option<ClientId> {
        self.players.get(seat as usize).copied().flatten()
    }

    /// Seat a player, returning their seat or `None` when every seat is taken.
    ///
    /// A player who is already seated keeps their seat.
    pub fn add_player(&mut self, id: ClientId) -> Option<Seat> {
        if let Some(seat) = self.has_player(id) {
            return Some(seat);
        }
        if self.players.len() < self.capacity as usize {
            self.players.push(Some(id));
            return Some((self.players.len() - 1) as Seat);
        }
        let seat = self.players.iter().position(Option::is_none)?;
        self.players[seat] = Some(id);
        Some(seat as Seat)
    }

    /// Free a player's seat. Seat numbers of other players never change.
    pub fn remove_player(&mut self, id: ClientId) -> Option<Seat> {
        let seat = self.has_player(id)?;
        self.players[seat as usize] = None;
        Some(seat)
    }

    /// Seat bound to `id`, if any
    pub fn has_player(&self, id: ClientId) -> Option<Seat> {
        self.players
            .iter()
            .position(|p| *p == Some(id))
            .map(|seat| seat as Seat)
    }

    /// Units controlled by `seat`
    pub fn units_for(&self, seat: Seat) -> impl Iterator<Item = &Unit> {
        self.map.units().iter().filter(move |u| u.is_controlled_by(seat))
    }

    /// Check whether `seat` may perform `action` now, explaining why not
    pub fn check_action(&self, seat: Seat, action: &Action) -> Result<(), GameError> {
        if seat != self.current_turn {
            return Err(GameError::NotYourTurn);
        }

        match *action {
            Action::Move { unit, dir } => {
                let mover = self.acting_unit(seat, unit)?;
                let dest = unit.neighbor(dir);
                if !self.map.tile_walkable(dest) {
                    return Err(GameError::Blocked(dest));
                }
                if !mover.can_step() {
                    return Err(GameError::OutOfSteps(unit));
                }
                Ok(())
            }

            Action::EndTurn => Ok(()),

            Action::UseAbility {
                unit,
                ability,
                target,
            } => {
                let caster = self.acting_unit(seat, unit)?;
                if caster.used_ability {
                    return Err(GameError::AbilityAlreadyUsed(unit));
                }
                let ability = caster
                    .ability(ability)
                    .ok_or(GameError::UnknownAbility(ability))?;
                if ability.is_passive() {
                    return Err(GameError::PassiveAbility(ability.name.to_string()));
                }
                if !self.map.valid_target(unit, seat, ability, target) {
                    return Err(GameError::InvalidTarget(target));
                }
                Ok(())
            }
        }
    }

    /// Whether `seat` may perform `action` now
    pub fn valid_action(&self, seat: Seat, action: &Action) -> bool {
        self.check_action(seat, action).is_ok()
    }

    fn acting_unit(&self, seat: Seat, pos: HexCoord) -> Result<&Unit, GameError> {
        let unit = self.map.tile_unit(pos).ok_or(GameError::NoUnit(pos))?;
        if !unit.is_controlled_by(seat) {
            return Err(GameError::NotYourUnit(pos));
        }
        Ok(unit)
    }

    /// Apply an already validated action using the placeholder effect resolver
    pub fn do_action(&mut self, action: &Action) -> Vec<GameEvent> {
        self.do_action_with(action, &FixedDeltaResolver::default())
    }

    /// Apply an already validated action.
    ///
    /// Nothing is re-checked here; applying an action that did not pass
    /// [`Self::check_action`], or applying the same action twice, corrupts
    /// the game.
    pub fn do_action_with(
        &mut self,
        action: &Action,
        resolver: &dyn EffectResolver,
    ) -> Vec<GameEvent> {
        let seat = self.current_turn;
        let mut events = Vec::new();

        match *action {
            Action::Move { unit, dir } => {
                if let Some(mover) = self.map.tile_unit_mut(unit) {
                    mover.pos = unit.neighbor(dir);
                    mover.steps += 1;
                    events.push(GameEvent::UnitMoved {
                        seat,
                        from: unit,
                        to: mover.pos,
                        steps: mover.steps,
                    });
                }
            }

            Action::EndTurn => {
                self.end_of_turn(seat);
                let next_seat = ((u16::from(seat) + 1) % u16::from(self.capacity)) as Seat;
                self.current_turn = next_seat;
                self.start_of_turn(next_seat);
                events.push(GameEvent::TurnEnded { seat, next_seat });
            }

            Action::UseAbility {
                unit,
                ability,
                target,
            } => {
                let Some(caster) = self.map.tile_unit(unit) else {
                    return events;
                };
                let Some(used) = caster.ability(ability) else {
                    return events;
                };
                let outcome = resolver.resolve(used, caster, target, self.map.tile_unit(target));

                if let Some(caster) = self.map.tile_unit_mut(unit) {
                    caster.used_ability = true;
                }

                let health_change = self.map.tile_unit_mut(target).map(|victim| {
                    let before = victim.health;
                    victim.adjust_health(outcome.target_health);
                    victim.health as i32 - before as i32
                });

                let mut caster_moved_to = None;
                if let Some(dest) = outcome.caster_moves_to {
                    if self.map.tile_unit(dest).is_none() {
                        if let Some(caster) = self.map.tile_unit_mut(unit) {
                            caster.pos = dest;
                            caster_moved_to = Some(dest);
                        }
                    }
                }

                events.push(GameEvent::AbilityUsed {
                    seat,
                    caster: unit,
                    ability: used.name.to_string(),
                    target,
                    health_change,
                    caster_moved_to,
                });
            }
        }

        events
    }

    /// Validate, apply, and record an action in the local turn
    pub fn perform(&mut self, seat: Seat, action: Action) -> Result<Vec<GameEvent>, GameError> {
        self.check_action(seat, &action)?;
        let events = self.do_action(&action);
        self.local_turn.push(action);
        Ok(events)
    }

    /// Actions performed locally since the last clear
    pub fn local_turn(&self) -> &[Action] {
        &self.local_turn
    }

    /// Clear the local turn, returning what it held
    pub fn clear_turn(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.local_turn)
    }

    /// Apply a batch of actions received from elsewhere, without validation
    /// and without recording them in the local turn
    pub fn apply_turn(&mut self, actions: &[Action]) -> Vec<GameEvent> {
        actions.iter().flat_map(|action| self.do_action(action)).collect()
    }

    /// Runs before the turn pointer leaves `seat`
    fn end_of_turn(&mut self, _seat: Seat) {}

    /// Runs once `seat` becomes the current turn
    fn start_of_turn(&mut self, seat: Seat) {
        for unit in self.map.units_mut().filter(|u| u.is_controlled_by(seat)) {
            unit.start_turn();
        }
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            capacity: self.capacity,
            seated: self.seated_count(),
            rows: self.map.rows(),
            cols: self.map.cols(),
        }
    }

    pub fn dump(&self) -> GameSnapshot {
        GameSnapshot {
            catalog_version: CATALOG_VERSION,
            capacity: self.capacity,
            map: self.map.dump(),
            players: self.players.clone(),
            current_turn: self.current_turn,
        }
    }

    /// Replace this game wholesale with a snapshot.
    ///
    /// On error the current state is left untouched.
    pub fn load(&mut self, snapshot: GameSnapshot) -> Result<(), GameError> {
        *self = Self::from_snapshot(snapshot)?;
        Ok(())
    }

    /// Partial update carrying the seat roster
    pub fn players_update(&self) -> StateUpdate {
        StateUpdate {
            players: Some(self.players.clone()),
            current_turn: None,
        }
    }

    /// Merge the fields present in `update`
    pub fn apply_update(&mut self, update: StateUpdate) -> Result<(), GameError> {
        if let Some(players) = &update.players {
            if players.len() > self.capacity as usize {
                return Err(GameError::InvalidSnapshot(format!(
                    "{} players for {} seats",
                    players.len(),
                    self.capacity
                )));
            }
        }
        if let Some(turn) = update.current_turn {
            if turn >= self.capacity {
                return Err(GameError::InvalidSnapshot(format!(
                    "turn {} outside {} seats",
                    turn, self.capacity
                )));
            }
        }

        if let Some(players) = update.players {
            self.players = players;
        }
        if let Some(turn) = update.current_turn {
            self.current_turn = turn;
        }
        Ok(())
    }
}
