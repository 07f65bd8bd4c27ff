//! Units: the pieces players move around the map.

use crate::catalog::{self, Ability, CatalogError, Stats};
use crate::hex::HexCoord;
use serde::{Deserialize, Serialize};

/// Seat index in a game's turn order
pub type Seat = u8;

/// Wire form of a unit.
///
/// Only race and class names are carried; stats and abilities are rebuilt
/// from the catalog on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub pos: HexCoord,
    pub controller: Option<Seat>,
    pub race: String,
    pub class: String,
    pub health: u32,
    pub mana: u32,
    pub steps: u32,
    pub used_ability: bool,
}

/// A unit on the map
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub pos: HexCoord,
    /// Seat allowed to act with this unit; `None` for unbound units
    pub controller: Option<Seat>,
    pub race: String,
    pub class: String,
    /// Base stats from the race table
    pub stats: Stats,
    pub health: u32,
    pub mana: u32,
    /// Steps taken this turn
    pub steps: u32,
    pub used_ability: bool,
    abilities: Vec<&'static Ability>,
}

impl Unit {
    /// Create a fresh unit at full health and mana
    pub fn new(
        pos: HexCoord,
        controller: Option<Seat>,
        race: &str,
        class: &str,
    ) -> Result<Self, CatalogError> {
        let mut unit = Self {
            pos,
            controller,
            race: race.to_string(),
            class: class.to_string(),
            stats: Stats::default(),
            health: 0,
            mana: 0,
            steps: 0,
            used_ability: false,
            abilities: Vec::new(),
        };
        unit.load_stats()?;
        unit.health = unit.stats.max_health;
        unit.mana = unit.stats.max_mana;
        Ok(unit)
    }

    /// Resolve race and class against the catalog, replacing stats and abilities.
    ///
    /// Race abilities come first, then class abilities.
    pub fn load_stats(&mut self) -> Result<(), CatalogError> {
        let race = catalog::race(&self.race)?;
        let class = catalog::class(&self.class)?;

        self.stats = race.stats;
        self.abilities = race.abilities.iter().chain(class.abilities).collect();
        Ok(())
    }

    pub fn abilities(&self) -> &[&'static Ability] {
        &self.abilities
    }

    pub fn ability(&self, index: usize) -> Option<&'static Ability> {
        self.abilities.get(index).copied()
    }

    pub fn is_controlled_by(&self, seat: Seat) -> bool {
        self.controller == Some(seat)
    }

    /// Whether the unit has steps left this turn
    pub fn can_step(&self) -> bool {
        self.steps < self.stats.speed
    }

    /// Reset per-turn counters
    pub fn start_turn(&mut self) {
        self.steps = 0;
        self.used_ability = false;
    }

    /// Change health by `delta`, staying within `0..=max_health`
    pub fn adjust_health(&mut self, delta: i32) {
        let health = i64::from(self.health) + i64::from(delta);
        self.health = health.clamp(0, i64::from(self.stats.max_health)) as u32;
    }

    pub fn dump(&self) -> UnitSnapshot {
        UnitSnapshot {
            pos: self.pos,
            controller: self.controller,
            race: self.race.clone(),
            class: self.class.clone(),
            health: self.health,
            mana: self.mana,
            steps: self.steps,
            used_ability: self.used_ability,
        }
    }

    pub fn load(snapshot: UnitSnapshot) -> Result<Self, CatalogError> {
        let mut unit = Self {
            pos: snapshot.pos,
            controller: snapshot.controller,
            race: snapshot.race,
            class: snapshot.class,
            stats: Stats::default(),
            health: snapshot.health,
            mana: snapshot.mana,
            steps: snapshot.steps,
            used_ability: snapshot.used_ability,
            abilities: Vec::new(),
        };
        unit.load_stats()?;
        Ok(unit)
    }

    /// Race name formatted for display ("dwarf" -> "Dwarf")
    pub fn race_name(&self) -> String {
        capitalize(&self.race)
    }

    /// Class name formatted for display
    pub fn class_name(&self) -> String {
        capitalize(&self.class)
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
