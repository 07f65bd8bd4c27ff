//! Game map: terrain grid plus the units standing on it.
//!
//! This module contains:
//! - The terrain grid and silhouette carving
//! - Cell legality, walkability, and occupancy queries
//! - Ability target validation
//! - Pixel to hex conversion for a given viewport
//! - Snapshot dump/load

use crate::catalog::{Ability, CatalogError, TargetMode};
use crate::hex::{HexCoord, Viewport};
use crate::tile::Tile;
use crate::unit::{Seat, Unit, UnitSnapshot};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building or loading a map
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MapError {
    #[error("Map has no cells")]
    EmptyGrid,

    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Cell ({}, {}) is not on the map", .0.q, .0.r)]
    OffGrid(HexCoord),

    #[error("Cell ({}, {}) is already occupied", .0.q, .0.r)]
    Occupied(HexCoord),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Wire form of a map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSnapshot {
    /// Terrain, row-major
    pub terrain: Vec<Vec<Tile>>,
    pub units: Vec<UnitSnapshot>,
}

/// The game map
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    rows: usize,
    cols: usize,
    /// Terrain indexed as `terrain[row][col]`
    terrain: Vec<Vec<Tile>>,
    /// Units in placement order; at most one per cell
    units: Vec<Unit>,
}

impl Map {
    /// Create a map of open ground
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            terrain: vec![vec![Tile::Normal; cols]; rows],
            units: Vec::new(),
        }
    }

    /// Create a map where each cell is a wall with probability `wall_chance`
    pub fn generate<R: Rng>(rows: usize, cols: usize, wall_chance: f64, rng: &mut R) -> Self {
        let wall_chance = wall_chance.clamp(0.0, 1.0);
        let mut map = Self::new(rows, cols);
        for row in map.terrain.iter_mut() {
            for tile in row.iter_mut() {
                if rng.gen_bool(wall_chance) {
                    *tile = Tile::Wall;
                }
            }
        }
        map
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Center cell of the storage grid
    pub fn center(&self) -> HexCoord {
        HexCoord::from_offset(self.rows / 2, self.cols / 2)
    }

    /// Largest radius whose hexagon fits in the grid
    pub fn default_radius(&self) -> u32 {
        (self.rows.min(self.cols).saturating_sub(1) / 2) as u32
    }

    /// Distance between two cells in hex steps
    pub fn distance(&self, a: HexCoord, b: HexCoord) -> u32 {
        a.distance_to(&b)
    }

    /// Mark every cell farther than `radius` from the center as [`Tile::Empty`]
    pub fn carve_shape(&mut self, radius: u32) {
        let center = self.center();
        for (row, tiles) in self.terrain.iter_mut().enumerate() {
            for (col, tile) in tiles.iter_mut().enumerate() {
                if HexCoord::from_offset(row, col).distance_to(&center) > radius {
                    *tile = Tile::Empty;
                }
            }
        }
    }

    /// Carve the largest hexagon that fits the grid
    pub fn carve_hexagon(&mut self) {
        self.carve_shape(self.default_radius());
    }

    /// Whether `pos` lies inside the storage grid
    pub fn in_bounds(&self, pos: HexCoord) -> bool {
        matches!(pos.to_offset(), Some((row, col)) if row < self.rows && col < self.cols)
    }

    /// Terrain at `pos`.
    ///
    /// Panics when `pos` is out of bounds; check [`Self::on_grid`] first.
    pub fn tile_at(&self, pos: HexCoord) -> Tile {
        self.terrain[pos.r as usize][pos.q as usize]
    }

    /// Set terrain at `pos`. Panics when `pos` is out of bounds.
    pub fn set_tile(&mut self, pos: HexCoord, tile: Tile) {
        self.terrain[pos.r as usize][pos.q as usize] = tile;
    }

    /// Whether `pos` is a legal board cell: inside the grid and not carved away
    pub fn on_grid(&self, pos: HexCoord) -> bool {
        self.in_bounds(pos) && self.tile_at(pos) != Tile::Empty
    }

    /// Whether a unit could step onto `pos` right now
    pub fn tile_walkable(&self, pos: HexCoord) -> bool {
        self.on_grid(pos) && self.tile_at(pos).is_walkable() && self.tile_unit(pos).is_none()
    }

    /// The unit standing on `pos`, if any
    pub fn tile_unit(&self, pos: HexCoord) -> Option<&Unit> {
        self.units.iter().find(|u| u.pos == pos)
    }

    pub(crate) fn tile_unit_mut(&mut self, pos: HexCoord) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.pos == pos)
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub(crate) fn units_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.iter_mut()
    }

    /// Place a unit on an empty, legal cell
    pub fn add_unit(&mut self, unit: Unit) -> Result<(), MapError> {
        if !self.on_grid(unit.pos) {
            return Err(MapError::OffGrid(unit.pos));
        }
        if self.tile_unit(unit.pos).is_some() {
            return Err(MapError::Occupied(unit.pos));
        }
        self.units.push(unit);
        Ok(())
    }

    /// Every in-bounds cell, row by row
    pub fn cells(&self) -> impl Iterator<Item = HexCoord> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.cols).map(move |col| HexCoord::from_offset(row, col))
        })
    }

    /// A uniformly chosen cell of the given terrain, or `None` if there is none
    pub fn random_tile<R: Rng>(&self, kind: Tile, rng: &mut R) -> Option<HexCoord> {
        let matching: Vec<HexCoord> = self
            .cells()
            .filter(|&pos| self.tile_at(pos) == kind)
            .collect();
        matching.choose(rng).copied()
    }

    /// A uniformly chosen cell a unit could be placed on
    pub fn random_open_tile<R: Rng>(&self, rng: &mut R) -> Option<HexCoord> {
        let open: Vec<HexCoord> = self
            .cells()
            .filter(|&pos| self.tile_walkable(pos))
            .collect();
        open.choose(rng).copied()
    }

    /// Whether a unit of `seat` standing on `caster` may aim `ability` at `target`
    pub fn valid_target(
        &self,
        caster: HexCoord,
        seat: Seat,
        ability: &Ability,
        target: HexCoord,
    ) -> bool {
        if !self.on_grid(target) || self.distance(caster, target) > ability.effective_range() {
            return false;
        }

        let occupant = self.tile_unit(target);
        match ability.target {
            TargetMode::SelfOnly => target == caster,
            TargetMode::Tile => self.tile_walkable(target),
            TargetMode::Unit => occupant.is_some(),
            TargetMode::Ally => occupant.is_some_and(|u| u.is_controlled_by(seat)),
            TargetMode::Enemy => occupant.is_some_and(|u| !u.is_controlled_by(seat)),
        }
    }

    /// The cell under canvas position `(px, py)` as drawn through `viewport`.
    ///
    /// The result may be off the grid; check [`Self::on_grid`].
    pub fn pixel_to_hex(&self, px: f64, py: f64, viewport: &Viewport) -> HexCoord {
        viewport.pixel_to_hex(px, py)
    }

    /// Canvas position of the center of `pos` as drawn through `viewport`
    pub fn hex_to_pixel(&self, pos: HexCoord, viewport: &Viewport) -> (f64, f64) {
        viewport.hex_to_pixel(pos)
    }

    pub fn dump(&self) -> MapSnapshot {
        MapSnapshot {
            terrain: self.terrain.clone(),
            units: self.units.iter().map(Unit::dump).collect(),
        }
    }

    /// Rebuild a map from a snapshot, re-deriving unit stats from the catalog
    pub fn load(snapshot: MapSnapshot) -> Result<Self, MapError> {
        let rows = snapshot.terrain.len();
        let cols = snapshot.terrain.first().map_or(0, Vec::len);
        if rows == 0 || cols == 0 {
            return Err(MapError::EmptyGrid);
        }
        if let Some((row, tiles)) = snapshot
            .terrain
            .iter()
            .enumerate()
            .find(|(_, tiles)| tiles.len() != cols)
        {
            return Err(MapError::RaggedRow {
                row,
                expected: cols,
                found: tiles.len(),
            });
        }

        let mut map = Self {
            rows,
            cols,
            terrain: snapshot.terrain,
            units: Vec::with_capacity(snapshot.units.len()),
        };
        for unit in snapshot.units {
            map.add_unit(Unit::load(unit)?)?;
        }
        Ok(map)
    }
}
