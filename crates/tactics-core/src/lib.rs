//! Tactics - a multiplayer turn-based hex-grid tactics game engine
//!
//! This crate provides the core game logic, including:
//! - Hex coordinate system, pixel layout, and viewport transforms
//! - Map terrain, silhouette carving, and unit placement
//! - The static race and class catalog
//! - Game state machine with turn and action validation
//!
//! # Architecture
//!
//! The same engine runs on the server, which is authoritative, and on each
//! client, which validates and applies actions optimistically. It can be
//! compiled to:
//! - Native Rust for server-side game hosting
//! - WebAssembly for the browser client
//!
//! # Modules
//!
//! - [`hex`]: Axial hex coordinates, directions, and pixel conversion
//! - [`tile`]: Terrain kinds
//! - [`catalog`]: Race and class tables
//! - [`unit`]: Units and their per-turn counters
//! - [`map`]: Terrain grid, units, and targeting rules
//! - [`effect`]: Ability effect resolution
//! - [`actions`]: Player actions and resulting events
//! - [`game`]: Game state machine

pub mod actions;
pub mod catalog;
pub mod effect;
pub mod game;
pub mod hex;
pub mod map;
pub mod tile;
pub mod unit;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{Action, GameEvent};
pub use catalog::{Ability, AbilityKind, CatalogError, Effect, TargetMode, CATALOG_VERSION};
pub use effect::{EffectOutcome, EffectResolver, FixedDeltaResolver};
pub use game::{
    ClientId, GameConfig, GameError, GamePhase, GameSnapshot, GameState, GameSummary, StateUpdate,
    UnitSpec,
};
pub use hex::{Direction, HexCoord, Viewport, HEX_HEIGHT};
pub use map::{Map, MapError, MapSnapshot};
pub use tile::Tile;
pub use unit::{Seat, Unit, UnitSnapshot};
