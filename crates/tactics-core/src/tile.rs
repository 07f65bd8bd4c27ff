//! Terrain kinds and their static properties.

use serde::{Deserialize, Serialize};

/// Terrain kind of a single map cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Tile {
    /// Outside the map silhouette; never drawn, never walkable
    Empty,
    /// Open ground
    #[default]
    Normal,
    /// Stone wall
    Wall,
    /// Water; blocks movement
    Water,
}

/// Static properties shared by every cell of a terrain kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileProperties {
    pub walkable: bool,
    /// Appearance tag handed to renderers (a CSS color)
    pub display_tag: &'static str,
}

impl Tile {
    /// All terrain kinds
    pub const ALL: [Tile; 4] = [Tile::Empty, Tile::Normal, Tile::Wall, Tile::Water];

    pub const fn properties(&self) -> TileProperties {
        match self {
            Tile::Empty => TileProperties {
                walkable: false,
                display_tag: "#000000",
            },
            Tile::Normal => TileProperties {
                walkable: true,
                display_tag: "#DDDDDD",
            },
            Tile::Wall => TileProperties {
                walkable: false,
                display_tag: "#888888",
            },
            Tile::Water => TileProperties {
                walkable: false,
                display_tag: "#3366AA",
            },
        }
    }

    pub const fn is_walkable(&self) -> bool {
        self.properties().walkable
    }

    pub const fn display_tag(&self) -> &'static str {
        self.properties().display_tag
    }
}
