//! Hex coordinate system using axial coordinates (q, r).
//!
//! The map stores terrain row-major, and a cell at `(row, col)` is the axial
//! hex `q = col, r = row`. The rectangular storage is therefore a rhombus of
//! hexes; carving trims it into a hexagon. The implicit cube coordinate
//! `s = -q - r` makes distance a simple max of three deltas.
//!
//! Pixel conversion follows the renderer's pointy-top layout: a hex is
//! [`HEX_HEIGHT`] pixels tall at scale 1, row `r` is shifted right by half a
//! hex width per row.

use serde::{Deserialize, Serialize};

/// Height of one hex in pixels at scale 1.0
pub const HEX_HEIGHT: f64 = 200.0;

/// One of the six neighbor directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Right
    East,
    /// Up and to the right
    NorthEast,
    /// Up and to the left
    NorthWest,
    /// Left
    West,
    /// Down and to the left
    SouthWest,
    /// Down and to the right
    SouthEast,
}

impl Direction {
    /// All directions in counter-clockwise order starting from East
    pub const ALL: [Direction; 6] = [
        Direction::East,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::West,
        Direction::SouthWest,
        Direction::SouthEast,
    ];

    /// Axial `(dq, dr)` step for this direction
    pub const fn delta(&self) -> (i32, i32) {
        match self {
            Direction::East => (1, 0),
            Direction::NorthEast => (1, -1),
            Direction::NorthWest => (0, -1),
            Direction::West => (-1, 0),
            Direction::SouthWest => (-1, 1),
            Direction::SouthEast => (0, 1),
        }
    }

    pub const fn opposite(&self) -> Direction {
        match self {
            Direction::East => Direction::West,
            Direction::NorthEast => Direction::SouthWest,
            Direction::NorthWest => Direction::SouthEast,
            Direction::West => Direction::East,
            Direction::SouthWest => Direction::NorthEast,
            Direction::SouthEast => Direction::NorthWest,
        }
    }
}

/// Axial coordinate for a map cell.
///
/// - `q` is the storage column
/// - `r` is the storage row
/// - The third cube coordinate `s` (not stored) satisfies: q + r + s = 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct HexCoord {
    /// Column
    pub q: i32,
    /// Row
    pub r: i32,
}

impl HexCoord {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Coordinate of the cell stored at `(row, col)`
    pub const fn from_offset(row: usize, col: usize) -> Self {
        Self::new(col as i32, row as i32)
    }

    /// Storage `(row, col)` of this cell, or `None` for negative coordinates
    pub fn to_offset(&self) -> Option<(usize, usize)> {
        let row = usize::try_from(self.r).ok()?;
        let col = usize::try_from(self.q).ok()?;
        Some((row, col))
    }

    /// The implicit third coordinate (s = -q - r)
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// The six neighboring hexes in [`Direction::ALL`] order
    pub fn neighbors(&self) -> [HexCoord; 6] {
        Direction::ALL.map(|dir| self.neighbor(dir))
    }

    pub fn neighbor(&self, direction: Direction) -> HexCoord {
        let (dq, dr) = direction.delta();
        HexCoord::new(self.q + dq, self.r + dr)
    }

    /// Distance to another hex in steps: the largest of the three cube deltas
    pub fn distance_to(&self, other: &HexCoord) -> u32 {
        let dq = (self.q - other.q).unsigned_abs();
        let dr = (self.r - other.r).unsigned_abs();
        let ds = (self.s() - other.s()).unsigned_abs();
        dq.max(dr).max(ds)
    }

    /// Convert to pixel coordinates of the hex's layout anchor.
    /// Uses pointy-top orientation with the given hex size (radius)
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let x = hex_size * (3.0_f64.sqrt() * self.q as f64 + 3.0_f64.sqrt() / 2.0 * self.r as f64);
        let y = hex_size * (3.0 / 2.0 * self.r as f64);
        (x, y)
    }

    /// Convert from pixel coordinates to hex (may need rounding)
    pub fn from_pixel(x: f64, y: f64, hex_size: f64) -> Self {
        let q = (3.0_f64.sqrt() / 3.0 * x - 1.0 / 3.0 * y) / hex_size;
        let r = (2.0 / 3.0 * y) / hex_size;
        Self::axial_round(q, r)
    }

    /// Round fractional axial coordinates to nearest hex
    fn axial_round(q: f64, r: f64) -> Self {
        let s = -q - r;

        let mut rq = q.round();
        let mut rr = r.round();
        let rs = s.round();

        let q_diff = (rq - q).abs();
        let r_diff = (rr - r).abs();
        let s_diff = (rs - s).abs();

        // The component with the largest rounding error is rebuilt from the
        // other two so that q + r + s stays 0.
        if q_diff > r_diff && q_diff > s_diff {
            rq = -rr - rs;
        } else if r_diff > s_diff {
            rr = -rq - rs;
        }

        Self::new(rq as i32, rr as i32)
    }
}

/// How the map is placed on a canvas.
///
/// The map pixel `(offset_x, offset_y)` is drawn at canvas `(origin_x,
/// origin_y)`, and everything is multiplied by `scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub origin_x: f64,
    pub origin_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 1.0,
        }
    }
}

impl Viewport {
    fn hex_size() -> f64 {
        HEX_HEIGHT / 2.0
    }

    fn hex_width() -> f64 {
        3.0_f64.sqrt() * Self::hex_size()
    }

    /// Canvas position of the center of `hex`
    pub fn hex_to_pixel(&self, hex: HexCoord) -> (f64, f64) {
        let (ax, ay) = hex.to_pixel(Self::hex_size());
        let map_x = ax + Self::hex_width() / 2.0;
        let map_y = ay + Self::hex_size();
        (
            map_x * self.scale - self.offset_x + self.origin_x,
            map_y * self.scale - self.offset_y + self.origin_y,
        )
    }

    /// The hex containing canvas position `(px, py)`; inverse of [`Self::hex_to_pixel`]
    pub fn pixel_to_hex(&self, px: f64, py: f64) -> HexCoord {
        let map_x = (px + self.offset_x - self.origin_x) / self.scale;
        let map_y = (py + self.offset_y - self.origin_y) / self.scale;
        HexCoord::from_pixel(
            map_x - Self::hex_width() / 2.0,
            map_y - Self::hex_size(),
            Self::hex_size(),
        )
    }
}
