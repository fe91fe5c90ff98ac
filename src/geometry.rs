//! Canvas points and compass orientations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A point in canvas coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// The compass side of a symbol a handle sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Top,
    Right,
    Bottom,
    Left,
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid orientation: {0} (expected top, right, bottom or left)")]
pub struct OrientationParseError(pub String);

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Top,
        Orientation::Right,
        Orientation::Bottom,
        Orientation::Left,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
        }
    }

    /// Unit vector pointing away from the symbol.
    pub fn outward(self) -> (f64, f64) {
        match self {
            Self::Top => (0.0, -1.0),
            Self::Right => (1.0, 0.0),
            Self::Bottom => (0.0, 1.0),
            Self::Left => (-1.0, 0.0),
        }
    }

    /// Unit vector pointing into the symbol.
    pub fn inward(self) -> (f64, f64) {
        let (dx, dy) = self.outward();
        (-dx, -dy)
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// Move `point` `distance` pixels into the symbol.
    pub fn nudge_inward(self, point: Point, distance: f64) -> Point {
        let (dx, dy) = self.inward();
        point.translate(dx * distance, dy * distance)
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = OrientationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "right" => Ok(Self::Right),
            "bottom" => Ok(Self::Bottom),
            "left" => Ok(Self::Left),
            _ => Err(OrientationParseError(s.to_string())),
        }
    }
}
