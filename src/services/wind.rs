//! Wind direction classification for the home spot.
//!
//! Safety-critical: the shore-relative ranges below encode the coastline of
//! the deployment site (east-facing beach). Boundary ownership is explicit so
//! every angle lands in exactly one category.

use crate::models::{RelativeDirection, WindData};

/// Eight 45° sectors, each centred on its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinal {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

const CARDINALS: [Cardinal; 8] = [
    Cardinal::N,
    Cardinal::NE,
    Cardinal::E,
    Cardinal::SE,
    Cardinal::S,
    Cardinal::SW,
    Cardinal::W,
    Cardinal::NW,
];

impl Cardinal {
    /// Sector containing `degrees` (any real value; wrapped first).
    pub fn from_degrees(degrees: f64) -> Self {
        let index = (normalize_degrees(degrees) / 45.0).round() as usize % 8;
        CARDINALS[index]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Cardinal::N => "North",
            Cardinal::NE => "Northeast",
            Cardinal::E => "East",
            Cardinal::SE => "Southeast",
            Cardinal::S => "South",
            Cardinal::SW => "Southwest",
            Cardinal::W => "West",
            Cardinal::NW => "Northwest",
        }
    }

    pub fn abbr(&self) -> &'static str {
        match self {
            Cardinal::N => "N",
            Cardinal::NE => "NE",
            Cardinal::E => "E",
            Cardinal::SE => "SE",
            Cardinal::S => "S",
            Cardinal::SW => "SW",
            Cardinal::W => "W",
            Cardinal::NW => "NW",
        }
    }
}

/// Wrap any angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Geometric shore-relative category for the home spot.
///
/// - `[22.5, 157.5]` onshore
/// - `(157.5, 202.5)` cross
/// - `[202.5, 337.5]` offshore
/// - everything else (the northern sector) cross
pub fn shore_relative_direction(degrees: f64) -> RelativeDirection {
    let deg = normalize_degrees(degrees);

    if (22.5..=157.5).contains(&deg) {
        RelativeDirection::Onshore
    } else if deg > 157.5 && deg < 202.5 {
        RelativeDirection::Cross
    } else if (202.5..=337.5).contains(&deg) {
        RelativeDirection::Offshore
    } else {
        RelativeDirection::Cross
    }
}

/// Derived wind view for one timeline point. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindSafetyInfo {
    /// Direction as received (not normalized).
    pub degrees: f64,
    /// Unknown speed stays unknown.
    pub speed_kmh: Option<f64>,
    /// Where the wind comes from.
    pub cardinal: Cardinal,
    /// Where the wind blows toward.
    pub opposite: Cardinal,
    pub relative_direction: RelativeDirection,
    pub is_offshore: bool,
    pub is_onshore: bool,
}

impl WindSafetyInfo {
    /// e.g. "West (W)"
    pub fn cardinal_label(&self) -> String {
        format!("{} ({})", self.cardinal.name(), self.cardinal.abbr())
    }

    /// e.g. "West (W) → toward East"
    pub fn from_to_label(&self) -> String {
        format!("{} → toward {}", self.cardinal_label(), self.opposite.name())
    }
}

/// Classification result; a missing angle is reported, not guessed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindReading {
    Known(WindSafetyInfo),
    Unknown,
}

impl WindReading {
    pub fn info(&self) -> Option<&WindSafetyInfo> {
        match self {
            WindReading::Known(info) => Some(info),
            WindReading::Unknown => None,
        }
    }

    pub fn relative_direction(&self) -> Option<RelativeDirection> {
        self.info().map(|i| i.relative_direction)
    }
}

/// Classify a wind direction.
///
/// When `authoritative` is supplied (the service's own category) it wins for
/// `relative_direction`, keeping alerts and visualizers consistent; the
/// cardinal labels are always computed locally.
pub fn classify(
    degrees: Option<f64>,
    speed_kmh: Option<f64>,
    authoritative: Option<RelativeDirection>,
) -> WindReading {
    let Some(degrees) = degrees.filter(|d| d.is_finite()) else {
        return WindReading::Unknown;
    };

    let relative_direction = authoritative.unwrap_or_else(|| shore_relative_direction(degrees));

    WindReading::Known(WindSafetyInfo {
        degrees,
        speed_kmh: speed_kmh.filter(|s| s.is_finite()),
        cardinal: Cardinal::from_degrees(degrees),
        opposite: Cardinal::from_degrees(degrees + 180.0),
        relative_direction,
        is_offshore: relative_direction == RelativeDirection::Offshore,
        is_onshore: relative_direction == RelativeDirection::Onshore,
    })
}

/// Classify the wind of a weather snapshot, honouring the service's category.
pub fn classify_wind(wind: &WindData) -> WindReading {
    classify(wind.direction_deg, wind.speed_kmh, wind.relative_direction)
}
