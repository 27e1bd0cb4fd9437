//! Wire and domain types exchanged with the analysis service.
//!
//! Enum variants use English names; serde renames map them onto the values
//! the service speaks (`inflable`, `calma`, `seguridad`, ...).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::helpers::lenient_option;

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardType {
    #[serde(rename = "rigid")]
    Rigid,
    #[serde(rename = "inflable")]
    Inflatable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Experience {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddlePower {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionGoal {
    #[default]
    #[serde(rename = "calma")]
    Calm,
    #[serde(rename = "entrenamiento")]
    Training,
    #[serde(rename = "desafio")]
    Challenge,
}

impl BoardType {
    pub fn as_wire(&self) -> &'static str {
        match self {
            BoardType::Rigid => "rigid",
            BoardType::Inflatable => "inflable",
        }
    }
}

impl Experience {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Experience::Beginner => "beginner",
            Experience::Intermediate => "intermediate",
            Experience::Advanced => "advanced",
        }
    }
}

impl PaddlePower {
    pub fn as_wire(&self) -> &'static str {
        match self {
            PaddlePower::Low => "low",
            PaddlePower::Medium => "medium",
            PaddlePower::High => "high",
        }
    }
}

impl SessionGoal {
    pub fn as_wire(&self) -> &'static str {
        match self {
            SessionGoal::Calm => "calma",
            SessionGoal::Training => "entrenamiento",
            SessionGoal::Challenge => "desafio",
        }
    }
}

// Parsing accepts both the English name and the service's wire value.

impl FromStr for BoardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rigid" => Ok(BoardType::Rigid),
            "inflatable" | "inflable" => Ok(BoardType::Inflatable),
            other => Err(format!("unknown board type '{}'", other)),
        }
    }
}

impl FromStr for Experience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Experience::Beginner),
            "intermediate" => Ok(Experience::Intermediate),
            "advanced" => Ok(Experience::Advanced),
            other => Err(format!("unknown experience level '{}'", other)),
        }
    }
}

impl FromStr for PaddlePower {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(PaddlePower::Low),
            "medium" => Ok(PaddlePower::Medium),
            "high" => Ok(PaddlePower::High),
            other => Err(format!("unknown paddle power '{}'", other)),
        }
    }
}

impl FromStr for SessionGoal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calm" | "calma" => Ok(SessionGoal::Calm),
            "training" | "entrenamiento" => Ok(SessionGoal::Training),
            "challenge" | "desafio" => Ok(SessionGoal::Challenge),
            other => Err(format!("unknown session goal '{}'", other)),
        }
    }
}

/// The user's preference profile. Always replaced as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Profile {
    pub board_type: BoardType,
    pub experience: Experience,
    pub paddle_power: PaddlePower,
    #[serde(default)]
    pub session_goal: SessionGoal,
}

impl Profile {
    /// A copy of this profile with a different session goal.
    pub fn with_session_goal(self, session_goal: SessionGoal) -> Self {
        Self {
            session_goal,
            ..self
        }
    }
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

/// Wind direction relative to the shoreline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelativeDirection {
    /// Blowing toward shore.
    Onshore,
    /// Blowing away from shore.
    Offshore,
    /// Parallel to shore.
    Cross,
}

impl RelativeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelativeDirection::Onshore => "onshore",
            RelativeDirection::Offshore => "offshore",
            RelativeDirection::Cross => "cross",
        }
    }
}

impl FromStr for RelativeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onshore" => Ok(RelativeDirection::Onshore),
            "offshore" => Ok(RelativeDirection::Offshore),
            "cross" | "cross-shore" | "crossshore" => Ok(RelativeDirection::Cross),
            other => Err(format!("unknown relative direction '{}'", other)),
        }
    }
}

impl fmt::Display for RelativeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindData {
    pub speed_kmh: Option<f64>,
    /// Meteorological convention: direction the wind comes from, 0 = North.
    pub direction_deg: Option<f64>,
    /// Authoritative shore-relative category computed by the service.
    #[serde(default, deserialize_with = "lenient_option")]
    pub relative_direction: Option<RelativeDirection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaveData {
    pub height_m: Option<f64>,
    pub period_s: Option<f64>,
    pub direction_deg: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtmosphereData {
    pub temperature_c: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub cloud_cover_pct: Option<f64>,
    pub uv_index: Option<f64>,
    pub visibility_km: Option<f64>,
    /// WMO weather code
    pub weather_code: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TideState {
    Rising,
    Falling,
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideData {
    pub state: TideState,
}

fn default_provider() -> String {
    "openmeteo".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub wind: WindData,
    #[serde(default)]
    pub waves: WaveData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atmosphere: Option<AtmosphereData>,
    pub tide: TideData,
    /// ISO 8601 timestamp of the observation or forecast hour.
    pub timestamp: String,
    #[serde(default = "default_provider")]
    pub provider: String,
}

// ---------------------------------------------------------------------------
// Analysis result
// ---------------------------------------------------------------------------

/// Scores in 0..=100; higher safety means safer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    #[serde(rename = "seguridad")]
    pub safety: u8,
    #[serde(rename = "esfuerzo")]
    pub effort: u8,
    #[serde(rename = "disfrute")]
    pub enjoyment: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "bajo")]
    Low,
    #[serde(rename = "medio")]
    Medium,
    #[serde(rename = "alto")]
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Categories {
    #[serde(rename = "seguridad")]
    pub safety: Level,
    #[serde(rename = "esfuerzo")]
    pub effort: Level,
    #[serde(rename = "disfrute")]
    pub enjoyment: Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    #[serde(rename = "alta")]
    High,
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "baja")]
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Warning,
    Danger,
}

/// Alert flags raised by the service. Unknown flags don't fail the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertFlag {
    #[serde(rename = "viento_fuerte")]
    StrongWind,
    #[serde(rename = "riesgo_deriva")]
    DriftRisk,
    #[serde(rename = "olas_grandes")]
    LargeWaves,
    #[serde(rename = "principiante_condiciones_moderadas")]
    BeginnerModerateConditions,
    /// Falling tide combined with offshore wind at the home spot.
    #[serde(rename = "deriva_varese")]
    FallingTideOffshoreDrift,
    #[serde(rename = "uv_alto")]
    HighUv,
    #[serde(rename = "uv_extremo")]
    ExtremeUv,
    #[serde(other)]
    Unrecognized,
}

impl AlertFlag {
    pub fn severity(&self) -> AlertSeverity {
        match self {
            AlertFlag::DriftRisk | AlertFlag::FallingTideOffshoreDrift | AlertFlag::ExtremeUv => {
                AlertSeverity::Danger
            }
            _ => AlertSeverity::Warning,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AlertFlag::StrongWind => "Strong wind",
            AlertFlag::DriftRisk => "Drift risk",
            AlertFlag::LargeWaves => "Large waves",
            AlertFlag::BeginnerModerateConditions => "Moderate conditions for a beginner",
            AlertFlag::FallingTideOffshoreDrift => "Falling tide + offshore wind",
            AlertFlag::HighUv => "High UV index",
            AlertFlag::ExtremeUv => "Extreme UV index",
            AlertFlag::Unrecognized => "Unrecognised alert",
        }
    }
}

/// Pedagogical narrative attached to an analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticAnalysis {
    pub scenario_id: String,
    pub driver_desc: String,
    pub behavior_desc: String,
    pub body_desc: String,
    pub risk_desc: String,
    pub avoid_desc: String,
    pub visual_cues: Vec<String>,
    pub strategy_desc: String,
    pub beginner_tip: String,
    pub advanced_tip: String,
    pub learning_focus: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceFactors {
    pub data_completeness: f64,
    pub data_freshness: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub scores: Scores,
    pub categories: Categories,
    #[serde(default)]
    pub flags: Vec<AlertFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantics: Option<SemanticAnalysis>,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_factors: Option<ConfidenceFactors>,
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotInfo {
    pub name: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    #[serde(default)]
    pub timestamp: String,
    /// Display label for the hour, e.g. "14:00".
    pub hour_label: String,
    pub weather: WeatherSnapshot,
    pub result: AnalysisResult,
}

/// One fetch worth of timeline data. Index 0 is "now".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineDataset {
    pub spot: SpotInfo,
    pub timeline: Vec<TimelinePoint>,
}

// ---------------------------------------------------------------------------
// Other endpoints
// ---------------------------------------------------------------------------

/// Body shared by `/timeline` and `/analyze`.
#[derive(Debug, Serialize)]
pub struct SpotRequest<'a> {
    pub spot_id: &'a str,
    pub user: Option<&'a Profile>,
}

#[derive(Debug, Serialize)]
pub struct ExplanationRequest<'a> {
    pub user: &'a Profile,
    pub weather: &'a WeatherSnapshot,
    pub result: &'a AnalysisResult,
}

/// Single-point analysis from `/analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub spot: SpotInfo,
    pub weather: WeatherSnapshot,
    pub result: AnalysisResult,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExplanationResponse {
    /// Markdown text
    pub explanation: String,
    #[serde(default)]
    pub glossary_terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NearestSpot {
    pub spot_id: String,
    pub name: String,
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}
