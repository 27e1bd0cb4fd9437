//! Display-ready projection of the orchestrator state.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::models::{AlertFlag, AlertSeverity, Categories, Confidence, Scores};
use crate::services::orchestrator::{FetchState, LoadPhase};
use crate::services::timeline::DataFreshness;
use crate::services::wind::{classify_wind, WindReading};

#[derive(Debug, Clone, PartialEq)]
pub struct AlertView {
    pub flag: AlertFlag,
    pub severity: AlertSeverity,
    pub description: &'static str,
}

/// Everything needed to render the selected hour.
#[derive(Debug, Clone, PartialEq)]
pub struct PointView {
    pub spot_name: String,
    pub selected_index: usize,
    pub hour_label: String,
    pub is_forecast: bool,
    pub freshness: DataFreshness,
    pub scores: Scores,
    pub categories: Categories,
    pub confidence: Confidence,
    pub wind: WindReading,
    pub alerts: Vec<AlertView>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionsView {
    Idle,
    Loading { cold_start: bool },
    Error { message: String },
    Ready(PointView),
}

impl ConditionsView {
    pub fn from_state(state: &FetchState) -> Self {
        Self::from_state_at(state, Utc::now())
    }

    pub fn from_state_at(state: &FetchState, now: DateTime<Utc>) -> Self {
        match &state.phase {
            LoadPhase::Idle => ConditionsView::Idle,
            LoadPhase::Loading => ConditionsView::Loading {
                cold_start: state.cold_start_visible,
            },
            LoadPhase::Error(message) => ConditionsView::Error {
                message: message.clone(),
            },
            LoadPhase::Success(dataset) => {
                let selector = &state.selector;
                let Some(point) = selector.selected_point() else {
                    return ConditionsView::Error {
                        message: "The service returned no forecast hours.".to_string(),
                    };
                };

                // Danger alerts first
                let mut alerts: Vec<AlertView> = point
                    .result
                    .flags
                    .iter()
                    .map(|flag| AlertView {
                        flag: *flag,
                        severity: flag.severity(),
                        description: flag.description(),
                    })
                    .collect();
                alerts.sort_by_key(|a| a.severity != AlertSeverity::Danger);

                ConditionsView::Ready(PointView {
                    spot_name: dataset.spot.name.clone(),
                    selected_index: selector.selected_index(),
                    hour_label: point.hour_label.clone(),
                    is_forecast: selector.is_forecast(),
                    freshness: selector.data_freshness_at(now),
                    scores: point.result.scores,
                    categories: point.result.categories,
                    confidence: point.result.confidence,
                    wind: classify_wind(&point.weather.wind),
                    alerts,
                })
            }
        }
    }
}

impl fmt::Display for ConditionsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionsView::Idle => write!(f, "No data loaded."),
            ConditionsView::Loading { cold_start: true } => {
                write!(f, "Waking up the server, this can take up to a minute...")
            }
            ConditionsView::Loading { cold_start: false } => write!(f, "Loading..."),
            ConditionsView::Error { message } => write!(f, "Error: {}", message),
            ConditionsView::Ready(point) => fmt::Display::fmt(point, f),
        }
    }
}

impl fmt::Display for PointView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let when = if self.is_forecast { "forecast" } else { "now" };
        writeln!(f, "{} @ {} ({})", self.spot_name, self.hour_label, when)?;
        match self.freshness {
            DataFreshness::Stale => writeln!(f, "  data is more than an hour old")?,
            DataFreshness::Unknown => writeln!(f, "  data age unknown")?,
            DataFreshness::Fresh => {}
        }
        writeln!(
            f,
            "  safety {} ({}), effort {} ({}), enjoyment {} ({})",
            self.scores.safety,
            self.categories.safety,
            self.scores.effort,
            self.categories.effort,
            self.scores.enjoyment,
            self.categories.enjoyment
        )?;
        match &self.wind {
            WindReading::Known(info) => {
                let speed = info
                    .speed_kmh
                    .map(|s| format!("{:.0} km/h", s))
                    .unwrap_or_else(|| "? km/h".to_string());
                writeln!(
                    f,
                    "  wind {} from {} [{}]",
                    speed,
                    info.from_to_label(),
                    info.relative_direction
                )?;
            }
            WindReading::Unknown => writeln!(f, "  wind direction unknown")?,
        }
        for alert in &self.alerts {
            let marker = match alert.severity {
                AlertSeverity::Danger => "!!",
                AlertSeverity::Warning => "!",
            };
            writeln!(f, "  {} {}", marker, alert.description)?;
        }
        Ok(())
    }
}
