//! Sample service payloads shared by unit tests.

use chrono::{DateTime, Duration, Utc};

use crate::models::{BoardType, Experience, PaddlePower, Profile, SessionGoal, TimelineDataset};

pub(crate) fn profile(goal: SessionGoal) -> Profile {
    Profile {
        board_type: BoardType::Rigid,
        experience: Experience::Intermediate,
        paddle_power: PaddlePower::Medium,
        session_goal: goal,
    }
}

/// A `/timeline` response body with `points` hourly points starting at `start`.
pub(crate) fn timeline_json_at(points: usize, start: DateTime<Utc>) -> serde_json::Value {
    let timeline: Vec<serde_json::Value> = (0..points)
        .map(|i| {
            let ts = start + Duration::hours(i as i64);
            let speed = 12.0 + i as f64;
            let direction = 90 + (i as i64 * 30) % 270;
            let flags = if i == 0 {
                serde_json::json!([])
            } else {
                serde_json::json!(["viento_fuerte"])
            };
            serde_json::json!({
                "timestamp": ts.to_rfc3339(),
                "hour_label": ts.format("%H:%M").to_string(),
                "weather": {
                    "wind": {
                        "speed_kmh": speed,
                        "direction_deg": direction,
                        "relative_direction": "onshore"
                    },
                    "waves": { "height_m": 0.4, "period_s": 6.0, "direction_deg": 100 },
                    "atmosphere": { "temperature_c": 21.5, "uv_index": 4.0 },
                    "tide": { "state": "rising" },
                    "timestamp": ts.to_rfc3339(),
                    "provider": "openmeteo"
                },
                "result": {
                    "scores": { "seguridad": 80, "esfuerzo": 35, "disfrute": 70 },
                    "categories": { "seguridad": "alto", "esfuerzo": "bajo", "disfrute": "alto" },
                    "flags": flags,
                    "confidence": "alta"
                }
            })
        })
        .collect();

    serde_json::json!({
        "spot": { "name": "Varese", "lat": -38.014, "lon": -57.53 },
        "weather": timeline.first().map(|p| p["weather"].clone()),
        "current": timeline.first().map(|p| p["result"].clone()),
        "timeline": timeline
    })
}

pub(crate) fn timeline_json(points: usize) -> serde_json::Value {
    timeline_json_at(points, Utc::now())
}

pub(crate) fn dataset(points: usize) -> TimelineDataset {
    serde_json::from_value(timeline_json(points)).expect("fixture must deserialize")
}

pub(crate) fn dataset_at(points: usize, start: DateTime<Utc>) -> TimelineDataset {
    serde_json::from_value(timeline_json_at(points, start)).expect("fixture must deserialize")
}
