//! Resolution of raw `maxspeed` style annotations into km/h.
//!
//! Road data records speed limits as free text, sometimes several per
//! segment. Anything that cannot be read degrades to the configured default
//! speed, so resolution never fails and always yields a positive speed.

use serde::{Deserialize, Serialize};

pub const MPH_TO_KPH: f64 = 1.60934;

/// Speed limit annotation as it appears on a raw segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpeedAnnotation {
    Single(String),
    Multiple(Vec<String>),
}

impl From<&str> for SpeedAnnotation {
    fn from(value: &str) -> Self {
        SpeedAnnotation::Single(value.to_string())
    }
}

impl<S: Into<String>> From<Vec<S>> for SpeedAnnotation {
    fn from(values: Vec<S>) -> Self {
        SpeedAnnotation::Multiple(values.into_iter().map(Into::into).collect())
    }
}

/// Resolves an optional annotation to a speed in km/h.
///
/// A list of limits resolves to the arithmetic mean of its entries, each of
/// which is resolved on its own (so an unreadable entry contributes the
/// default speed).
pub fn resolve(annotation: Option<&SpeedAnnotation>, default_speed_kmh: f64) -> f64 {
    match annotation {
        None => default_speed_kmh,
        Some(SpeedAnnotation::Single(raw)) => parse_maxspeed(raw, default_speed_kmh),
        Some(SpeedAnnotation::Multiple(raws)) if raws.is_empty() => default_speed_kmh,
        Some(SpeedAnnotation::Multiple(raws)) => {
            let total: f64 = raws
                .iter()
                .map(|raw| parse_maxspeed(raw, default_speed_kmh))
                .sum();
            total / raws.len() as f64
        }
    }
}

/// Parses `"<number> [unit]"`. Only `mph` converts; any other unit is km/h.
fn parse_maxspeed(maxspeed: &str, default_speed_kmh: f64) -> f64 {
    let mut tokens = maxspeed.split_whitespace();

    let speed = match tokens.next().map(str::parse::<f64>) {
        Some(Ok(speed)) if speed.is_finite() && speed > 0.0 => speed,
        _ => return default_speed_kmh,
    };

    match tokens.next() {
        Some(unit) if unit.eq_ignore_ascii_case("mph") => speed * MPH_TO_KPH,
        _ => speed,
    }
}
