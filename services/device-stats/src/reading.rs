//! Sensor readings and the time window used to select them

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Parse an RFC 3339 instant, or an ISO 8601 date-time without offset as UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(&Utc));
    }
    value
        .parse::<NaiveDateTime>()
        .ok()
        .map(|naive| naive.and_utc())
}

/// Serde helper for optional timestamps accepted in either form of [`parse_timestamp`]
pub(crate) fn deserialize_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(value) => parse_timestamp(&value).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid timestamp '{}'", value))
        }),
    }
}

/// One timestamped 3-axis sample belonging to a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    /// Internal id of the owning device
    pub device_id: i64,
    pub timestamp: DateTime<Utc>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Payload for ingesting a new reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Defaults to the ingestion instant when absent
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewReading {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Reject NaN and infinite axis values
    pub fn validate(&self) -> crate::Result<()> {
        for (axis, value) in [("x", self.x), ("y", self.y), ("z", self.z)] {
            if !value.is_finite() {
                return Err(crate::StatsError::InvalidInput(format!(
                    "{} must be a finite number, got {}",
                    axis, value
                )));
            }
        }
        Ok(())
    }
}

/// Optional inclusive time bounds for selecting readings.
///
/// A missing bound is unbounded on that side. A window whose start lies after
/// its end is accepted as-is and simply matches nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsWindow {
    #[serde(
        default,
        rename = "start_time",
        deserialize_with = "deserialize_timestamp"
    )]
    pub start: Option<DateTime<Utc>>,
    #[serde(
        default,
        rename = "end_time",
        deserialize_with = "deserialize_timestamp"
    )]
    pub end: Option<DateTime<Utc>>,
}

impl StatsWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Whether `timestamp` falls inside the window, bounds included
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| timestamp >= start)
            && self.end.is_none_or(|end| timestamp <= end)
    }
}
