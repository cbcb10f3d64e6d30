//! Device and user scope statistics analysis
//!
//! Both analyzers are stateless: every call reads the readings it needs from
//! the repository and reduces them with [`summarize`]. The user rollup pools
//! the raw values of every contributing device before reducing, since medians
//! cannot be combined from per-device summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::reading::{Reading, StatsWindow};
use crate::repository::ReadingsRepository;
use crate::summary::{summarize, AxisSummary};
use crate::{Result, StatsError};

/// Per-axis statistics for one selection of readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteStatsAnalysis {
    pub x: AxisSummary,
    pub y: AxisSummary,
    pub z: AxisSummary,
    /// Requested window start, not the timestamp of the earliest reading
    pub period_start: Option<DateTime<Utc>>,
    /// Requested window end, not the timestamp of the latest reading
    pub period_end: Option<DateTime<Utc>>,
}

/// Analysis of one device inside a user rollup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatsAnalysis {
    pub device_id: String,
    pub stats: CompleteStatsAnalysis,
}

/// Rollup over all devices of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatsAnalysis {
    pub user_id: i64,
    /// Statistics over the pooled readings of every contributing device
    pub aggregate_stats: CompleteStatsAnalysis,
    /// Devices with at least one reading in the window, in ownership order
    pub device_stats: Vec<DeviceStatsAnalysis>,
}

/// Result of an analysis of an entity that exists
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome<T> {
    Ready(T),
    /// The entity exists but no reading falls inside the window
    NoData,
}

impl<T> AnalysisOutcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            AnalysisOutcome::Ready(analysis) => Some(analysis),
            AnalysisOutcome::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, AnalysisOutcome::NoData)
    }
}

/// Values of the three axes, kept in reading order
#[derive(Debug, Default)]
struct AxisValues {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl AxisValues {
    fn from_readings(readings: &[Reading]) -> Self {
        let mut values = Self::default();
        values.extend(readings);
        values
    }

    fn extend(&mut self, readings: &[Reading]) {
        self.x.reserve(readings.len());
        self.y.reserve(readings.len());
        self.z.reserve(readings.len());
        for reading in readings {
            self.x.push(reading.x);
            self.y.push(reading.y);
            self.z.push(reading.z);
        }
    }

    fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    fn analyze(&self, window: &StatsWindow) -> CompleteStatsAnalysis {
        CompleteStatsAnalysis {
            x: summarize(&self.x),
            y: summarize(&self.y),
            z: summarize(&self.z),
            period_start: window.start,
            period_end: window.end,
        }
    }
}

fn check_cancelled(cancel: Option<&CancellationToken>) -> Result<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(StatsError::Cancelled),
        _ => Ok(()),
    }
}

/// Analyze the readings of a single device inside `window`.
///
/// Fails with [`StatsError::DeviceNotFound`] when the device does not resolve;
/// no readings are fetched in that case.
pub async fn analyze_device<R>(
    repo: &R,
    device_id: &str,
    window: &StatsWindow,
    cancel: Option<&CancellationToken>,
) -> Result<AnalysisOutcome<CompleteStatsAnalysis>>
where
    R: ReadingsRepository + ?Sized,
{
    check_cancelled(cancel)?;
    let device = repo
        .resolve_device(device_id)
        .await?
        .ok_or_else(|| StatsError::DeviceNotFound(device_id.to_string()))?;

    let readings = repo.list_readings(device.id, window).await?;
    tracing::debug!(
        "Device '{}': {} reading(s) in window {:?}..{:?}",
        device_id,
        readings.len(),
        window.start,
        window.end
    );
    if readings.is_empty() {
        return Ok(AnalysisOutcome::NoData);
    }

    Ok(AnalysisOutcome::Ready(
        AxisValues::from_readings(&readings).analyze(window),
    ))
}

/// Analyze every device of a user inside `window` and roll them up.
///
/// Fails with [`StatsError::UserNotFound`] when the user does not resolve or
/// owns no devices. Devices without readings in the window are left out of
/// both the breakdown and the aggregate.
pub async fn analyze_user<R>(
    repo: &R,
    user_id: i64,
    window: &StatsWindow,
    cancel: Option<&CancellationToken>,
) -> Result<AnalysisOutcome<UserStatsAnalysis>>
where
    R: ReadingsRepository + ?Sized,
{
    check_cancelled(cancel)?;
    if !repo.resolve_user(user_id).await? {
        return Err(StatsError::UserNotFound(user_id));
    }
    let devices = repo.list_device_ids_for_user(user_id).await?;
    if devices.is_empty() {
        return Err(StatsError::UserNotFound(user_id));
    }

    let mut pooled = AxisValues::default();
    let mut device_stats = Vec::new();
    for device in devices {
        check_cancelled(cancel)?;
        let readings = repo.list_readings(device.id, window).await?;
        if readings.is_empty() {
            tracing::debug!(
                "User {}: device '{}' has no readings in window, skipping",
                user_id,
                device.device_id
            );
            continue;
        }

        pooled.extend(&readings);
        device_stats.push(DeviceStatsAnalysis {
            stats: AxisValues::from_readings(&readings).analyze(window),
            device_id: device.device_id,
        });
    }

    if pooled.is_empty() {
        return Ok(AnalysisOutcome::NoData);
    }

    tracing::debug!(
        "User {}: {} reading(s) pooled from {} device(s)",
        user_id,
        pooled.x.len(),
        device_stats.len()
    );
    Ok(AnalysisOutcome::Ready(UserStatsAnalysis {
        user_id,
        aggregate_stats: pooled.analyze(window),
        device_stats,
    }))
}
