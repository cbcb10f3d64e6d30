//! Readings repository abstraction consumed by the analyzers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::reading::{Reading, StatsWindow};

/// Internal and external identifiers of a resolved device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceKey {
    pub id: i64,
    pub device_id: String,
}

/// Data access the analyzers depend on.
///
/// Implementations must return results in a deterministic order for
/// unchanged data. Failures are reported as [`crate::StatsError::Repository`]
/// and passed through by callers untouched.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadingsRepository: Send + Sync {
    /// Readings of a device whose timestamp lies inside `window`
    async fn list_readings(&self, device_id: i64, window: &StatsWindow)
        -> crate::Result<Vec<Reading>>;

    /// Devices owned by a user, in ownership order
    async fn list_device_ids_for_user(&self, user_id: i64) -> crate::Result<Vec<DeviceKey>>;

    /// Look up a device by its external identifier
    async fn resolve_device(&self, device_id: &str) -> crate::Result<Option<DeviceKey>>;

    /// Whether a user with this id exists
    async fn resolve_user(&self, user_id: i64) -> crate::Result<bool>;
}
