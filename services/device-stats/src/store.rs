//! In-memory store for users, devices and readings
//!
//! Backs both the HTTP resource endpoints and the [`ReadingsRepository`] the
//! analyzers consume. Data lives for the lifetime of the process.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::RwLock;

use crate::reading::{NewReading, Reading, StatsWindow};
use crate::repository::{DeviceKey, ReadingsRepository};
use crate::{Result, StatsError};

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$";

/// Check that `email` is a syntactically valid address
fn validate_email(email: &str) -> Result<()> {
    let pattern = Regex::new(EMAIL_PATTERN)
        .map_err(|e| StatsError::Config(format!("Invalid email pattern: {}", e)))?;
    if email.len() > 254 || !pattern.is_match(email) {
        return Err(StatsError::InvalidInput(format!(
            "email is not a valid address: {}",
            email
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<()> {
        match &self.email {
            Some(email) => validate_email(email),
            None => Ok(()),
        }
    }
}

/// A user together with the devices it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserWithDevices {
    #[serde(flatten)]
    pub user: User,
    pub devices: Vec<Device>,
}

/// A registered device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Internal id, assigned by the store
    pub id: i64,
    /// External identifier reported by the device
    pub device_id: String,
    pub name: Option<String>,
    pub user_id: Option<i64>,
}

impl Device {
    fn key(&self) -> DeviceKey {
        DeviceKey {
            id: self.id,
            device_id: self.device_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDevice {
    pub device_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Partial device update.
///
/// An absent field is left unchanged; an explicit `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceUpdate {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<Option<i64>>,
}

/// Wrap a field that was present in the payload, `null` included
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default)]
struct StoreData {
    users: BTreeMap<i64, User>,
    // Keyed by internal id, so iteration follows creation order.
    devices: BTreeMap<i64, Device>,
    readings: BTreeMap<i64, Vec<Reading>>,
    next_user_id: i64,
    next_device_id: i64,
    next_reading_id: i64,
}

impl StoreData {
    fn device_by_external_id(&self, device_id: &str) -> Option<&Device> {
        self.devices.values().find(|d| d.device_id == device_id)
    }

    fn check_user_unique(&self, username: &str, email: &str, except: Option<i64>) -> Result<()> {
        let others: Vec<&User> = self
            .users
            .values()
            .filter(|u| Some(u.id) != except)
            .collect();
        if others.iter().any(|u| u.email == email) {
            return Err(StatsError::Conflict("Email already registered".to_string()));
        }
        if others.iter().any(|u| u.username == username) {
            return Err(StatsError::Conflict("Username already taken".to_string()));
        }
        Ok(())
    }

    fn check_owner(&self, user_id: Option<i64>) -> Result<()> {
        match user_id {
            Some(id) if !self.users.contains_key(&id) => Err(StatsError::UserNotFound(id)),
            _ => Ok(()),
        }
    }

    fn remove_device(&mut self, id: i64) {
        self.devices.remove(&id);
        self.readings.remove(&id);
    }
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<StoreData>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        new_user.validate()?;

        let mut data = self.data.write().await;
        data.check_user_unique(&new_user.username, &new_user.email, None)?;

        data.next_user_id += 1;
        let user = User {
            id: data.next_user_id,
            username: new_user.username,
            email: new_user.email,
        };
        data.users.insert(user.id, user.clone());
        tracing::debug!("Created user {} ({})", user.id, user.username);
        Ok(user)
    }

    pub async fn list_users(&self, skip: usize, limit: usize) -> Vec<User> {
        let data = self.data.read().await;
        data.users.values().skip(skip).take(limit).cloned().collect()
    }

    pub async fn get_user(&self, user_id: i64) -> Option<UserWithDevices> {
        let data = self.data.read().await;
        let user = data.users.get(&user_id)?.clone();
        let devices = data
            .devices
            .values()
            .filter(|d| d.user_id == Some(user_id))
            .cloned()
            .collect();
        Some(UserWithDevices { user, devices })
    }

    pub async fn update_user(&self, user_id: i64, update: UserUpdate) -> Result<User> {
        update.validate()?;

        let mut data = self.data.write().await;
        let current = data
            .users
            .get(&user_id)
            .cloned()
            .ok_or(StatsError::UserNotFound(user_id))?;

        let username = update.username.unwrap_or(current.username);
        let email = update.email.unwrap_or(current.email);
        data.check_user_unique(&username, &email, Some(user_id))?;

        let user = User {
            id: user_id,
            username,
            email,
        };
        data.users.insert(user_id, user.clone());
        Ok(user)
    }

    /// Delete a user along with its devices and their readings
    pub async fn delete_user(&self, user_id: i64) -> Result<()> {
        let mut data = self.data.write().await;
        if data.users.remove(&user_id).is_none() {
            return Err(StatsError::UserNotFound(user_id));
        }

        let owned: Vec<i64> = data
            .devices
            .values()
            .filter(|d| d.user_id == Some(user_id))
            .map(|d| d.id)
            .collect();
        for id in &owned {
            data.remove_device(*id);
        }
        tracing::debug!("Deleted user {} and {} device(s)", user_id, owned.len());
        Ok(())
    }

    pub async fn create_device(&self, new_device: NewDevice) -> Result<Device> {
        let mut data = self.data.write().await;
        if data.device_by_external_id(&new_device.device_id).is_some() {
            return Err(StatsError::Conflict(
                "Device with this ID already exists".to_string(),
            ));
        }
        data.check_owner(new_device.user_id)?;

        data.next_device_id += 1;
        let device = Device {
            id: data.next_device_id,
            device_id: new_device.device_id,
            name: new_device.name,
            user_id: new_device.user_id,
        };
        data.devices.insert(device.id, device.clone());
        tracing::debug!("Created device '{}' (id {})", device.device_id, device.id);
        Ok(device)
    }

    pub async fn list_devices(&self, skip: usize, limit: usize) -> Vec<Device> {
        let data = self.data.read().await;
        data.devices.values().skip(skip).take(limit).cloned().collect()
    }

    pub async fn get_device(&self, device_id: &str) -> Option<Device> {
        let data = self.data.read().await;
        data.device_by_external_id(device_id).cloned()
    }

    pub async fn update_device(&self, device_id: &str, update: DeviceUpdate) -> Result<Device> {
        let mut data = self.data.write().await;
        let id = data
            .device_by_external_id(device_id)
            .map(|d| d.id)
            .ok_or_else(|| StatsError::DeviceNotFound(device_id.to_string()))?;
        data.check_owner(update.user_id.flatten())?;

        let device = data
            .devices
            .get_mut(&id)
            .ok_or_else(|| StatsError::DeviceNotFound(device_id.to_string()))?;
        if let Some(name) = update.name {
            device.name = name;
        }
        if let Some(user_id) = update.user_id {
            device.user_id = user_id;
        }
        Ok(device.clone())
    }

    /// Delete a device along with its readings
    pub async fn delete_device(&self, device_id: &str) -> Result<()> {
        let mut data = self.data.write().await;
        let id = data
            .device_by_external_id(device_id)
            .map(|d| d.id)
            .ok_or_else(|| StatsError::DeviceNotFound(device_id.to_string()))?;
        data.remove_device(id);
        tracing::debug!("Deleted device '{}'", device_id);
        Ok(())
    }

    /// Store a reading for a device, stamping it with the current time if needed
    pub async fn add_reading(&self, device_id: &str, new_reading: NewReading) -> Result<Reading> {
        new_reading.validate()?;

        let mut data = self.data.write().await;
        let owner = data
            .device_by_external_id(device_id)
            .map(|d| d.id)
            .ok_or_else(|| StatsError::DeviceNotFound(device_id.to_string()))?;

        data.next_reading_id += 1;
        let reading = Reading {
            id: data.next_reading_id,
            device_id: owner,
            timestamp: new_reading.timestamp.unwrap_or_else(Utc::now),
            x: new_reading.x,
            y: new_reading.y,
            z: new_reading.z,
        };
        data.readings.entry(owner).or_default().push(reading.clone());
        Ok(reading)
    }

    /// Readings of a device inside `window`, newest first
    pub async fn list_device_readings(
        &self,
        device_id: &str,
        window: &StatsWindow,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Reading>> {
        let data = self.data.read().await;
        let owner = data
            .device_by_external_id(device_id)
            .map(|d| d.id)
            .ok_or_else(|| StatsError::DeviceNotFound(device_id.to_string()))?;

        let mut readings: Vec<Reading> = data
            .readings
            .get(&owner)
            .map(|all| {
                all.iter()
                    .filter(|r| window.contains(r.timestamp))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(readings.into_iter().skip(skip).take(limit).collect())
    }
}

#[async_trait]
impl ReadingsRepository for InMemoryStore {
    async fn list_readings(&self, device_id: i64, window: &StatsWindow) -> Result<Vec<Reading>> {
        let data = self.data.read().await;
        Ok(data
            .readings
            .get(&device_id)
            .map(|all| {
                all.iter()
                    .filter(|r| window.contains(r.timestamp))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_device_ids_for_user(&self, user_id: i64) -> Result<Vec<DeviceKey>> {
        let data = self.data.read().await;
        Ok(data
            .devices
            .values()
            .filter(|d| d.user_id == Some(user_id))
            .map(Device::key)
            .collect())
    }

    async fn resolve_device(&self, device_id: &str) -> Result<Option<DeviceKey>> {
        let data = self.data.read().await;
        Ok(data.device_by_external_id(device_id).map(Device::key))
    }

    async fn resolve_user(&self, user_id: i64) -> Result<bool> {
        let data = self.data.read().await;
        Ok(data.users.contains_key(&user_id))
    }
}
