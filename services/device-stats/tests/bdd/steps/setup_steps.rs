//! BDD step definitions for registering users, devices and readings

use chrono::{DateTime, Duration, TimeZone, Utc};
use cucumber::given;

use device_stats::store::{NewDevice, NewUser};
use device_stats::{NewReading, StatsWindow};

use crate::world::StatsWorld;

pub fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .unwrap_or_else(|e| panic!("invalid timestamp '{}': {}", s, e))
        .with_timezone(&Utc)
}

pub fn parse_values(s: &str) -> Vec<f64> {
    s.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.parse().unwrap_or_else(|_| panic!("invalid value '{}'", v)))
        .collect()
}

async fn register_device(world: &mut StatsWorld, device_id: String, user_id: Option<i64>) {
    world
        .store
        .create_device(NewDevice {
            device_id,
            name: None,
            user_id,
        })
        .await
        .expect("device registration failed");
}

#[given(expr = "a user {string}")]
async fn a_user(world: &mut StatsWorld, name: String) {
    let user = world
        .store
        .create_user(NewUser {
            username: name.clone(),
            email: format!("{}@example.com", name),
        })
        .await
        .expect("user registration failed");
    world.users.insert(name, user.id);
}

#[given(expr = "user {string} owns device {string}")]
async fn user_owns_device(world: &mut StatsWorld, name: String, device_id: String) {
    let user_id = world.user_id(&name);
    register_device(world, device_id, Some(user_id)).await;
}

#[given(expr = "an unowned device {string}")]
async fn unowned_device(world: &mut StatsWorld, device_id: String) {
    register_device(world, device_id, None).await;
}

#[given(expr = "device {string} reported x={float} y={float} z={float} at {string}")]
async fn device_reported(
    world: &mut StatsWorld,
    device_id: String,
    x: f64,
    y: f64,
    z: f64,
    at: String,
) {
    world
        .store
        .add_reading(&device_id, NewReading::new(x, y, z).at(parse_time(&at)))
        .await
        .expect("reading ingestion failed");
}

/// Readings are spaced one hour apart starting at 2024-01-01T00:00:00Z
#[given(expr = "device {string} reported x values {string}")]
async fn device_reported_x_values(world: &mut StatsWorld, device_id: String, values: String) {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    for (i, x) in parse_values(&values).into_iter().enumerate() {
        let at = start + Duration::hours(i as i64);
        world
            .store
            .add_reading(&device_id, NewReading::new(x, 0.0, 0.0).at(at))
            .await
            .expect("reading ingestion failed");
    }
}

#[given(expr = "the analysis window from {string} to {string}")]
fn window_between(world: &mut StatsWorld, start: String, end: String) {
    world.window = StatsWindow::new(Some(parse_time(&start)), Some(parse_time(&end)));
}

#[given(expr = "the analysis window starting at {string}")]
fn window_from(world: &mut StatsWorld, start: String) {
    world.window = StatsWindow::new(Some(parse_time(&start)), None);
}

#[given(expr = "the analysis window ending at {string}")]
fn window_until(world: &mut StatsWorld, end: String) {
    world.window = StatsWindow::new(None, Some(parse_time(&end)));
}
