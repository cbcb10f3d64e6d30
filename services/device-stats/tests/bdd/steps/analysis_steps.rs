//! BDD step definitions for device and user analysis

use cucumber::{then, when};

use device_stats::{
    analyze_device, analyze_user, AnalysisOutcome, AxisSummary, CompleteStatsAnalysis,
    StatsError,
};

use crate::steps::summary_steps::field;
use crate::world::StatsWorld;

fn axis<'a>(analysis: &'a CompleteStatsAnalysis, name: &str) -> &'a AxisSummary {
    match name {
        "x" => &analysis.x,
        "y" => &analysis.y,
        "z" => &analysis.z,
        other => panic!("Unknown axis: {}", other),
    }
}

#[when(expr = "device {string} is analyzed")]
async fn device_analyzed(world: &mut StatsWorld, device_id: String) {
    let result = analyze_device(world.store.as_ref(), &device_id, &world.window, None).await;
    world.device_result = Some(result);
}

#[when(expr = "user {string} is analyzed")]
async fn user_analyzed(world: &mut StatsWorld, name: String) {
    let user_id = world.user_id(&name);
    let result = analyze_user(world.store.as_ref(), user_id, &world.window, None).await;
    world.user_result = Some(result);
}

#[when(expr = "user id {int} is analyzed")]
async fn user_id_analyzed(world: &mut StatsWorld, user_id: i64) {
    let result = analyze_user(world.store.as_ref(), user_id, &world.window, None).await;
    world.user_result = Some(result);
}

#[then(expr = "the device {word} {word} should be {float}")]
fn device_axis_field(world: &mut StatsWorld, axis_name: String, name: String, expected: f64) {
    let summary = axis(world.device_analysis(), &axis_name);
    assert_eq!(
        field(summary, &name),
        expected,
        "device {} {} mismatch: {:?}",
        axis_name,
        name,
        summary
    );
}

#[then(expr = "the aggregate {word} {word} should be {float}")]
fn aggregate_axis_field(world: &mut StatsWorld, axis_name: String, name: String, expected: f64) {
    let summary = axis(&world.user_analysis().aggregate_stats, &axis_name);
    assert_eq!(
        field(summary, &name),
        expected,
        "aggregate {} {} mismatch: {:?}",
        axis_name,
        name,
        summary
    );
}

#[then(expr = "the breakdown for {string} should have {word} {word} {float}")]
fn breakdown_axis_field(
    world: &mut StatsWorld,
    device_id: String,
    axis_name: String,
    name: String,
    expected: f64,
) {
    let analysis = world.user_analysis();
    let device = analysis
        .device_stats
        .iter()
        .find(|d| d.device_id == device_id)
        .unwrap_or_else(|| panic!("device '{}' not in breakdown", device_id));
    assert_eq!(field(axis(&device.stats, &axis_name), &name), expected);
}

#[then(expr = "the breakdown should list devices {string}")]
fn breakdown_lists(world: &mut StatsWorld, expected: String) {
    let listed: Vec<&str> = world
        .user_analysis()
        .device_stats
        .iter()
        .map(|d| d.device_id.as_str())
        .collect();
    let expected: Vec<&str> = expected.split(',').map(str::trim).collect();
    assert_eq!(listed, expected);
}

#[then("the device analysis should report no data")]
fn device_no_data(world: &mut StatsWorld) {
    match world.device_result.as_ref().expect("no device analysis run") {
        Ok(AnalysisOutcome::NoData) => {}
        other => panic!("expected no data, got {:?}", other),
    }
}

#[then("the device analysis should fail with device not found")]
fn device_not_found(world: &mut StatsWorld) {
    match world.device_result.as_ref().expect("no device analysis run") {
        Err(StatsError::DeviceNotFound(_)) => {}
        other => panic!("expected DeviceNotFound, got {:?}", other),
    }
}

#[then("the user analysis should report no data")]
fn user_no_data(world: &mut StatsWorld) {
    match world.user_result.as_ref().expect("no user analysis run") {
        Ok(AnalysisOutcome::NoData) => {}
        other => panic!("expected no data, got {:?}", other),
    }
}

#[then("the user analysis should fail with user not found")]
fn user_not_found(world: &mut StatsWorld) {
    match world.user_result.as_ref().expect("no user analysis run") {
        Err(StatsError::UserNotFound(_)) => {}
        other => panic!("expected UserNotFound, got {:?}", other),
    }
}

#[then(expr = "the device analysis period should start at {string}")]
fn device_period_start(world: &mut StatsWorld, start: String) {
    let expected = crate::steps::setup_steps::parse_time(&start);
    assert_eq!(world.device_analysis().period_start, Some(expected));
}

#[then(expr = "analyzing device {string} again should give the same result")]
async fn device_analysis_repeatable(world: &mut StatsWorld, device_id: String) {
    let again = analyze_device(world.store.as_ref(), &device_id, &world.window, None)
        .await
        .expect("repeat analysis failed")
        .into_option()
        .expect("repeat analysis had no data");
    let first = world.device_analysis();
    assert_eq!(&again, first);
    for name in ["x", "y", "z"] {
        let (a, b) = (axis(first, name), axis(&again, name));
        assert_eq!(a.sum.to_bits(), b.sum.to_bits());
        assert_eq!(a.median.to_bits(), b.median.to_bits());
    }
}
