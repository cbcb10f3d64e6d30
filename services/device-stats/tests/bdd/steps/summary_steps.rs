//! BDD step definitions for the per-axis reducer

use cucumber::{given, then, when};

use device_stats::{summarize, AxisSummary};

use crate::steps::setup_steps::parse_values;
use crate::world::StatsWorld;

pub fn field(summary: &AxisSummary, name: &str) -> f64 {
    match name {
        "min" => summary.min,
        "max" => summary.max,
        "sum" => summary.sum,
        "median" => summary.median,
        "count" => summary.count as f64,
        other => panic!("Unknown summary field: {}", other),
    }
}

#[given(expr = "the values {string}")]
fn the_values(world: &mut StatsWorld, values: String) {
    world.values = parse_values(&values);
}

#[when("the values are summarized")]
fn values_summarized(world: &mut StatsWorld) {
    world.summary = Some(summarize(&world.values));
}

#[then(expr = "the summary {word} should be {float}")]
fn summary_field(world: &mut StatsWorld, name: String, expected: f64) {
    let summary = world.summary.as_ref().expect("values not summarized");
    assert_eq!(
        field(summary, &name),
        expected,
        "summary {} mismatch: {:?}",
        name,
        summary
    );
}
