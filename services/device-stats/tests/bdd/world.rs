//! BDD test world for the device stats service

use std::collections::HashMap;
use std::sync::Arc;

use cucumber::World;
use device_stats::{
    AnalysisOutcome, AxisSummary, CompleteStatsAnalysis, InMemoryStore, StatsWindow,
    UserStatsAnalysis,
};

#[derive(Debug, Default, World)]
pub struct StatsWorld {
    pub store: Arc<InMemoryStore>,
    pub users: HashMap<String, i64>,
    pub window: StatsWindow,

    // Reducer testing
    pub values: Vec<f64>,
    pub summary: Option<AxisSummary>,

    // Analyzer testing
    pub device_result: Option<device_stats::Result<AnalysisOutcome<CompleteStatsAnalysis>>>,
    pub user_result: Option<device_stats::Result<AnalysisOutcome<UserStatsAnalysis>>>,
}

impl StatsWorld {
    pub fn user_id(&self, name: &str) -> i64 {
        *self
            .users
            .get(name)
            .unwrap_or_else(|| panic!("user '{}' not registered", name))
    }

    pub fn device_analysis(&self) -> &CompleteStatsAnalysis {
        match self.device_result.as_ref().expect("no device analysis run") {
            Ok(AnalysisOutcome::Ready(analysis)) => analysis,
            other => panic!("expected a device analysis, got {:?}", other),
        }
    }

    pub fn user_analysis(&self) -> &UserStatsAnalysis {
        match self.user_result.as_ref().expect("no user analysis run") {
            Ok(AnalysisOutcome::Ready(analysis)) => analysis,
            other => panic!("expected a user analysis, got {:?}", other),
        }
    }
}
