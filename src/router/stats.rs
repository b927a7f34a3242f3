//! Routing Statistics
//!
//! In-memory counters of routing decisions for monitoring endpoints.
//! Nothing here is persisted; counters start at zero with the process.

use crate::router::classifier::TaskType;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time copy of the routing counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    /// Always contains every task type, zero when unused
    pub requests_by_task_type: BTreeMap<TaskType, u64>,
    pub requests_by_provider: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    by_task: BTreeMap<TaskType, u64>,
    by_provider: BTreeMap<String, u64>,
}

/// Thread-safe routing counters
#[derive(Debug, Default)]
pub struct RoutingStats {
    counters: Mutex<Counters>,
}

impl RoutingStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one routed request
    pub fn record(&self, task: TaskType, provider: &str) {
        let mut counters = self.counters.lock();
        counters.total += 1;
        *counters.by_task.entry(task).or_insert(0) += 1;
        *counters.by_provider.entry(provider.to_string()).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let counters = self.counters.lock();

        let requests_by_task_type = TaskType::ALL
            .iter()
            .map(|task| (*task, counters.by_task.get(task).copied().unwrap_or(0)))
            .collect();

        StatsSnapshot {
            total_requests: counters.total,
            requests_by_task_type,
            requests_by_provider: counters.by_provider.clone(),
        }
    }
}
