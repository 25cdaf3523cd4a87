use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPhase {
    Map,
    Reduce,
    Done,
}

/// Snapshot of the coordinator's bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgress {
    pub phase: JobPhase,

    pub map_total: usize,
    pub map_completed: usize,
    pub reduce_total: usize,
    pub reduce_completed: usize,

    pub started_at: DateTime<Utc>,
    /// Set when the last reduce task is reported.
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobProgress {
    /// Completed tasks over all tasks, both phases counted.
    pub fn percent(&self) -> f64 {
        let total = self.map_total + self.reduce_total;
        if total == 0 {
            return 100.0;
        }
        (self.map_completed + self.reduce_completed) as f64 / total as f64 * 100.0
    }
}
