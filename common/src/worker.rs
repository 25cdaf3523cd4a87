use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskId, TaskKind};

/// Free-form worker name. Only used for logs; scheduling ignores it.
pub type WorkerId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub worker_id: WorkerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub task: Task,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    pub worker_id: WorkerId,
    pub task_id: TaskId,
    pub kind: TaskKind,
}

/// `accepted` is false for duplicate or stale reports. Workers do not act on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReportAck {
    pub accepted: bool,
}
