use serde::{Deserialize, Serialize};

/// Dense, 0-based index of a task within its phase.
pub type TaskId = usize;

/// The two kinds of real work. Reports always name one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Map,
    Reduce,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Map => f.write_str("map"),
            TaskKind::Reduce => f.write_str("reduce"),
        }
    }
}

/// Work descriptor handed to a worker.
///
/// Map and reduce descriptors are built once when the coordinator starts and
/// never change afterwards; a reassignment hands out the same value again.
/// `None` and `Exit` are synthetic replies with no slot behind them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Task {
    Map {
        id: TaskId,
        /// Input file for this map task.
        input: String,
        n_map: usize,
        n_reduce: usize,
    },
    Reduce {
        id: TaskId,
        n_map: usize,
        n_reduce: usize,
    },
    /// Nothing assignable right now, ask again later.
    None,
    /// Every task is completed, the worker should stop.
    Exit,
}

impl Task {
    pub fn kind(&self) -> Option<TaskKind> {
        match self {
            Task::Map { .. } => Some(TaskKind::Map),
            Task::Reduce { .. } => Some(TaskKind::Reduce),
            Task::None | Task::Exit => None,
        }
    }

    pub fn id(&self) -> Option<TaskId> {
        match self {
            Task::Map { id, .. } | Task::Reduce { id, .. } => Some(*id),
            Task::None | Task::Exit => None,
        }
    }
}
