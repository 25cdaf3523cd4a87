// coordinator/src/state.rs

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use anyhow::ensure;
use chrono::{DateTime, Utc};
use common::{JobPhase, JobProgress, Task, TaskId, TaskKind};
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// An in-progress task older than this is presumed abandoned.
    pub task_timeout: Duration,
    /// How often the background sweep looks for abandoned tasks.
    pub sweep_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            task_timeout: DEFAULT_TASK_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Idle,
    InProgress { started_at: Instant },
    Completed,
}

#[derive(Debug, Clone)]
struct TaskRecord {
    status: TaskStatus,
    task: Task,
}

/// Records of one phase plus the cached count of completed records.
#[derive(Debug)]
struct PhaseState {
    kind: TaskKind,
    records: Vec<TaskRecord>,
    completed: usize,
}

impl PhaseState {
    fn new(kind: TaskKind, tasks: Vec<Task>) -> Self {
        let records = tasks
            .into_iter()
            .map(|task| TaskRecord {
                status: TaskStatus::Idle,
                task,
            })
            .collect();
        Self {
            kind,
            records,
            completed: 0,
        }
    }

    fn is_complete(&self) -> bool {
        self.completed == self.records.len()
    }

    /// First idle record in index order becomes in-progress.
    fn claim(&mut self, now: Instant) -> Option<Task> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.status == TaskStatus::Idle)?;
        record.status = TaskStatus::InProgress { started_at: now };
        Some(record.task.clone())
    }

    /// In-progress -> completed. Anything else is a duplicate or stale report.
    fn complete(&mut self, id: TaskId) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            warn!(kind = %self.kind, task_id = id, "report for unknown task id ignored");
            return false;
        };

        match record.status {
            TaskStatus::InProgress { .. } => {
                record.status = TaskStatus::Completed;
                self.completed += 1;
                true
            }
            TaskStatus::Completed | TaskStatus::Idle => false,
        }
    }

    fn reclaim_expired(&mut self, now: Instant, timeout: Duration) -> Vec<TaskId> {
        let mut reclaimed = Vec::new();
        for (id, record) in self.records.iter_mut().enumerate() {
            if let TaskStatus::InProgress { started_at } = record.status {
                if now.saturating_duration_since(started_at) > timeout {
                    record.status = TaskStatus::Idle;
                    reclaimed.push(id);
                }
            }
        }
        reclaimed
    }

    #[cfg(test)]
    fn status(&self, id: TaskId) -> TaskStatus {
        self.records[id].status
    }
}

#[derive(Debug)]
struct JobState {
    map: PhaseState,
    reduce: PhaseState,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl JobState {
    fn phase_mut(&mut self, kind: TaskKind) -> &mut PhaseState {
        match kind {
            TaskKind::Map => &mut self.map,
            TaskKind::Reduce => &mut self.reduce,
        }
    }
}

/// Owns every task record of a job.
///
/// Cloning is cheap and shares the same state; all access goes through one
/// mutex, held only for a scan-and-transition or a check-and-increment.
#[derive(Debug, Clone)]
pub struct Coordinator {
    state: Arc<Mutex<JobState>>,
    config: CoordinatorConfig,
}

impl Coordinator {
    /// One map task per input and `n_reduce` reduce tasks. The record vectors
    /// are never resized afterwards.
    pub fn new(
        inputs: Vec<String>,
        n_reduce: usize,
        config: CoordinatorConfig,
    ) -> anyhow::Result<Self> {
        ensure!(n_reduce > 0, "n_reduce must be at least 1");

        let n_map = inputs.len();
        let map_tasks = inputs
            .into_iter()
            .enumerate()
            .map(|(id, input)| Task::Map {
                id,
                input,
                n_map,
                n_reduce,
            })
            .collect();
        let reduce_tasks = (0..n_reduce)
            .map(|id| Task::Reduce { id, n_map, n_reduce })
            .collect();

        info!(n_map, n_reduce, "coordinator created");

        Ok(Self {
            state: Arc::new(Mutex::new(JobState {
                map: PhaseState::new(TaskKind::Map, map_tasks),
                reduce: PhaseState::new(TaskKind::Reduce, reduce_tasks),
                started_at: Utc::now(),
                finished_at: None,
            })),
            config,
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        // No operation leaves the records half-updated, so a poisoned lock is
        // still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands out the next task. Never blocks beyond the lock, never fails.
    ///
    /// Reduce tasks are only handed out once every map task is completed.
    /// When nothing is idle in the current phase the caller gets
    /// [`Task::None`]; once both phases are completed it gets [`Task::Exit`].
    pub fn request_task(&self) -> Task {
        let mut state = self.lock();
        let now = Instant::now();

        let phase = if !state.map.is_complete() {
            &mut state.map
        } else if !state.reduce.is_complete() {
            &mut state.reduce
        } else {
            return Task::Exit;
        };

        match phase.claim(now) {
            Some(task) => task,
            None => Task::None,
        }
    }

    /// Marks an in-progress task completed. Duplicate and stale reports are
    /// no-ops; returns whether this report was the one that counted.
    pub fn report_task(&self, id: TaskId, kind: TaskKind) -> bool {
        let mut state = self.lock();
        let accepted = state.phase_mut(kind).complete(id);

        if !accepted {
            debug!(%kind, task_id = id, "duplicate or stale report");
            return false;
        }

        if kind == TaskKind::Reduce && state.reduce.is_complete() && state.finished_at.is_none() {
            state.finished_at = Some(Utc::now());
            info!("all reduce tasks completed, job finished");
        } else if kind == TaskKind::Map && state.map.is_complete() {
            info!("all map tasks completed, reduce phase open");
        }
        true
    }

    /// Reverts every in-progress task older than the configured timeout to
    /// idle. Returns the reclaimed tasks.
    pub fn sweep_timeouts(&self) -> Vec<(TaskKind, TaskId)> {
        let mut state = self.lock();
        let now = Instant::now();
        let timeout = self.config.task_timeout;

        let maps = state.map.reclaim_expired(now, timeout);
        let reduces = state.reduce.reclaim_expired(now, timeout);

        maps.into_iter()
            .map(|id| (TaskKind::Map, id))
            .chain(reduces.into_iter().map(|id| (TaskKind::Reduce, id)))
            .collect()
    }

    /// True once every reduce task is completed.
    pub fn done(&self) -> bool {
        self.lock().reduce.is_complete()
    }

    pub fn progress(&self) -> JobProgress {
        let state = self.lock();
        let phase = if !state.map.is_complete() {
            JobPhase::Map
        } else if !state.reduce.is_complete() {
            JobPhase::Reduce
        } else {
            JobPhase::Done
        };

        JobProgress {
            phase,
            map_total: state.map.records.len(),
            map_completed: state.map.completed,
            reduce_total: state.reduce.records.len(),
            reduce_completed: state.reduce.completed,
            started_at: state.started_at,
            finished_at: state.finished_at,
        }
    }

    #[cfg(test)]
    fn status(&self, kind: TaskKind, id: TaskId) -> TaskStatus {
        let mut state = self.lock();
        state.phase_mut(kind).status(id)
    }

    #[cfg(test)]
    fn completed(&self, kind: TaskKind) -> usize {
        let mut state = self.lock();
        state.phase_mut(kind).completed
    }
}
