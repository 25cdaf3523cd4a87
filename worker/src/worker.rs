use anyhow::{Context, Result};
use common::{engine, MapFn, MissingShards, ReduceFn, Task, TaskId, TaskKind};
use std::{path::PathBuf, time::Duration};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::CoordinatorClient;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Shared directory for shards and outputs.
    pub work_dir: PathBuf,
    /// Pause after a `None` task before asking again.
    pub poll_interval: Duration,
    pub missing_shards: MissingShards,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            poll_interval: DEFAULT_POLL_INTERVAL,
            missing_shards: MissingShards::default(),
        }
    }
}

/// How many tasks this worker executed before stopping.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSummary {
    pub maps: usize,
    pub reduces: usize,
}

pub struct Worker {
    config: WorkerConfig,
    map: MapFn,
    reduce: ReduceFn,
}

impl Worker {
    pub fn new(config: WorkerConfig, map: MapFn, reduce: ReduceFn) -> Self {
        Self { config, map, reduce }
    }

    /// Main loop:
    /// 1. ask the coordinator for a task
    /// 2. run it (map / reduce), or wait (none), or stop (exit)
    /// 3. report completion
    ///
    /// A failed call to the coordinator means it has shut down, so the loop
    /// ends successfully. A failed map or reduce is returned as an error.
    pub async fn run<C>(&self, coordinator: &C) -> Result<WorkerSummary>
    where
        C: CoordinatorClient + ?Sized,
    {
        let mut summary = WorkerSummary::default();

        loop {
            let task = match coordinator.request_task().await {
                Ok(task) => task,
                Err(e) => {
                    info!(error = %e, "coordinator unreachable, assuming the job is over");
                    return Ok(summary);
                }
            };

            let (kind, id) = match task {
                Task::Map {
                    id,
                    input,
                    n_reduce,
                    ..
                } => {
                    info!(task_id = id, %input, "running map task");
                    self.run_map(id, input, n_reduce).await?;
                    summary.maps += 1;
                    (TaskKind::Map, id)
                }
                Task::Reduce { id, n_map, .. } => {
                    info!(task_id = id, "running reduce task");
                    self.run_reduce(id, n_map).await?;
                    summary.reduces += 1;
                    (TaskKind::Reduce, id)
                }
                Task::None => {
                    debug!("nothing to do, waiting {:?}", self.config.poll_interval);
                    sleep(self.config.poll_interval).await;
                    continue;
                }
                Task::Exit => {
                    info!(maps = summary.maps, reduces = summary.reduces, "job finished, exiting");
                    return Ok(summary);
                }
            };

            match coordinator.report_task(id, kind).await {
                Ok(true) => debug!(%kind, task_id = id, "report accepted"),
                Ok(false) => debug!(%kind, task_id = id, "report ignored, task already accounted for"),
                Err(e) => {
                    warn!(error = %e, %kind, task_id = id, "cannot report, coordinator gone");
                    return Ok(summary);
                }
            }
        }
    }

    async fn run_map(&self, id: TaskId, input: String, n_reduce: usize) -> Result<()> {
        let dir = self.config.work_dir.clone();
        let mapf = self.map;

        tokio::task::spawn_blocking(move || engine::execute_map(&dir, id, &input, n_reduce, mapf))
            .await
            .context("map task panicked")?
            .with_context(|| format!("map task {} failed", id))?;
        Ok(())
    }

    async fn run_reduce(&self, id: TaskId, n_map: usize) -> Result<()> {
        let dir = self.config.work_dir.clone();
        let reducef = self.reduce;
        let missing = self.config.missing_shards;

        tokio::task::spawn_blocking(move || {
            engine::execute_reduce(&dir, id, n_map, reducef, missing)
        })
        .await
        .context("reduce task panicked")?
        .with_context(|| format!("reduce task {} failed", id))?;
        Ok(())
    }
}
