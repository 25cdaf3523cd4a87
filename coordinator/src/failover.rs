use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::state::Coordinator;

/// Fault-tolerance loop:
/// - every `sweep_interval`, reverts timed-out in-progress tasks to idle
/// - stops once the job is done
pub async fn run_timeout_sweep(coordinator: Coordinator) {
    let interval = coordinator.config().sweep_interval;
    loop {
        sleep(interval).await;

        if coordinator.done() {
            debug!("job done, stopping timeout sweep");
            break;
        }
        sweep_once(&coordinator);
    }
}

/// One pass. Returns how many tasks were put back to idle.
pub fn sweep_once(coordinator: &Coordinator) -> usize {
    let reclaimed = coordinator.sweep_timeouts();
    for (kind, id) in &reclaimed {
        warn!(
            %kind,
            task_id = id,
            timeout = ?coordinator.config().task_timeout,
            "task timed out, back to idle for reassignment"
        );
    }
    reclaimed.len()
}

/// Resolves once the job is done, `linger` after the fact so that workers
/// still polling get to see the exit task before the service goes away.
pub async fn wait_until_done(coordinator: Coordinator, poll: Duration, linger: Duration) {
    while !coordinator.done() {
        sleep(poll).await;
    }
    info!(?linger, "job done, shutting down after linger");
    sleep(linger).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CoordinatorConfig;
    use common::{Task, TaskKind};

    fn coordinator() -> Coordinator {
        Coordinator::new(vec!["a.txt".into()], 1, CoordinatorConfig::default()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn background_sweep_makes_abandoned_task_assignable_again() {
        let c = coordinator();
        tokio::spawn(run_timeout_sweep(c.clone()));

        let first = c.request_task();
        assert_eq!(first.id(), Some(0));
        assert_eq!(c.request_task(), Task::None);

        // paused clock: sleeping lets the sweep tick until past the timeout
        sleep(Duration::from_millis(11_500)).await;
        assert_eq!(c.request_task(), first);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_once_counts_reclaimed_tasks() {
        let c = coordinator();
        c.request_task();
        assert_eq!(sweep_once(&c), 0);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(sweep_once(&c), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_loop_exits_when_job_is_done() {
        let c = coordinator();
        let handle = tokio::spawn(run_timeout_sweep(c.clone()));

        let m = c.request_task();
        c.report_task(m.id().unwrap(), TaskKind::Map);
        let r = c.request_task();
        c.report_task(r.id().unwrap(), TaskKind::Reduce);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweep loop should stop")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_done_resolves_after_the_last_reduce() {
        let c = coordinator();
        let waiter = tokio::spawn(wait_until_done(
            c.clone(),
            Duration::from_millis(100),
            Duration::from_secs(1),
        ));

        sleep(Duration::from_secs(3)).await;
        assert!(!waiter.is_finished());

        c.request_task();
        c.report_task(0, TaskKind::Map);
        c.request_task();
        c.report_task(0, TaskKind::Reduce);

        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
    }
}
