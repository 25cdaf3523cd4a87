use anyhow::{Context, Result};
use async_trait::async_trait;
use common::{
    Task, TaskAssignment, TaskId, TaskKind, TaskReport, TaskReportAck, TaskRequest, WorkerId,
};
use reqwest::Client;

/// The two calls a worker makes. Any `Err` means the coordinator could not be
/// reached; the worker treats that as the end of the job.
#[async_trait]
pub trait CoordinatorClient: Send + Sync {
    async fn request_task(&self) -> Result<Task>;

    /// Returns whether the coordinator counted this report.
    async fn report_task(&self, id: TaskId, kind: TaskKind) -> Result<bool>;
}

/// JSON over HTTP to the coordinator's axum service.
#[derive(Debug, Clone)]
pub struct HttpCoordinator {
    client: Client,
    base_url: String,
    worker_id: WorkerId,
}

impl HttpCoordinator {
    pub fn new(base_url: impl Into<String>, worker_id: impl Into<WorkerId>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            worker_id: worker_id.into(),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }
}

#[async_trait]
impl CoordinatorClient for HttpCoordinator {
    async fn request_task(&self) -> Result<Task> {
        let url = format!("{}/api/v1/tasks/request", self.base_url);
        let assignment: TaskAssignment = self
            .client
            .post(&url)
            .json(&TaskRequest {
                worker_id: self.worker_id.clone(),
            })
            .send()
            .await
            .with_context(|| format!("POST {}", url))?
            .error_for_status()?
            .json()
            .await?;
        Ok(assignment.task)
    }

    async fn report_task(&self, id: TaskId, kind: TaskKind) -> Result<bool> {
        let url = format!("{}/api/v1/tasks/report", self.base_url);
        let ack: TaskReportAck = self
            .client
            .post(&url)
            .json(&TaskReport {
                worker_id: self.worker_id.clone(),
                task_id: id,
                kind,
            })
            .send()
            .await
            .with_context(|| format!("POST {}", url))?
            .error_for_status()?
            .json()
            .await?;
        Ok(ack.accepted)
    }
}
