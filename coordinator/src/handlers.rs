use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use common::{
    engine, JobProgress, JobResults, TaskAssignment, TaskReport, TaskReportAck, TaskRequest,
};
use std::{fs, path::PathBuf};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::state::Coordinator;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Coordinator,
    /// Shared directory where workers leave `output-*` files.
    pub output_dir: PathBuf,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/tasks/request", post(request_task))
        .route("/api/v1/tasks/report", post(report_task))
        .route("/api/v1/job", get(get_job))
        .route("/api/v1/job/results", get(get_job_results))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- HTTP handlers ---------------- */

async fn health() -> &'static str {
    "ok"
}

async fn request_task(
    State(state): State<AppState>,
    Json(req): Json<TaskRequest>,
) -> Json<TaskAssignment> {
    let task = state.coordinator.request_task();

    match (task.kind(), task.id()) {
        (Some(kind), Some(id)) => {
            info!(worker = %req.worker_id, %kind, task_id = id, "task assigned");
        }
        _ => debug!(worker = %req.worker_id, ?task, "no task assigned"),
    }

    Json(TaskAssignment { task })
}

async fn report_task(
    State(state): State<AppState>,
    Json(req): Json<TaskReport>,
) -> Json<TaskReportAck> {
    let accepted = state.coordinator.report_task(req.task_id, req.kind);
    if accepted {
        info!(worker = %req.worker_id, kind = %req.kind, task_id = req.task_id, "task completed");
    }
    Json(TaskReportAck { accepted })
}

async fn get_job(State(state): State<AppState>) -> Json<JobProgress> {
    Json(state.coordinator.progress())
}

// Lists the final output files currently present in the shared directory
async fn get_job_results(State(state): State<AppState>) -> Json<JobResults> {
    let mut files = Vec::new();

    if let Ok(entries) = fs::read_dir(&state.output_dir) {
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if engine::is_output_name(name) {
                    files.push(name.to_string());
                }
            }
        }
    }
    files.sort_by_key(|name| engine::output_reduce_id(name));

    Json(JobResults {
        output_dir: state.output_dir.to_string_lossy().to_string(),
        files,
    })
}
