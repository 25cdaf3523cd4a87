use anyhow::Result;
use clap::Parser;
use common::{
    endpoint::{self, COORDINATOR_URL_ENV},
    App, MissingShards,
};
use std::{path::PathBuf, time::Duration};
use tracing::{info, info_span, Instrument};
use tracing_subscriber::EnvFilter;
use worker::{HttpCoordinator, Worker, WorkerConfig};

#[derive(Parser, Debug)]
#[command(name = "worker")]
#[command(about = "Polls the coordinator for map/reduce tasks and runs them")]
struct Opt {
    /// Coordinator base URL (defaults to the per-user local endpoint)
    #[arg(long, env = COORDINATOR_URL_ENV)]
    coordinator: Option<String>,

    /// Shared directory for intermediate shards and outputs
    #[arg(long, env = "MR_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Application to run: wc or indexer
    #[arg(long, default_value = "wc")]
    app: App,

    /// Milliseconds to wait when no task is available
    #[arg(long, default_value_t = 500)]
    poll_interval_ms: u64,

    /// Fail a reduce task when an intermediate shard is missing instead of skipping it
    #[arg(long)]
    strict_shards: bool,
}

/// `<hostname>-<8 hex chars>`, only used to tell workers apart in logs.
fn worker_name() -> String {
    let host = hostname::get()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", host, &suffix[..8])
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("worker=debug,common=info,reqwest=info")),
        )
        .init();

    let opt = Opt::parse();

    let base_url = opt
        .coordinator
        .unwrap_or_else(endpoint::coordinator_base_url);
    let name = worker_name();
    let coordinator = HttpCoordinator::new(base_url.clone(), name.clone());

    let config = WorkerConfig {
        work_dir: opt.work_dir,
        poll_interval: Duration::from_millis(opt.poll_interval_ms),
        missing_shards: if opt.strict_shards {
            MissingShards::Fail
        } else {
            MissingShards::Skip
        },
    };
    let (mapf, reducef) = opt.app.callbacks();

    info!(worker = %name, app = %opt.app, "worker started against {}", base_url);

    let summary = Worker::new(config, mapf, reducef)
        .run(&coordinator)
        .instrument(info_span!("worker", id = %name))
        .await?;

    info!(maps = summary.maps, reduces = summary.reduces, "worker stopped");
    Ok(())
}
