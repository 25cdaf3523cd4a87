use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use common::endpoint::{self, COORDINATOR_ADDR_ENV};
use coordinator::{
    build_router,
    failover::{run_timeout_sweep, wait_until_done},
    inputs::expand_inputs,
    AppState, Coordinator, CoordinatorConfig,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DONE_POLL: Duration = Duration::from_secs(1);
const EXIT_LINGER: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "coordinator")]
#[command(about = "Hands out map/reduce tasks to workers and tracks their completion")]
struct Opt {
    /// Input files, one map task each. Glob patterns are expanded.
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<String>,

    /// Number of reduce tasks
    #[arg(long, default_value_t = 10)]
    n_reduce: usize,

    /// Address to listen on (defaults to a per-user port on localhost)
    #[arg(long, env = COORDINATOR_ADDR_ENV)]
    listen: Option<SocketAddr>,

    /// Shared directory where workers write their output
    #[arg(long, env = "MR_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Seconds before an in-progress task is considered abandoned
    #[arg(long, default_value_t = 10)]
    task_timeout_secs: u64,

    /// Seconds between two timeout sweeps
    #[arg(long, default_value_t = 1)]
    sweep_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("coordinator=debug,tower_http=info")),
        )
        .init();

    let opt = Opt::parse();

    let inputs = expand_inputs(&opt.inputs)?;
    if inputs.is_empty() {
        bail!("no input files matched {:?}", opt.inputs);
    }

    let config = CoordinatorConfig {
        task_timeout: Duration::from_secs(opt.task_timeout_secs),
        sweep_interval: Duration::from_secs(opt.sweep_interval_secs.max(1)),
    };
    let coordinator = Coordinator::new(inputs, opt.n_reduce, config)?;

    // timeout sweep in the background
    tokio::spawn(run_timeout_sweep(coordinator.clone()));

    let app = build_router(AppState {
        coordinator: coordinator.clone(),
        output_dir: opt.work_dir,
    });

    let addr = opt.listen.unwrap_or_else(endpoint::default_listen_addr);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot listen on {}", addr))?;
    info!("coordinator listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_until_done(coordinator, DONE_POLL, EXIT_LINGER))
        .await?;

    info!("coordinator exiting");
    Ok(())
}
