use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::{endpoint, App, JobProgress, JobResults};
use reqwest::Client;
use std::path::{Path, PathBuf};

use crate::local;

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "Inspect a running map/reduce job, or run an app sequentially")]
struct Cli {
    /// Coordinator base URL (defaults to the per-user localhost port)
    #[arg(long, global = true, env = endpoint::COORDINATOR_URL_ENV)]
    coordinator: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Phase and task counts of the current job
    Status,
    /// Lists the output files of the job
    Results {
        /// Print every line of every output file, sorted
        #[arg(long)]
        merge: bool,
    },
    /// Runs an app over the inputs in this process and writes `output-sequential`
    Sequential {
        #[arg(long, default_value = "wc")]
        app: App,

        #[arg(long, env = "MR_WORK_DIR", default_value = ".")]
        work_dir: PathBuf,

        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<String>,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = cli
        .coordinator
        .unwrap_or_else(endpoint::coordinator_base_url);

    match cli.command {
        Commands::Status => {
            let url = format!("{}/api/v1/job", base_url);
            let job: JobProgress = client
                .get(&url)
                .send()
                .await
                .with_context(|| format!("cannot reach coordinator at {}", base_url))?
                .error_for_status()?
                .json()
                .await?;

            println!("Job:");
            println!("  phase: {:?}", job.phase);
            println!("  map tasks: {}/{}", job.map_completed, job.map_total);
            println!("  reduce tasks: {}/{}", job.reduce_completed, job.reduce_total);
            println!("  progress: {:.1}%", job.percent());
            println!("  started_at: {}", job.started_at);
            if let Some(finished) = job.finished_at {
                println!("  finished_at: {}", finished);
            }
        }

        Commands::Results { merge } => {
            let url = format!("{}/api/v1/job/results", base_url);
            let results: JobResults = client
                .get(&url)
                .send()
                .await
                .with_context(|| format!("cannot reach coordinator at {}", base_url))?
                .error_for_status()?
                .json()
                .await?;

            if merge {
                for line in local::merge_outputs(Path::new(&results.output_dir), &results.files)? {
                    println!("{}", line);
                }
            } else {
                println!("Output directory: {}", results.output_dir);
                if results.files.is_empty() {
                    println!("  (no output files yet)");
                } else {
                    for f in results.files {
                        println!("  - {}", f);
                    }
                }
            }
        }

        Commands::Sequential {
            app,
            work_dir,
            inputs,
        } => {
            let path = local::run_sequential(app, &work_dir, &inputs)?;
            println!("{} over {} file(s) -> {}", app, inputs.len(), path.display());
        }
    }

    Ok(())
}
