use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use stages_pipeline::utils::logging::{create_spinner, finish_progress_bar};
use stages_pipeline::{PipelineConfig, Stage, dashboard};

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

#[derive(Debug, Parser)]
#[command(name = "stages", version, about = "Internship export pipeline and dashboard")]
struct Cli {
    /// Project root holding data/ and reports/
    #[arg(long, env = "STAGES_PROJECT_ROOT", default_value = ".", global = true)]
    root: PathBuf,

    /// Raw export filename inside data/raw/
    #[arg(long, global = true)]
    raw_filename: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Profile the raw export and write the quality reports
    Profile,
    /// Drop personal data and normalize text into the clean file
    Clean,
    /// Load the clean file into the warehouse
    Load,
    /// Rebuild the analytics view and the marts
    Marts,
    /// Run profile, clean, load and marts in order
    Run,
    /// Serve the dashboard
    Dashboard {
        #[arg(long, env = "STAGES_ADDR", default_value = "127.0.0.1:8501")]
        addr: SocketAddr,
    },
}

fn run_stage(stage: Stage, config: &PipelineConfig) -> anyhow::Result<()> {
    let pb = create_spinner(Some(&format!("Running {stage}...")));
    let result = stage.run(config);
    match &result {
        Ok(report) => finish_progress_bar(&pb, Some(&format!("{stage}: {report}"))),
        Err(_) => finish_progress_bar(&pb, Some(&format!("{stage} failed"))),
    }
    result
        .map(|_| ())
        .with_context(|| format!("stage {stage} failed (project root {})", config.project_root.display()))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = PipelineConfig::new(&cli.root);
    if let Some(filename) = cli.raw_filename {
        config = config.with_raw_filename(filename);
    }

    match cli.command {
        Command::Profile => run_stage(Stage::Profile, &config),
        Command::Clean => run_stage(Stage::Clean, &config),
        Command::Load => run_stage(Stage::Load, &config),
        Command::Marts => run_stage(Stage::Marts, &config),
        Command::Run => Stage::ALL
            .iter()
            .try_for_each(|stage| run_stage(*stage, &config)),
        Command::Dashboard { addr } => {
            let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
            runtime
                .block_on(dashboard::serve(&config, addr))
                .with_context(|| format!("dashboard on {addr} stopped"))
        }
    }
}
