use anyhow::Context;
use clap::Parser;
use generator::profile::SurveyPath;
use sonarcore::config::Channel;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator {
    pub mod profile;
    pub mod template;
}
mod workflow {
    pub mod config;
    pub mod runner;
}

#[derive(Parser)]
#[command(author, version, about = "Synthetic side-scan survey driver for the rectification core")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Directory receiving the track table, tiles and run summary
    #[arg(long, default_value = "output")]
    output: PathBuf,
    #[arg(long, default_value_t = 2000)]
    pings: usize,
    #[arg(long, value_enum, default_value_t = SurveyPath::Straight)]
    path: SurveyPath,
    /// Process the starboard channel instead of port
    #[arg(long, default_value_t = false)]
    starboard: bool,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        let channel = if args.starboard {
            Channel::Starboard
        } else {
            Channel::Port
        };
        WorkflowConfig::from_args(args.pings, args.path, channel, args.seed)
    };

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating output directory {}", args.output.display()))?;
    let summary = Runner::new(workflow_config, &args.output).execute()?;

    println!(
        "Survey run -> pings {}, chunks {}, tiles {}, skipped {}, overlap removals {}",
        summary.pings,
        summary.chunks,
        summary.tiles_written,
        summary.skipped.len(),
        summary.overlap_removed
    );
    for skipped in &summary.skipped {
        println!("  chunk {:05}: {}", skipped.chunk_id, skipped.reason);
    }
    Ok(())
}
