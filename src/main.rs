use blockstep::{execute::BLOCK_FUNCTION_PROFILER_FRAME, project::{Config, Project}};
use clap::Parser;
use log::{error, info};
use std::{path::PathBuf, process::ExitCode, time::Duration};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Path to an extracted project.json
  project: PathBuf,

  #[arg(short, long, default_value_t = 30)]
  frame_rate: u32,

  /// Stop after this many ticks
  #[arg(short, long)]
  ticks: Option<u64>,

  /// Time every primitive call and print a summary on exit
  #[arg(short, long)]
  profile: bool,
}

fn main() -> ExitCode {
  pretty_env_logger::init();
  let cli = Cli::parse();
  let config = Config {
    frame_rate: cli.frame_rate.max(1),
    max_ticks: cli.ticks,
    profile: cli.profile,
  };
  let mut project = match Project::load(&cli.project, config) {
    Ok(project) => project,
    Err(err) => {
      error!("{err}");
      return ExitCode::FAILURE;
    }
  };
  let started = project.start_scripts();
  info!("Started {started} scripts");
  let frame = Duration::from_secs(1) / project.config.frame_rate;
  while !project.is_finished() {
    project.execute_scripts();
    for event in project.take_events() {
      match serde_json::to_string(&event) {
        Ok(line) => println!("{line}"),
        Err(err) => error!("Could not serialize {event:?}: {err}"),
      }
    }
    std::thread::sleep(frame);
  }
  info!("Stopped after {} ticks", project.ticks);
  if let Some(profiler) = project.runtime().profiler.as_mut() {
    let id = profiler.id_by_name(BLOCK_FUNCTION_PROFILER_FRAME);
    let mut totals: Vec<_> = profiler.summary(id).into_iter().collect();
    totals.sort_by(|a, b| b.1.total_ms.total_cmp(&a.1.total_ms));
    for (opcode, total) in totals {
      println!("{opcode}\t{}\t{:.3}ms", total.calls, total.total_ms);
    }
  }
  ExitCode::SUCCESS
}
