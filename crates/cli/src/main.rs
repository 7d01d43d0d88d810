mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::{OutputFormat, print_error};

/// renconstruct - run pluggable tasks around a game build
#[derive(Parser)]
#[command(name = "renconstruct")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the configured tasks around a build
  Build {
    /// Project directory the build reads from
    input_dir: PathBuf,

    /// Directory the build writes its artifacts to
    output_dir: PathBuf,

    /// Path to the config file (default: <input_dir>/renconstruct.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the engine SDK, overrides `options.tool_path`
    #[arg(long)]
    tool_path: Option<PathBuf>,
  },

  /// List the tasks found in a directory
  Tasks {
    /// Directory to search for task units
    dir: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}

fn run(cli: Cli) -> Result<()> {
  match cli.command {
    Commands::Build {
      input_dir,
      output_dir,
      config,
      tool_path,
    } => cmd::cmd_build(&input_dir, &output_dir, config.as_deref(), tool_path.as_deref(), cli.verbose),
    Commands::Tasks { dir, output } => cmd::cmd_tasks(&dir, output),
  }
}
