//! Command-line entry point for the optimizer.
//!
//! Optimizes a single script by repeatedly asking a language model for faster
//! rewrites, running each one, and reporting the fastest rewrite whose output
//! matches the original.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use optimizer::exit_codes;
use optimizer::io::config::load_config;
use optimizer::io::process::InterpreterRunner;
use optimizer::llm::{LlmClient, ProviderKind};
use optimizer::logging;
use optimizer::optimize::{LoopStop, RunRequest, run_optimization};
use optimizer::report::{progress_lines, summary_lines};

#[derive(Parser, Debug)]
#[command(
    name = "optimizer",
    version,
    about = "Iteratively optimize a script's runtime with a language model"
)]
struct Cli {
    /// Script to optimize.
    #[arg(long)]
    program: PathBuf,

    /// Model provider.
    #[arg(long, value_enum)]
    model: ProviderKind,

    /// Model identifier passed to the provider.
    #[arg(long = "model_name")]
    model_name: String,

    /// Number of optimization iterations.
    #[arg(long, default_value_t = 50)]
    steps: u32,

    /// Trace prompts and responses and raise the default log level.
    #[arg(long)]
    debug: bool,

    /// Config file; defaults apply when it does not exist.
    #[arg(long, default_value = "optimizer.toml")]
    config: PathBuf,

    /// Base directory for experiment folders (overrides the config file).
    #[arg(long = "run-folder")]
    run_folder: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug);
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let mut cfg = load_config(&cli.config)?;
    if let Some(run_folder) = cli.run_folder {
        cfg.run_folder = run_folder;
    }

    let client = LlmClient::from_env(
        cli.model,
        &cli.model_name,
        &cfg.llm,
        &cfg.language,
        cli.debug,
    )?;
    let runner = InterpreterRunner::new(
        cfg.interpreter.clone(),
        cfg.script_timeout(),
        cfg.output_limit_bytes,
    );

    let request = RunRequest {
        program: &cli.program,
        steps: cli.steps,
        run_folder: &cfg.run_folder,
    };
    let outcome = run_optimization(&request, &runner, &client, |event| {
        for line in progress_lines(&event) {
            println!("{line}");
        }
    })?;

    for line in summary_lines(&outcome) {
        println!("{line}");
    }

    Ok(match outcome.stop {
        LoopStop::Completed => exit_codes::OK,
        LoopStop::ProviderFailed { .. } => exit_codes::ABORTED,
    })
}
