use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

use textsweep::config::{init_tracing, CliOverrides};
use textsweep::{
    output, worker, BatchRunner, ConvertParams, Isolation, SearchParams, Session, SweepConfig,
    WorkerCommand,
};

mod listing;
mod repl;

use repl::Repl;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory to search and convert (default: saved directory, then current)
    #[arg(short = 'd', long, global = true)]
    dir: Option<PathBuf>,

    /// Number of workers to use
    #[arg(short = 'j', long, global = true)]
    threads: Option<NonZeroUsize>,

    /// Configuration file layered over the global and local ones
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Run operations on pool threads instead of worker processes
    #[arg(long, global = true)]
    in_process: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every .txt file in the directory
    Search {
        /// Text to look for (case-insensitive)
        query: String,

        /// Match the closest word of each line instead of exact substrings
        #[arg(short = 'f', long)]
        fuzzy: bool,

        /// Minimum confidence of fuzzy matches, between 0 and 1
        #[arg(short = 's', long)]
        score: Option<f64>,
    },

    /// Convert documents to .txt, deleting the originals
    Convert {
        /// Print one summary line per outcome
        #[arg(short = 'v', long)]
        verbose: bool,
    },

    /// Serve work items on stdin (used internally)
    #[command(hide = true)]
    Worker {
        #[arg(long, value_enum, default_value_t = ColorMode::Never)]
        color: ColorMode,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorMode {
    Always,
    Never,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", output::error_tag(), e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Worker { color }) = cli.command {
        return serve_worker(color, cli.log_level.as_deref());
    }

    let overrides = CliOverrides {
        target_dir: cli.dir.clone(),
        thread_count: cli.threads,
        fuzzy: match &cli.command {
            Some(Commands::Search { fuzzy: true, .. }) => Some(true),
            Some(Commands::Search { .. }) => Some(false),
            _ => None,
        },
        fuzzy_score: match &cli.command {
            Some(Commands::Search { score, .. }) => *score,
            _ => None,
        },
        verbose: matches!(cli.command, Some(Commands::Convert { verbose: true })),
        log_level: cli.log_level.clone(),
    };

    let config = SweepConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?
        .merge_with_cli(overrides);
    init_tracing(&config.log_level);
    debug!("Effective configuration: {:?}", config);

    let runner = BatchRunner::new(isolation(cli.in_process)?);
    let session = start_session(&config)?;

    match cli.command {
        Some(Commands::Search { query, .. }) => {
            let params = SearchParams::new(query, config.search_method()?);
            runner.search(
                session.directory(),
                session.workers(),
                &params,
                &mut io::stdout().lock(),
            )?;
        }
        Some(Commands::Convert { .. }) => {
            let params = ConvertParams {
                plain_text_extensions: config.plain_text_extensions.clone(),
                converter: config.converter.clone(),
                verbose: config.verbose,
            };
            runner.convert(
                session.directory(),
                session.workers(),
                &params,
                &mut io::stdout().lock(),
            )?;
        }
        Some(Commands::Worker { color }) => serve_worker(color, cli.log_level.as_deref())?,
        None => {
            let settings_path = cli.config.clone().or_else(SweepConfig::global_path);
            let stdin = io::stdin();
            Repl::new(
                stdin.lock(),
                io::stdout(),
                session,
                config,
                settings_path,
                runner,
            )
            .run()?;
        }
    }
    Ok(())
}

fn serve_worker(color: ColorMode, log_level: Option<&str>) -> Result<()> {
    output::set_color(color == ColorMode::Always);
    init_tracing(log_level.unwrap_or("warn"));
    let stdin = io::stdin();
    worker::serve(stdin.lock(), io::stdout().lock())?;
    Ok(())
}

/// Worker processes re-run this executable, inheriting the color decision
fn isolation(in_process: bool) -> Result<Isolation> {
    if in_process {
        return Ok(Isolation::InProcess);
    }
    let color = if output::color_enabled() {
        "always"
    } else {
        "never"
    };
    let command = WorkerCommand::current_exe(vec![
        "worker".to_string(),
        "--color".to_string(),
        color.to_string(),
    ])?;
    Ok(Isolation::Subprocess(command))
}

fn start_session(config: &SweepConfig) -> Result<Session> {
    let home = std::env::current_dir().context("Failed to read the current directory")?;
    let directory = match &config.target_dir {
        Some(dir) if dir.is_relative() => home.join(dir),
        Some(dir) => dir.clone(),
        None => home.clone(),
    };
    if !directory.is_dir() {
        return Err(textsweep::SweepError::directory_not_found(directory).into());
    }

    let session = Session::new(&directory, &home, num_cpus::get())
        .with_fuzzy(config.is_fuzzy())
        .with_score(config.fuzzy_score)?
        .with_workers(config.thread_count);
    Ok(session)
}
