// bhmigrate - move saved queries from a Legacy export into a Community server

mod config;
mod exit_codes;
mod legacy;
mod migrate;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use bhmigrate_api_client::Client;

use config::Config;
use exit_codes::{EXIT_CONFIG, EXIT_CONNECT, EXIT_ERROR, EXIT_INPUT, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use legacy::{DEFAULT_LEGACY_FILE, DEFAULT_NEW_FILE, DEFAULT_WORK_FILE};
use migrate::MigrateOptions;

#[derive(Parser)]
#[command(name = "bhmigrate")]
#[command(about = "Migrate saved queries from a Legacy export into a Community server")]
#[command(long_version = long_version())]
#[command(version)]
#[command(after_help = "\
Environment:
  BHE_SCHEME     http or https
  BHE_DOMAIN     server host name
  BHE_PORT       server port
  BHE_TOKEN_ID   API token id
  BHE_TOKEN_KEY  API token secret

Examples:
  bhmigrate -i
  bhmigrate -i exports/customqueries.json --delay-ms 1000
  bhmigrate --new
  bhmigrate --delete")]
struct Cli {
    /// Import a Legacy customqueries.json export
    #[arg(short = 'i', value_name = "FILE", num_args = 0..=1, default_missing_value = DEFAULT_LEGACY_FILE)]
    import: Option<PathBuf>,

    /// Import a new-format file (JSON array of {name, query})
    #[arg(long = "new", value_name = "FILE", num_args = 0..=1, default_missing_value = DEFAULT_NEW_FILE)]
    new_file: Option<PathBuf>,

    /// Delete all saved queries (imports are skipped)
    #[arg(long)]
    delete: bool,

    /// Pause between create requests, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 500)]
    delay_ms: u64,

    /// Intermediate file for the Legacy import (removed afterwards)
    #[arg(long, value_name = "PATH", default_value = DEFAULT_WORK_FILE)]
    work_file: PathBuf,

    /// Debug logging on stderr (RUST_LOG takes precedence)
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Cli {
    fn has_action(&self) -> bool {
        self.import.is_some() || self.new_file.is_some() || self.delete
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"), " (", env!("BHMIGRATE_BUILD_PROFILE"), ")",
        "\nsigning: bhesignature (HMAC-SHA-256 chain)",
    )
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "warn,bhmigrate=debug,bhmigrate_api_client=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if !cli.has_action() {
        eprintln!("{}", Cli::command().render_help());
        return Err(CliError::usage());
    }

    let config = Config::from_env()?;
    tracing::debug!(target_url = %config.base_url(), "configuration loaded");

    let client = Client::new(config.scheme, config.host, config.port, config.credentials)
        .map_err(migrate::connect_error)?;

    let opts = MigrateOptions {
        legacy_file: cli.import,
        new_file: cli.new_file,
        delete_all: cli.delete,
        delay: Duration::from_millis(cli.delay_ms),
        work_file: cli.work_file,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    migrate::run(&client, &opts, &mut out)?;
    Ok(())
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn error(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Usage already printed; nothing more to report.
    pub fn usage() -> Self {
        Self { code: EXIT_USAGE, message: String::new(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    pub fn connect(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONNECT, message: msg.into(), hint: None }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INPUT, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
