// main.rs
//
// Reads one compose request as JSON from stdin (or --input), prints one JSON
// response line on stdout. Logs go to stderr.

use clap::Parser;
use mockup_compositor::{process_request, ComposeConfig, ComposeResponse, MockupError};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Composite artwork into a mockup and emit a base64 JPEG")]
struct Cli {
    /// Read the request from this file instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,

    /// Processing budget in seconds; overrides PSD_PROCESS_TIMEOUT
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let response = match run(&cli) {
        Ok(response) => response,
        Err(err) => ComposeResponse::failure(&err),
    };

    println!("{}", response.to_json());
    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run(cli: &Cli) -> Result<ComposeResponse, MockupError> {
    let mut config = ComposeConfig::from_env()?;
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    debug!(timeout_secs = config.timeout.as_secs(), "configuration loaded");

    let input = read_input(cli.input.as_deref())?;
    info!(bytes = input.len(), "request received");
    Ok(process_request(&input, config))
}

fn read_input(path: Option<&std::path::Path>) -> Result<String, MockupError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            MockupError::invalid_request(format!("failed to read {}: {e}", path.display()))
        }),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .map_err(|e| MockupError::invalid_request(format!("failed to read stdin: {e}")))?;
            Ok(input)
        }
    }
}
