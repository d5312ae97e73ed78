//! devpath - command-line client for device-path nodes.
//!
//! Reads node metadata, process views and writes, and can watch or wait on a
//! process's live state.

use clap::{Parser, Subcommand};
use devpath_client::mediator::{Representation, RequestBody};
use devpath_client::observability::init_tracing_with;
use devpath_client::subscription::{observer_fn, StateUpdate};
use devpath_client::{ClientConfig, NodeClient, ProcessId, ProcessViews};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "devpath", version, about = "Client for device-path nodes")]
struct Cli {
    /// Node base URL (overrides the config file).
    #[arg(long, env = "DEVPATH_ENDPOINT")]
    endpoint: Option<String>,

    /// Request timeout, e.g. `500ms` or `30s` (overrides the config file).
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Node metadata.
    Info,
    /// Live state of a process.
    Now { pid: ProcessId },
    /// Cached state of a process.
    Cached { pid: ProcessId },
    /// Accepted writes of a process.
    Log { pid: ProcessId },
    /// A region of the cached state.
    Subtree { pid: ProcessId, path: Option<String> },
    /// Live state, log and cached subtree in one go.
    Aggregate { pid: ProcessId },
    /// Submit a write.
    Submit {
        pid: ProcessId,
        #[arg(long)]
        action: String,
        /// Body; sent as JSON when it parses, as text otherwise.
        #[arg(long, default_value = "{}")]
        data: String,
        /// Extra header as `name:value` (repeatable).
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },
    /// Print live state on every poll until interrupted.
    Watch {
        pid: ProcessId,
        /// Polling interval, e.g. `1s`.
        #[arg(long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,
    },
    /// Poll until the value at a JSON pointer equals the expected value.
    Wait {
        pid: ProcessId,
        #[arg(long)]
        pointer: String,
        /// Expected value; compared as JSON when it parses, as a string otherwise.
        #[arg(long)]
        equals: String,
        #[arg(long)]
        attempts: Option<u32>,
        /// Sleep between attempts, e.g. `250ms`.
        #[arg(long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,
    },
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    raw.split_once(':')
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .ok_or_else(|| format!("header {raw:?} is not name:value"))
}

fn parse_json_or_string(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

fn print(rep: &Representation) {
    println!("{rep}");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    if let Some(endpoint) = cli.endpoint {
        config.endpoint.base_url = endpoint;
    }
    if let Some(timeout) = cli.timeout {
        config.endpoint.timeout = timeout;
    }

    // Initialize observability
    init_tracing_with(&config.observability);

    let client = NodeClient::from_config(&config)?;
    tracing::debug!(endpoint = %config.endpoint.base_url, "client ready");

    match cli.command {
        Command::Info => print(&client.info().await?),
        Command::Now { pid } => print(&client.process(pid).live_state().await?),
        Command::Cached { pid } => print(&client.process(pid).cached_state().await?),
        Command::Log { pid } => print(&client.process(pid).log().await?),
        Command::Subtree { pid, path } => {
            print(&client.process(pid).cached_subtree(path.as_deref()).await?)
        }
        Command::Aggregate { pid } => {
            let aggregate = client.engine(pid).aggregate().await?;
            println!("{}", serde_json::to_string_pretty(&aggregate)?);
        }
        Command::Submit {
            pid,
            action,
            data,
            headers,
        } => {
            let body = match serde_json::from_str::<serde_json::Value>(&data) {
                Ok(value) => RequestBody::Json(value),
                Err(_) => RequestBody::Text(data),
            };
            let headers: Vec<(&str, &str)> = headers
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str()))
                .collect();
            print(&client.process(pid).submit(&action, body, &headers).await?);
        }
        Command::Watch { pid, interval } => {
            let interval = interval.unwrap_or(config.polling.interval);
            let engine = client.engine(pid);
            engine
                .subscribe(observer_fn(|update: &StateUpdate| {
                    println!("[tick {} @ {}]\n{}", update.tick, update.observed_at, update.state);
                    Ok(())
                }))
                .await;
            engine.start(interval).await?;
            tokio::signal::ctrl_c().await?;
            engine.shutdown().await;
        }
        Command::Wait {
            pid,
            pointer,
            equals,
            attempts,
            interval,
        } => {
            let expected = parse_json_or_string(&equals);
            let attempts = attempts.unwrap_or(config.polling.wait_attempts);
            let interval = interval.unwrap_or(config.polling.wait_interval);
            let state = client
                .engine(pid)
                .wait_for(
                    |state| state.pointer(&pointer) == Some(&expected),
                    attempts,
                    interval,
                )
                .await?;
            print(&state);
        }
    }

    Ok(())
}
