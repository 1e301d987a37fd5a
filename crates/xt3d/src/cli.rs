//! Command-line entry point for the `xt3d` binary.
//!
//! ```bash
//! # Start the authority (foreground) on the default address
//! xt3d start
//!
//! # Start in the background on all interfaces
//! xt3d start -d --listen 0.0.0.0:10001
//!
//! # Stop / inspect a background authority
//! xt3d stop
//! xt3d status
//!
//! # Enable debug logging
//! RUST_LOG=xt3d=debug xt3d start
//! ```

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{AuthorityConfig, LISTEN_ENV};
use crate::daemon::{self, PidFile};
use crate::game::spawn_game;
use crate::server::AuthorityServer;

/// XtremeT3 authority - hosts one two-player tic-tac-toe session
#[derive(Parser, Debug)]
#[command(name = "xt3d", version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the authority
    Start {
        /// Run as a background daemon (fork to background)
        #[arg(short = 'd', long)]
        daemon: bool,

        /// Address to listen on (overrides config file and XT3_LISTEN)
        #[arg(short, long)]
        listen: Option<String>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Stop the running authority
    Stop,
    /// Show authority status
    Status,
}

impl Default for Command {
    fn default() -> Self {
        Self::Start {
            daemon: false,
            listen: None,
            config: None,
        }
    }
}

/// Builds the effective config: file, then environment, then flag.
pub fn resolve_config(
    config_path: Option<&PathBuf>,
    listen: Option<&str>,
) -> Result<AuthorityConfig> {
    let config = match config_path {
        Some(path) => AuthorityConfig::from_file(path)?,
        None => AuthorityConfig::default(),
    };

    let config = config.with_env_overrides()?;

    Ok(match listen {
        Some(listen) => config.with_listen(listen)?,
        None => config,
    })
}

/// Runs the parsed command line.
pub fn run(args: Args) -> Result<()> {
    let pid_file = PidFile::default();

    match args.command.unwrap_or_default() {
        Command::Start {
            daemon,
            listen,
            config,
        } => {
            if let Some(pid) = pid_file.running_pid() {
                eprintln!("Authority is already running (PID {pid})");
                eprintln!("Use 'xt3d stop' to stop it first.");
                process::exit(1);
            }

            // Resolve before forking so configuration errors reach the terminal.
            let config = resolve_config(config.as_ref(), listen.as_deref())
                .context("Invalid configuration")?;

            if daemon {
                daemon::daemonize()?;
            }

            pid_file.write_current()?;
            let result = run_authority(config);
            pid_file.remove();

            result
        }
        Command::Stop => match pid_file.running_pid() {
            Some(pid) => {
                println!("Stopping authority (PID {pid})...");
                if daemon::stop(pid)? {
                    println!("Authority stopped.");
                    Ok(())
                } else {
                    eprintln!("Authority did not stop within 5 seconds.");
                    process::exit(1);
                }
            }
            None => {
                println!("Authority is not running.");
                Ok(())
            }
        },
        Command::Status => match pid_file.running_pid() {
            Some(pid) => {
                println!("Authority is running (PID {pid})");
                if let Ok(listen) = std::env::var(LISTEN_ENV) {
                    println!("Listen: {listen}");
                }
                Ok(())
            }
            None => {
                println!("Authority is not running.");
                process::exit(1);
            }
        },
    }
}

/// Runs the authority until SIGINT/SIGTERM.
#[tokio::main]
async fn run_authority(config: AuthorityConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("xt3d=info".parse()?)
                .add_directive("xt3_core=info".parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        listen = %config.listen,
        "XtremeT3 authority starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let game = spawn_game(config.prune_interval());
    let server = AuthorityServer::bind(&config, game, cancel_token).await?;

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("XtremeT3 authority stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_start_flags_parse() {
        let args = Args::parse_from(["xt3d", "start", "-d", "--listen", "0.0.0.0:4000"]);
        assert_eq!(
            args.command,
            Some(Command::Start {
                daemon: true,
                listen: Some("0.0.0.0:4000".into()),
                config: None,
            })
        );
    }

    #[test]
    fn test_no_subcommand_defaults_to_foreground_start() {
        let args = Args::parse_from(["xt3d"]);
        assert_eq!(args.command.unwrap_or_default(), Command::default());
    }

    #[test]
    fn test_flag_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen = \"127.0.0.1:5000\"\nqueue_depth = 4").unwrap();

        let config =
            resolve_config(Some(&file.path().to_path_buf()), Some("127.0.0.1:6000")).unwrap();

        assert_eq!(config.listen.port(), 6000);
        assert_eq!(config.queue_depth, 4);
    }
}
