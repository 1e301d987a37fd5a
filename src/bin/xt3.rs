//! XtremeT3 console client
//!
//! Joins the session hosted by an `xt3d` authority and plays from the
//! terminal.
//!
//! # Architecture
//!
//! 1. **Authority Client Task**: connection, registration and reconnects
//! 2. **Main Event Loop**: applies events to the client state, renders the
//!    board, and turns typed lines into commands
//!
//! # Usage
//!
//! ```text
//! xt3 --name Alice                          # authority on 127.0.0.1:10001
//! xt3 --server 192.168.1.20:10001 -n Bob    # remote authority
//! XT3_SERVER=host:10001 xt3                 # prompts for a name
//! ```

use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use xt3_client::client::{DEFAULT_SERVER, SERVER_ENV};
use xt3_client::input::HELP;
use xt3_client::render::render_screen;
use xt3_client::{
    parse_line, Action, AuthorityClient, ClientCommand, ClientConfig, ClientState, Event,
};

/// How long to wait for the unregister to go out after "quit".
const LEAVE_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// XtremeT3 - two-player networked tic-tac-toe
#[derive(Parser, Debug)]
#[command(name = "xt3", version, about)]
struct Args {
    /// Authority address (host:port)
    #[arg(short, long, env = SERVER_ENV, default_value = DEFAULT_SERVER)]
    server: String,

    /// Display name (prompted for if omitted)
    #[arg(short, long)]
    name: Option<String>,
}

/// Writes a block to stdout.
fn show(text: &str) {
    let mut stdout = std::io::stdout();
    let _ = writeln!(stdout, "{text}");
    let _ = stdout.flush();
}

// ============================================================================
// Console Input Thread
// ============================================================================

/// Reads stdin lines on a plain thread and forwards them to the main loop.
///
/// A blocking stdin read would keep the runtime from shutting down, so this
/// thread stays outside it. The channel closes on EOF.
fn spawn_input_thread() -> mpsc::UnboundedReceiver<String> {
    let (line_tx, line_rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    line_rx
}

/// Asks for a display name.
async fn prompt_name(input: &mut mpsc::UnboundedReceiver<String>) -> Result<String> {
    print!("Enter a display name: ");
    std::io::stdout().flush().context("Failed to write prompt")?;

    Ok(input.recv().await.unwrap_or_default())
}

// ============================================================================
// Main Event Loop
// ============================================================================

/// Drains events and player input until the player quits or the client
/// task ends.
async fn run_event_loop(
    state: &mut ClientState,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
    input: &mut mpsc::UnboundedReceiver<String>,
    command_tx: &mpsc::UnboundedSender<ClientCommand>,
    cancel_token: &CancellationToken,
) -> Result<()> {
    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    debug!("Event channel closed");
                    return Ok(());
                };

                // Reported as the client task's error instead
                if event == Event::SessionFull {
                    continue;
                }

                if state.apply(&event) {
                    show(&render_screen(state));
                } else if let Some(status) = &state.status {
                    show(status);
                }
            }

            line = input.recv() => {
                let line = match line {
                    Some(line) => line,
                    None => {
                        debug!("Stdin closed, leaving");
                        let _ = command_tx.send(ClientCommand::Leave);
                        return Ok(());
                    }
                };

                match parse_line(&line, state) {
                    Action::None => {}
                    Action::Command(command) => {
                        if command_tx.send(command).is_err() {
                            warn!("Failed to send command - client has stopped");
                        }
                    }
                    Action::Redraw => show(&render_screen(state)),
                    Action::Help => show(HELP),
                    Action::Notice(message) => show(&message),
                    Action::Quit => {
                        info!("User requested quit");
                        let _ = command_tx.send(ClientCommand::Leave);
                        return Ok(());
                    }
                }
            }

            _ = cancel_token.cancelled() => {
                return Ok(());
            }
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Stdout belongs to the board; logs go to stderr and stay quiet by default.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut input = spawn_input_thread();

    let name = match args.name {
        Some(name) => name,
        None => prompt_name(&mut input).await?,
    };
    let name = name.trim().to_string();
    if name.is_empty() {
        bail!("A display name is required");
    }

    let cancel_token = CancellationToken::new();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let client = AuthorityClient::new(
        ClientConfig::new(args.server, name.clone()),
        event_tx,
        command_rx,
        cancel_token.clone(),
    );
    let mut client_task = tokio::spawn(async move { client.run().await });

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C");
            shutdown_token.cancel();
        }
    });

    show(&format!("Joining as {name}. Type 'help' for commands."));

    let mut state = ClientState::new(name);
    run_event_loop(
        &mut state,
        &mut event_rx,
        &mut input,
        &command_tx,
        &cancel_token,
    )
    .await?;

    // Give the client a moment to send the unregister, then stop it.
    let result = match tokio::time::timeout(LEAVE_GRACE_PERIOD, &mut client_task).await {
        Ok(joined) => joined.context("Client task panicked")?,
        Err(_) => {
            cancel_token.cancel();
            client_task.await.context("Client task panicked")?
        }
    };
    cancel_token.cancel();

    result.map_err(Into::into)
}
