//! Game authority using the actor pattern.
//!
//! One actor task owns the session: roster, board and turn. Connections
//! talk to it through [`GameHandle`]s; notifications flow back through
//! each participant's own outbound queue.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  GameCommand   ┌──────────────┐  try_send   ┌──────────────┐
//! │ Connection A │──────────────▶│  GameActor   │────────────▶│ A's queue    │
//! └──────────────┘   (mpsc)      │              │             └──────────────┘
//! ┌──────────────┐               │ Roster       │  try_send   ┌──────────────┐
//! │ Connection B │──────────────▶│ TurnArbiter  │────────────▶│ B's queue    │
//! └──────────────┘               │ FanOut       │             └──────────────┘
//!                                 └──────▲───────┘
//!                                        │ Prune (periodic)
//!                                 ┌──────┴───────┐
//!                                 │  prune task  │
//!                                 └──────────────┘
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::debug;

mod actor;
mod commands;
mod fanout;
mod handle;

pub use actor::GameActor;
pub use commands::{GameCommand, GameError, Registration};
pub use fanout::{FanOut, ParticipantSink};
pub use handle::GameHandle;

/// Command channel buffer size
const COMMAND_BUFFER: usize = 100;

/// Spawn the game actor and its prune task, returning a handle.
///
/// ```no_run
/// use std::time::Duration;
/// use xt3d::game::spawn_game;
///
/// #[tokio::main]
/// async fn main() {
///     let game = spawn_game(Duration::from_secs(5));
///     let outcome = game.current_outcome().await;
/// }
/// ```
pub fn spawn_game(prune_interval: Duration) -> GameHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

    let actor = GameActor::new(cmd_rx);
    tokio::spawn(actor.run());

    spawn_prune_task(cmd_tx.clone(), prune_interval);

    GameHandle::new(cmd_tx)
}

/// Spawn a background task that periodically asks the actor to drop
/// participants whose connection is gone.
fn spawn_prune_task(sender: mpsc::Sender<GameCommand>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = interval(every);

        loop {
            ticker.tick().await;

            if sender.send(GameCommand::Prune).await.is_err() {
                debug!("Prune task stopping: game channel closed");
                break;
            }
        }
    });
}
