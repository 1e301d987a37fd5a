//! Game actor - owns the session and the board and processes commands.
//!
//! The GameActor is the single owner of game state. Registration, moves,
//! resets and acknowledgements are applied one command at a time, and
//! every notification is built right after the mutation it describes,
//! before the next command is looked at. Participants therefore never
//! see a half-applied change.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Reply channel send failures are ignored (the caller went away)
//! - Notification failures are logged by the fan-out and never surface here

use std::collections::HashSet;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use xt3_core::{MoveError, MoveReport, PlayerToken, Roster, TurnArbiter};
use xt3_protocol::{AuthorityMessage, GameSnapshot};

use super::commands::{GameCommand, GameError, Registration};
use super::fanout::{FanOut, ParticipantSink};

/// The game actor - owns the roster, the arbiter and the fan-out table.
///
/// # Controls hint
///
/// `controls_enabled` mirrors the last hint pushed to participants. It
/// goes false with the first mark of a game and true again after a reset
/// or once every registered participant has acknowledged the finished
/// game.
pub struct GameActor {
    /// Command receiver
    receiver: mpsc::Receiver<GameCommand>,

    /// Seated participants
    roster: Roster,

    /// Board and turn arbitration
    arbiter: TurnArbiter,

    /// Per-participant outbound queues
    fanout: FanOut,

    /// Tokens that acknowledged the current finished game
    acknowledged: HashSet<PlayerToken>,

    /// Current "New Game" hint
    controls_enabled: bool,
}

impl GameActor {
    /// Creates a game actor with an empty session.
    pub fn new(receiver: mpsc::Receiver<GameCommand>) -> Self {
        Self {
            receiver,
            roster: Roster::new(),
            arbiter: TurnArbiter::new(),
            fanout: FanOut::new(),
            acknowledged: HashSet::new(),
            controls_enabled: true,
        }
    }

    /// Runs the actor event loop until every handle is dropped.
    pub async fn run(mut self) {
        info!("Game actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(participants = self.roster.len(), "Game actor stopped");
    }

    fn handle_command(&mut self, cmd: GameCommand) {
        match cmd {
            GameCommand::Register {
                name,
                sink,
                respond_to,
            } => {
                let result = self.handle_register(name, sink);
                let _ = respond_to.send(result);
            }
            GameCommand::Unregister {
                token,
                name,
                respond_to,
            } => {
                let removed = self.handle_unregister(token, &name);
                let _ = respond_to.send(removed);
            }
            GameCommand::SubmitMove {
                cell,
                token,
                respond_to,
            } => {
                let result = self.handle_submit_move(cell, token);
                let _ = respond_to.send(result);
            }
            GameCommand::Reset { respond_to } => {
                self.handle_reset();
                let _ = respond_to.send(());
            }
            GameCommand::CurrentOutcome { respond_to } => {
                let _ = respond_to.send(self.arbiter.outcome());
            }
            GameCommand::GameDone { token, respond_to } => {
                self.handle_game_done(token);
                let _ = respond_to.send(());
            }
            GameCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
            GameCommand::Prune => {
                self.handle_prune();
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    fn handle_register(
        &mut self,
        name: String,
        sink: ParticipantSink,
    ) -> Result<Registration, GameError> {
        let participant = match self.roster.register(name) {
            Ok(participant) => participant,
            Err(err) => {
                warn!(current = self.roster.len(), "Session full, rejecting registration");
                return Err(err.into());
            }
        };
        let registration = Registration {
            token: participant.token,
            seat: participant.seat,
        };

        info!(
            token = %registration.token.short(),
            name = %participant.name,
            seat = registration.seat.label(),
            "Participant registered"
        );

        // A newcomer never saw the finished game, so they count as having
        // acknowledged it.
        let finished = self.arbiter.outcome().is_terminal();
        if finished {
            self.acknowledged.insert(registration.token);
            self.maybe_enable_controls();
        }

        self.fanout.attach(registration.token, sink);
        self.broadcast_roster();

        // Late joiners need the current board and hint without waiting
        // for the next change.
        self.fanout.send_to(
            &registration.token,
            AuthorityMessage::board_changed(self.arbiter.board().symbols()),
        );
        if finished {
            self.fanout
                .send_to(&registration.token, AuthorityMessage::GameFinished);
        }
        self.fanout.send_to(
            &registration.token,
            AuthorityMessage::controls_hint(self.controls_enabled),
        );

        Ok(registration)
    }

    fn handle_unregister(&mut self, token: PlayerToken, name: &str) -> bool {
        let Some(participant) = self.roster.unregister(&token) else {
            debug!(token = %token.short(), name, "Unregister for unknown token ignored");
            return false;
        };

        self.fanout.detach(&token);
        self.acknowledged.remove(&token);

        info!(
            token = %token.short(),
            name = %participant.name,
            seat = participant.seat.label(),
            remaining = self.roster.len(),
            "Participant unregistered"
        );

        if self.roster.is_empty() {
            self.hard_reset();
        } else {
            self.broadcast_roster();
            self.maybe_enable_controls();
        }

        true
    }

    fn handle_submit_move(
        &mut self,
        cell: usize,
        token: PlayerToken,
    ) -> Result<MoveReport, GameError> {
        let seat = self.roster.seat_of(&token).ok_or(MoveError::UnknownToken)?;
        self.roster.touch(&token);

        let report = match self.arbiter.submit_move(cell, seat) {
            Ok(report) => report,
            Err(err) => {
                debug!(token = %token.short(), cell, error = %err, "Move rejected");
                return Err(err.into());
            }
        };

        self.fanout
            .broadcast(&AuthorityMessage::board_changed(self.arbiter.board().symbols()));

        if report.opened_game {
            self.set_controls(false);
        }

        if report.outcome.is_terminal() {
            info!(outcome = %report.outcome, "Game finished");
            self.fanout.broadcast(&AuthorityMessage::GameFinished);
        }

        Ok(report)
    }

    fn handle_reset(&mut self) {
        self.arbiter.reset();
        self.acknowledged.clear();

        info!(participants = self.roster.len(), "Board reset");

        self.fanout
            .broadcast(&AuthorityMessage::board_changed(self.arbiter.board().symbols()));
        self.controls_enabled = true;
        self.fanout.broadcast(&AuthorityMessage::controls_hint(true));
    }

    fn handle_game_done(&mut self, token: PlayerToken) {
        if !self.arbiter.outcome().is_terminal() {
            debug!(token = %token.short(), "Game done while in progress ignored");
            return;
        }
        if self.roster.get(&token).is_none() {
            debug!(token = %token.short(), "Game done from unknown token ignored");
            return;
        }

        self.roster.touch(&token);
        self.acknowledged.insert(token);
        debug!(
            token = %token.short(),
            acknowledged = self.acknowledged.len(),
            participants = self.roster.len(),
            "Game done acknowledged"
        );

        self.maybe_enable_controls();
    }

    fn handle_prune(&mut self) {
        for token in self.fanout.closed_tokens() {
            let (name, idle_secs) = self
                .roster
                .get(&token)
                .map(|p| (p.name.clone(), p.idle_seconds()))
                .unwrap_or_default();

            info!(
                token = %token.short(),
                name = %name,
                idle_secs,
                "Pruning participant with closed queue"
            );
            self.handle_unregister(token, &name);
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::capture(&self.arbiter, self.roster.names())
    }

    fn broadcast_roster(&self) {
        self.fanout
            .broadcast(&AuthorityMessage::roster_changed(self.roster.names()));
    }

    fn set_controls(&mut self, enabled: bool) {
        if self.controls_enabled != enabled {
            self.controls_enabled = enabled;
            self.fanout
                .broadcast(&AuthorityMessage::controls_hint(enabled));
        }
    }

    /// Re-enables "New Game" once every seated participant acknowledged
    /// the finished game.
    fn maybe_enable_controls(&mut self) {
        if self.roster.is_empty() || !self.arbiter.outcome().is_terminal() {
            return;
        }

        let all_done = self
            .roster
            .iter()
            .all(|p| self.acknowledged.contains(&p.token));

        if all_done {
            debug!("Every participant acknowledged the finished game");
            self.set_controls(true);
        }
    }

    /// Clears everything tied to the previous session once it empties.
    fn hard_reset(&mut self) {
        self.arbiter.reset();
        self.acknowledged.clear();
        self.controls_enabled = true;
        info!("Session empty, board hard-reset");
    }
}
