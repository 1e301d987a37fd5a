//! Notification fan-out to registered participants.
//!
//! Every participant owns a bounded outbound queue drained by its
//! connection's writer task. The actor only ever enqueues with
//! `try_send`, so a slow or dead participant can never stall the game:
//! a full or closed queue is logged and the message is dropped. The next
//! state change carries a fresh snapshot anyway.

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use xt3_core::PlayerToken;
use xt3_protocol::AuthorityMessage;

/// Outbound queue of a single participant.
pub type ParticipantSink = mpsc::Sender<AuthorityMessage>;

/// Delivery channels of every registered participant, keyed by token.
#[derive(Debug, Default)]
pub struct FanOut {
    sinks: HashMap<PlayerToken, ParticipantSink>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the delivery channel for a newly registered participant.
    pub fn attach(&mut self, token: PlayerToken, sink: ParticipantSink) {
        self.sinks.insert(token, sink);
    }

    /// Detaches a participant. Returns false if it was not attached.
    pub fn detach(&mut self, token: &PlayerToken) -> bool {
        self.sinks.remove(token).is_some()
    }

    /// Enqueues `msg` for a single participant.
    ///
    /// Returns false if the message was dropped.
    pub fn send_to(&self, token: &PlayerToken, msg: AuthorityMessage) -> bool {
        match self.sinks.get(token) {
            Some(sink) => deliver(token, sink, msg),
            None => {
                debug!(token = %token.short(), kind = msg.kind(), "No sink for participant");
                false
            }
        }
    }

    /// Enqueues `msg` for every attached participant.
    ///
    /// Returns the number of participants the message was queued for.
    /// Failures are isolated per participant.
    pub fn broadcast(&self, msg: &AuthorityMessage) -> usize {
        self.sinks
            .iter()
            .filter(|(token, sink)| deliver(token, sink, msg.clone()))
            .count()
    }

    /// Tokens whose outbound queue has been closed by the receiving side.
    pub fn closed_tokens(&self) -> Vec<PlayerToken> {
        self.sinks
            .iter()
            .filter(|(_, sink)| sink.is_closed())
            .map(|(token, _)| *token)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

/// Non-blocking enqueue with failure logging.
fn deliver(token: &PlayerToken, sink: &ParticipantSink, msg: AuthorityMessage) -> bool {
    let kind = msg.kind();
    match sink.try_send(msg) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(token = %token.short(), kind, "Outbound queue full, dropping notification");
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!(token = %token.short(), kind, "Outbound queue closed, dropping notification");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_reaches_every_sink() {
        let mut fanout = FanOut::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        fanout.attach(PlayerToken::generate(), tx_a);
        fanout.attach(PlayerToken::generate(), tx_b);

        assert_eq!(fanout.broadcast(&AuthorityMessage::GameFinished), 2);
        assert_eq!(rx_a.try_recv().unwrap(), AuthorityMessage::GameFinished);
        assert_eq!(rx_b.try_recv().unwrap(), AuthorityMessage::GameFinished);
    }

    #[test]
    fn test_full_queue_does_not_block_others() {
        let mut fanout = FanOut::new();
        let (tx_slow, _rx_slow) = mpsc::channel(1);
        let (tx_fast, mut rx_fast) = mpsc::channel(8);
        fanout.attach(PlayerToken::generate(), tx_slow);
        fanout.attach(PlayerToken::generate(), tx_fast);

        fanout.broadcast(&AuthorityMessage::controls_hint(false));
        let delivered = fanout.broadcast(&AuthorityMessage::controls_hint(true));

        assert_eq!(delivered, 1);
        assert_eq!(rx_fast.try_recv().unwrap(), AuthorityMessage::controls_hint(false));
        assert_eq!(rx_fast.try_recv().unwrap(), AuthorityMessage::controls_hint(true));
    }

    #[test]
    fn test_closed_tokens_reports_dropped_receivers() {
        let mut fanout = FanOut::new();
        let gone = PlayerToken::generate();
        let alive = PlayerToken::generate();
        let (tx_gone, rx_gone) = mpsc::channel(1);
        let (tx_alive, _rx_alive) = mpsc::channel(1);
        fanout.attach(gone, tx_gone);
        fanout.attach(alive, tx_alive);

        drop(rx_gone);

        assert_eq!(fanout.closed_tokens(), vec![gone]);
        assert!(!fanout.send_to(&gone, AuthorityMessage::GameFinished));
        assert!(fanout.send_to(&alive, AuthorityMessage::GameFinished));
    }

    #[test]
    fn test_send_to_unknown_token_is_dropped() {
        let fanout = FanOut::new();
        assert!(!fanout.send_to(&PlayerToken::generate(), AuthorityMessage::GameFinished));
    }
}
