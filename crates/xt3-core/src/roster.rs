//! Participant roster: the two seats of a session and who holds them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{PlayerToken, Seat, SessionError};

/// Maximum number of participants in a session.
pub const MAX_PARTICIPANTS: usize = 2;

/// A registered participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Identity issued at registration
    pub token: PlayerToken,

    /// Display name supplied at registration
    pub name: String,

    /// Seat held for the whole registration
    pub seat: Seat,

    /// When the participant registered
    pub joined_at: DateTime<Utc>,

    /// Last request seen from this participant
    pub last_seen: DateTime<Utc>,
}

impl Participant {
    fn new(token: PlayerToken, name: String, seat: Seat) -> Self {
        let now = Utc::now();
        Self {
            token,
            name,
            seat,
            joined_at: now,
            last_seen: now,
        }
    }

    /// Seconds since the participant's last request.
    pub fn idle_seconds(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.last_seen)
            .num_seconds()
    }
}

/// The two seats of a session.
///
/// Admission fills First before Second. A refused registration leaves
/// the roster untouched.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    first: Option<Participant>,
    second: Option<Participant>,
}

impl Roster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, seat: Seat) -> &Option<Participant> {
        match seat {
            Seat::First => &self.first,
            Seat::Second => &self.second,
        }
    }

    fn slot_mut(&mut self, seat: Seat) -> &mut Option<Participant> {
        match seat {
            Seat::First => &mut self.first,
            Seat::Second => &mut self.second,
        }
    }

    /// Admits `name` into the first free seat.
    ///
    /// # Errors
    ///
    /// - `SessionError::SessionFull` if both seats are taken
    pub fn register(&mut self, name: impl Into<String>) -> Result<&Participant, SessionError> {
        let seat = Seat::ALL
            .into_iter()
            .find(|seat| self.slot(*seat).is_none())
            .ok_or(SessionError::SessionFull)?;

        let participant = Participant::new(PlayerToken::generate(), name.into(), seat);
        debug!(
            token = %participant.token.short(),
            seat = seat.label(),
            "Seat assigned"
        );

        Ok(&*self.slot_mut(seat).insert(participant))
    }

    /// Frees the seat held by `token`.
    ///
    /// Returns the removed participant, or `None` if the token is not
    /// registered (duplicate disconnects are expected and harmless).
    pub fn unregister(&mut self, token: &PlayerToken) -> Option<Participant> {
        let seat = self.seat_of(token)?;
        self.slot_mut(seat).take()
    }

    /// Returns the participant holding `token`.
    pub fn get(&self, token: &PlayerToken) -> Option<&Participant> {
        self.iter().find(|p| &p.token == token)
    }

    /// Returns the seat held by `token`.
    pub fn seat_of(&self, token: &PlayerToken) -> Option<Seat> {
        self.get(token).map(|p| p.seat)
    }

    /// Refreshes the liveness timestamp for `token`.
    ///
    /// Returns false if the token is unknown.
    pub fn touch(&mut self, token: &PlayerToken) -> bool {
        let Some(seat) = self.seat_of(token) else {
            return false;
        };
        if let Some(participant) = self.slot_mut(seat).as_mut() {
            participant.last_seen = Utc::now();
        }
        true
    }

    /// Display names in seat order (First, then Second).
    pub fn names(&self) -> Vec<String> {
        self.iter().map(|p| p.name.clone()).collect()
    }

    /// Iterates registered participants in seat order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.first.iter().chain(self.second.iter())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first.is_none() && self.second.is_none()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.first.is_some() && self.second.is_some()
    }
}
