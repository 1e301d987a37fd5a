//! XT3 Protocol - Wire protocol for authority communication
//!
//! This crate provides the message types exchanged between the game
//! authority (xt3d) and participant clients: request/response pairs for
//! the authority surface, and push notifications for the fan-out.
//!
//! Messages travel as newline-delimited JSON over TCP.

pub mod message;
pub mod version;
pub mod view;

pub use message::{AuthorityMessage, ClientMessage, MessageType};
pub use version::ProtocolVersion;
pub use view::{GameSnapshot, OutcomeView};
