//! XtremeT3 client - participant side of a two-player session
//!
//! # Architecture
//!
//! The console binary runs two tasks joined by channels:
//!
//! 1. **Authority Client Task**: keeps a TCP connection to the authority,
//!    registers under the player's name and turns wire messages into
//!    [`Event`]s
//! 2. **Main Loop**: the single consumer of those events; it applies them
//!    to [`ClientState`], renders, and turns player input into
//!    [`ClientCommand`]s
//!
//! Both respect a shared `CancellationToken` for graceful shutdown.

pub mod client;
pub mod error;
pub mod input;
pub mod render;
pub mod state;

// Re-export commonly used types
pub use client::{AuthorityClient, ClientConfig};
pub use error::{ClientError, Result};
pub use input::{parse_line, Action, ClientCommand, Event};
pub use state::ClientState;
