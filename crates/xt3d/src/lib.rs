//! XtremeT3 authority - game actor and TCP server
//!
//! This crate hosts exactly one two-player session:
//! - `game` - the game actor owning roster, board and turn, plus fan-out
//! - `server` - TCP listener and per-connection handlers
//! - `config` - authority configuration (TOML file, environment, flags)
//! - `daemon` - PID file and background process helpers
//! - `cli` - the `xt3d` command line
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        xt3d authority                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │ AuthorityServer │────▶│         GameActor           │   │
//! │  │  (TcpListener)  │     │ (roster, arbiter, fan-out)  │   │
//! │  └────────┬────────┘     └──────────────┬──────────────┘   │
//! │           │                             │                   │
//! │           │ connections                 │ notifications     │
//! │           ▼                             ▼                   │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │ConnectionHandler│────▶│  per-participant outbound   │   │
//! │  │ (per connection)│     │  queue + writer task        │   │
//! │  └─────────────────┘     └─────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod cli;
pub mod config;
pub mod daemon;
pub mod game;
pub mod server;

pub use config::AuthorityConfig;
pub use game::{spawn_game, GameHandle};
pub use server::AuthorityServer;
