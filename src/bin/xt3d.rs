//! XtremeT3 authority - hosts one two-player tic-tac-toe session
//!
//! # Usage
//!
//! ```bash
//! # Start the authority (foreground)
//! xt3d start
//!
//! # Start the authority (background/daemonized)
//! xt3d start -d
//!
//! # Stop the authority
//! xt3d stop
//!
//! # Check authority status
//! xt3d status
//! ```

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    xt3d::cli::run(xt3d::cli::Args::parse())
}
