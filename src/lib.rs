//! Command-line front end for svcbind.
//!
//! Wires the dependency-binding core to the in-memory registry. The binary
//! in `main.rs` only parses arguments, installs logging and dispatches to
//! the handlers here.
#![deny(unused_crate_dependencies)]

// Used only by the binary target.
use tracing_subscriber as _;

pub mod commands;
pub mod handlers;
pub mod logging;
pub mod parser;

pub use commands::Commands;
pub use parser::Cli;
