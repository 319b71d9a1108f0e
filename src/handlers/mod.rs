//! Command handlers.
//!
//! Each handler returns a report value; `main.rs` prints it. Keeping the
//! output out of the handlers lets tests inspect the results directly.

pub mod compose;
pub mod demo;

pub use compose::{ComposeReport, ComposeRequest, execute_compose};
pub use demo::{DemoReport, DemoStep, Greeter, execute_demo};
