//! The `repolens` command-line application.
//!
//! [`run`] parses arguments, initializes logging and dispatches to the
//! command handlers. Everything else in this crate is internal.

mod app;
mod cli;
mod commands;
mod render;

pub use app::run;
