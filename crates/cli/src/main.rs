//! Command-line interface for the `repolens` application.
//!
//! This binary is a thin entry point; argument parsing and command dispatch
//! live in the library's [`repolens::run`].

fn main() -> anyhow::Result<()> {
    repolens::run()
}
