//! Command-line interface.

pub mod commands;
pub mod types;

pub use types::{Cli, Commands, Driver};

/// Print a command failure in the requested format and exit nonzero.
pub fn handle_error(err: anyhow::Error, json: bool) {
    if json {
        let payload = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{payload}");
    } else {
        eprintln!("error: {err:#}");
    }
    std::process::exit(1);
}
