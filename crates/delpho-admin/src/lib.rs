//! Delpho loop operator admin tool.
//!
//! Wires the venue reader, the executor writer and the sequencer together:
//! - `config`: TOML configuration with compiled-in defaults
//! - `cli`: subcommands and their mapping to wizard forms
//! - `app`: command execution

pub mod app;
pub mod cli;
pub mod config;
pub mod error;

pub use app::{Application, CoreOrder};
pub use cli::{Cli, Command};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
