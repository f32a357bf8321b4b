pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::config::{cli::CliArgs, ImportConfig};
pub use crate::core::engine::{run_import, ImportEngine};
pub use crate::core::run_log::RunLog;
pub use crate::core::{Action, ImportReport, Record, Token, TokenProvider};
pub use crate::utils::error::{ImportError, Result};
