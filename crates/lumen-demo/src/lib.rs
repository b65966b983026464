#![forbid(unsafe_code)]

//! Selectable, renameable item list built on `lumen-store` and `lumen-view`.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod script;
pub mod trace;

pub use app::App;
pub use cli::{Cli, run, run_from_env};
pub use config::DemoConfig;
pub use error::{DemoError, Result};
pub use script::ScriptStep;
pub use trace::{TraceConfig, TraceRecorder, TraceSummary};
