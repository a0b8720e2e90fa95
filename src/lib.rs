//! Git-backed note workspace library
//!
//! This library maps notes onto a directory layout inside a workspace, reads
//! and writes them safely, and keeps the workspace in sync with a backing git
//! repository.

mod cli;
mod config;
mod errors;
pub mod fs_gateway;
mod helper;
pub mod layout;
mod note;
mod status;
mod storage;
mod telemetry;
mod types;
mod vcs;
mod vcs_worker;
mod workspace;

// Re-export key components
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use helper::*;
pub use note::*;
pub use status::*;
pub use storage::*;
pub use telemetry::*;
pub use types::*;
pub use vcs::*;
pub use vcs_worker::*;
pub use workspace::*;

