//! Command-line front end over the workspace library.
mod app;
mod main;

pub use app::*;
pub use main::*;
