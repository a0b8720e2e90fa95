//! Shared aliases and the command-line command set.
use std::path::PathBuf;

use clap::Subcommand;

use crate::GdError;

/// A specialized Result type for gdnotes operations.
pub type Result<T> = std::result::Result<T, GdError>;

/// Available subcommands for the gdnotes application
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new workspace with an empty git repository
    Init,

    /// Clone an existing workspace from a remote repository
    Clone {
        /// Remote repository URL
        url: String,

        /// Username for basic authentication
        #[clap(short, long, requires = "password")]
        username: Option<String>,

        /// Password for basic authentication
        #[clap(short, long, requires = "username")]
        password: Option<String>,

        /// OAuth2 personal access token
        #[clap(short, long, conflicts_with_all = ["username", "password"])]
        token: Option<String>,
    },

    /// Show the git status of the workspace
    Status,

    /// List notes, newest first
    List {
        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Create a new note
    New {
        /// Title of the note
        #[clap(short = 'T', long)]
        title: String,

        /// Stacks to label the note with (comma-separated)
        #[clap(short, long)]
        stacks: Option<String>,

        /// Initial text of the note
        #[clap(short = 'x', long)]
        text: Option<String>,
    },

    /// Show a note by its directory name
    Show {
        /// Note directory name, e.g. 21-03-04-My-note.gd
        name: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Delete a note by its directory name
    Delete {
        /// Note directory name
        name: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Commit the given workspace-relative paths
    Commit {
        /// Commit message
        #[clap(short, long)]
        message: String,

        /// Paths to stage, relative to the workspace root
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show or change the workspace theme
    Theme {
        /// New theme: light or dark
        #[clap(value_parser = ["light", "dark"])]
        theme: Option<String>,
    },
}
