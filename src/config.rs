use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{GdError, Result, VcsAuthor};

const WORKSPACE_DIR_NAME: &str = "workspace";
const NOTES_DIR_NAME: &str = "notes";
const WORKSPACE_INFO_FILE_NAME: &str = "workspace.json";
const CONFIG_FILE_NAME: &str = "config.json";

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// Platform user-data directory holding the workspace
    pub root_dir: PathBuf,

    /// Name recorded on commits made by the application
    pub author_name: String,

    /// Email recorded on commits made by the application
    pub author_email: String,
}

impl Default for Config {
    fn default() -> Self {
        let root_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".gdnotes"));

        Self {
            root_dir,
            author_name: "gdnotes".to_string(),
            author_email: "gdnotes@localhost".to_string(),
        }
    }
}

impl Config {
    /// Configuration rooted at `root_dir`, other settings defaulted.
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Loads the configuration file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| GdError::ConfigError {
            message: format!("{}: {}", path.display(), e),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Where the config file lives unless overridden on the command line.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Root of the git-backed workspace.
    pub fn workspace_dir(&self) -> PathBuf {
        self.root_dir.join(WORKSPACE_DIR_NAME)
    }

    /// Directory holding one sub-directory per note.
    pub fn notes_dir(&self) -> PathBuf {
        self.workspace_dir().join(NOTES_DIR_NAME)
    }

    /// Workspace settings file, kept outside the repository.
    pub fn workspace_info_path(&self) -> PathBuf {
        self.root_dir.join(WORKSPACE_INFO_FILE_NAME)
    }

    pub fn author(&self) -> VcsAuthor {
        VcsAuthor {
            name: self.author_name.clone(),
            email: self.author_email.clone(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "gdnotes", "gdnotes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn derived_paths() {
        let config = Config::with_root("/data");
        assert_eq!(config.workspace_dir(), Path::new("/data/workspace"));
        assert_eq!(config.notes_dir(), Path::new("/data/workspace/notes"));
        assert_eq!(config.workspace_info_path(), Path::new("/data/workspace.json"));
    }

    #[test]
    fn save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cfg").join("config.json");
        let mut config = Config::with_root(tmp.path());
        config.author_name = "Ada".into();

        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_gives_defaults_and_garbage_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        assert_eq!(Config::load(&path).unwrap(), Config::default());

        fs::write(&path, "not json").unwrap();
        assert!(matches!(Config::load(&path), Err(GdError::ConfigError { .. })));
    }
}
