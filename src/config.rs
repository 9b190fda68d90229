use crate::errors::{FileOperation, IoError};
use indexmap::IndexMap;
use miette::Diagnostic;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SettingsError {
    #[error("I/O error within settings domain")]
    #[diagnostic(code(pearcontents::settings::io))]
    Io(#[from] IoError),

    #[error("Unable to parse toml file at '{path}': {source}")]
    #[diagnostic(code(pearcontents::settings::parse_toml), help("Review toml file"))]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Tunables of a single `contents` run.
///
/// Every field falls back to the built-in value when the settings file omits it. A table
/// present in the file (`dir_roles`, `roles`) replaces the built-in table as a whole.
#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Install base written on the generated `<dir>` and `<file>` nodes.
    pub base_install_dir: String,
    /// File name of the manifest written into the destination directory.
    pub package_file: String,
    /// Role given to files nothing else assigns a role to.
    pub default_role: String,
    /// Root-level file names excluded on top of `package.xml` and `package2.xml`.
    pub ignore: Vec<String>,
    /// Directory prefix -> role.
    pub dir_roles: IndexMap<String, String>,
    /// File extension -> role, consulted when no directory rule matches.
    pub roles: IndexMap<String, String>,
}
impl Default for Settings {
    fn default() -> Self {
        let dir_roles = [
            "app/code/core",
            "app/code/community",
            "app/code/local",
            "www",
        ]
        .into_iter()
        .map(|dir| (dir.to_string(), "www".to_string()))
        .collect();

        let roles = IndexMap::from([("php".to_string(), "www".to_string())]);

        Self {
            base_install_dir: "/".to_string(),
            package_file: "package.xml".to_string(),
            default_role: "data".to_string(),
            ignore: Vec::new(),
            dir_roles,
            roles,
        }
    }
}
impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path)
            .map_err(|error| IoError::new(FileOperation::Read, path.to_path_buf(), error))?;

        let parsed = toml::from_str(&content).map_err(|err| SettingsError::ParseToml {
            path: path.to_path_buf(),
            source: err,
        })?;

        Ok(parsed)
    }
    /// Loads `path` when given, otherwise returns the built-in settings.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => {
                log::debug!("loading settings from: {}", path.display());
                Settings::from_file(path)
            }
            None => Ok(Settings::default()),
        }
    }
}
