use crate::{config::Settings, utils::normalize_dir_key};
use indexmap::IndexMap;
use std::path::Path;

/// Assigns a role to every file of the source tree.
///
/// Directory rules are keyed by a relative, forward-slash separated directory path. For a file
/// at `a/b/c.txt` the chain `a/b`, then `a` is looked up and the first hit wins, so the deepest
/// configured directory decides. Extension rules are only consulted when no directory rule
/// matches. A file matching neither stays unassigned and receives the writer's default role.
#[derive(Debug, Clone, Default)]
pub struct RoleMap {
    dir_roles: IndexMap<String, String>,
    extension_roles: IndexMap<String, String>,
}
impl RoleMap {
    pub fn new(
        dir_roles: &IndexMap<String, String>,
        extension_roles: &IndexMap<String, String>,
    ) -> Self {
        let mut map = RoleMap::default();

        for (dir, role) in dir_roles {
            map.insert_dir_role(dir, role);
        }

        for (extension, role) in extension_roles {
            map.extension_roles.insert(
                extension.trim_start_matches('.').to_string(),
                role.to_string(),
            );
        }

        map
    }
    /// Builds the map from the configured tables with the `--dirroles` pairs layered on top.
    pub fn from_settings(settings: &Settings, overrides: &IndexMap<String, String>) -> Self {
        let map = RoleMap::new(&settings.dir_roles, &settings.roles).with_overrides(overrides);

        log::debug!("directory roles: {:?}", map.dir_roles);
        log::debug!("extension roles: {:?}", map.extension_roles);

        map
    }
    /// Layers `overrides` on top of the current rules; an override replaces a rule with the
    /// same directory.
    pub fn with_overrides(mut self, overrides: &IndexMap<String, String>) -> Self {
        for (dir, role) in overrides {
            self.insert_dir_role(dir, role);
        }

        self
    }

    fn insert_dir_role(&mut self, dir: &str, role: &str) {
        let key = normalize_dir_key(dir);

        if key.is_empty() {
            log::warn!("ignoring role '{}' for empty directory key '{}'", role, dir);
            return;
        }

        self.dir_roles.insert(key, role.to_string());
    }

    pub fn dir_roles(&self) -> &IndexMap<String, String> {
        &self.dir_roles
    }

    /// Returns the role for a manifest path such as `app/code/local/Foo.php`.
    pub fn resolve(&self, relative_path: &str) -> Option<&str> {
        let segments: Vec<&str> = relative_path
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();

        let (file_name, directories) = segments.split_last()?;

        // longest prefix first
        for depth in (1..=directories.len()).rev() {
            let prefix = directories[..depth].join("/");

            if let Some(role) = self.dir_roles.get(&prefix) {
                return Some(role.as_str());
            }
        }

        Path::new(file_name)
            .extension()
            .and_then(|extension| extension.to_str())
            .and_then(|extension| self.extension_roles.get(extension))
            .map(String::as_str)
    }
}
