use std::path::{Component, Path};

/// Normalizes a manifest directory key such as `./app/code/` into `app/code`.
///
/// Keys are always forward-slash separated and relative: `.` segments and empty segments are
/// dropped and `..` pops the previous segment.
pub fn normalize_dir_key(key: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in key.split(['/', '\\']) {
        match segment.trim() {
            // skip the current-dir marker and doubled separators
            "" | "." => {}

            // for "..", pop the last segment if possible
            ".." => {
                segments.pop();
            }

            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Renders a path relative to the source directory as a manifest path (`lib/x.txt`).
///
/// Returns `None` if any component is not valid UTF-8 or is not a plain name.
pub fn manifest_path(relative: &Path) -> Option<String> {
    let mut segments = Vec::new();

    for component in relative.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(name) => segments.push(name.to_str()?),
            _ => return None,
        }
    }

    Some(segments.join("/"))
}
