use crate::{
    errors::{FileOperation, IoError},
    roles::RoleMap,
    utils::manifest_path,
};
use miette::Diagnostic;
use std::{cmp::Ordering, path::Path, path::PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug, Diagnostic)]
pub enum SourceError {
    #[error("Could not walk source tree at '{}'", .0.path.display())]
    #[diagnostic(
        code(pearcontents::source::traversal),
        help("Check that the source tree is readable and is not modified while generating")
    )]
    Traversal(#[from] IoError),

    #[error("unable to strip prefix from directory")]
    #[diagnostic(code(pearcontents::source::strip_prefix))]
    StripPrefix {
        path: PathBuf,
        dir: PathBuf,
        source: std::path::StripPrefixError,
    },

    #[error("Path is not valid UTF-8: {}", .path.display())]
    #[diagnostic(
        code(pearcontents::source::non_utf8_path),
        help("Manifest paths must be valid UTF-8, rename the file")
    )]
    NonUtf8Path { path: PathBuf },
}

/// Root-level file names that never end up in the manifest.
pub const ALWAYS_IGNORED: [&str; 2] = ["package.xml", "package2.xml"];

/// One file of the source tree destined for the manifest's contents node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    /// Path relative to the source directory, forward-slash separated.
    pub path: String,
    /// Resolved role, `None` when the writer's default applies.
    pub role: Option<String>,
}

/// Directories before files, then by name.
fn directories_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    match (a.file_type().is_dir(), b.file_type().is_dir()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.file_name().cmp(b.file_name()),
    }
}

fn is_ignored(entry: &DirEntry, ignore: &[String]) -> bool {
    if entry.depth() != 1 {
        return false;
    }

    let file_name = entry.file_name();

    ALWAYS_IGNORED.iter().any(|name| file_name == *name)
        || ignore.iter().any(|name| file_name == name.as_str())
}

/// Walks `source_directory` depth-first and returns one [`ContentEntry`] per regular file.
///
/// At every level subdirectories are visited before files and both are taken in byte order of
/// their names, so an unchanged tree always yields the same sequence. Symbolic links are
/// neither followed nor listed. `package.xml`, `package2.xml` and the names in `ignore` are
/// skipped at the root only.
///
/// # Errors
///
/// Any error while reading the tree aborts the walk with a [`SourceError`] naming the path.
pub fn build_entries(
    source_directory: &Path,
    roles: &RoleMap,
    ignore: &[String],
) -> Result<Vec<ContentEntry>, SourceError> {
    let mut entries = Vec::new();

    let walker = WalkDir::new(source_directory)
        .min_depth(1)
        .follow_links(false)
        .sort_by(directories_first);

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(error) => {
                let path = error
                    .path()
                    .unwrap_or(source_directory)
                    .to_path_buf();

                Err(IoError::new(FileOperation::Walk, path, error.into()))?
            }
        };

        let file_type = entry.file_type();

        if file_type.is_symlink() {
            log::debug!("skipping symlink: {}", entry.path().display());
            continue;
        }

        if !file_type.is_file() {
            if !file_type.is_dir() {
                log::debug!("skipping special file: {}", entry.path().display());
            }
            continue;
        }

        if is_ignored(&entry, ignore) {
            log::debug!("ignoring: {}", entry.path().display());
            continue;
        }

        let full_path = entry.path();
        let relative = match full_path.strip_prefix(source_directory) {
            Ok(r) => r,
            Err(error) => Err(SourceError::StripPrefix {
                path: full_path.to_path_buf(),
                dir: source_directory.to_path_buf(),
                source: error,
            })?,
        };

        let path = manifest_path(relative).ok_or_else(|| SourceError::NonUtf8Path {
            path: full_path.to_path_buf(),
        })?;

        let role = roles.resolve(&path).map(str::to_string);

        log::debug!("{} -> {}", path, role.as_deref().unwrap_or("<default>"));

        entries.push(ContentEntry { path, role });
    }

    Ok(entries)
}
