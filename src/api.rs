use crate::{
    config::{self, Settings},
    options::{self, Options, RawOptions},
    preview::preview_as_tree,
    roles::RoleMap,
    source::{self, ContentEntry},
    template::{self, XmlTemplateParser},
    writer::{self, ManifestWriter, PackageFileManager, WriterOptions},
};
use colored::Colorize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum PearContentsError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Options(#[from] options::OptionsError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Settings(#[from] config::SettingsError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] template::TemplateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] source::SourceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Writer(#[from] writer::WriterError),
}

/// Message printed once the package file is written.
pub const SUCCESS_MESSAGE: &str = "Successfully generated package file";

/// Everything a run has resolved before the template is touched.
#[derive(Debug)]
pub struct ContentsPlan {
    pub options: Options,
    pub settings: Settings,
    pub entries: Vec<ContentEntry>,
}

/// Validates `raw`, walks the source directory and returns the entries with their roles.
///
/// Nothing is written; used for previews.
///
/// # Errors
///
/// Returns a [`PearContentsError`] if:
///
/// - A required option is missing, `dirroles` is malformed or a path does not exist.
/// - The settings file cannot be read or parsed.
/// - The source tree cannot be walked.
pub fn collect_entries(
    raw: &RawOptions,
    settings_path: Option<&Path>,
) -> Result<ContentsPlan, PearContentsError> {
    let options = options::validate(raw)?;

    let settings = Settings::load(settings_path)?;

    let roles = RoleMap::from_settings(&settings, &options.role_overrides);

    let entries = source::build_entries(&options.source_dir, &roles, &settings.ignore)?;

    Ok(ContentsPlan {
        options,
        settings,
        entries,
    })
}

/// Generates the contents node of the template and writes the resulting package file into the
/// destination directory. Returns the path of the written file.
///
/// The template is loaded and the whole entry list is built before anything is written, so a
/// failure at any step leaves the destination directory untouched.
///
/// # Errors
///
/// Returns a [`PearContentsError`] if:
///
/// - A required option is missing, `dirroles` is malformed or a path does not exist.
/// - The settings file cannot be read or parsed.
/// - The template cannot be read or is not well-formed XML.
/// - The source tree cannot be walked.
/// - The package file cannot be serialized or written.
pub fn generate_contents(
    raw: &RawOptions,
    settings_path: Option<&Path>,
) -> Result<PathBuf, PearContentsError> {
    let options = options::validate(raw)?;

    let settings = Settings::load(settings_path)?;

    let document = template::load_template(&XmlTemplateParser, &options.template_file)?;

    let roles = RoleMap::from_settings(&settings, &options.role_overrides);

    let entries = source::build_entries(&options.source_dir, &roles, &settings.ignore)?;

    log::debug!(
        "collected {} entries from: {}",
        entries.len(),
        options.source_dir.display()
    );

    let writer_options = WriterOptions::from_settings(&settings, options.destination_dir.clone());

    let mut manager = PackageFileManager::new(document, writer_options, entries);

    manager.generate_contents()?;

    let written = manager.write_package_file()?;

    println!("{} {}", "create".green(), written.display());

    Ok(written)
}

/// Prints the entries that [`generate_contents`] would write, as a tree.
///
/// # Errors
///
/// See [`collect_entries`].
pub fn preview_contents(
    raw: &RawOptions,
    settings_path: Option<&Path>,
) -> Result<(), PearContentsError> {
    let plan = collect_entries(raw, settings_path)?;

    preview_as_tree(
        &plan.entries,
        &plan.options.source_dir,
        &plan.settings.default_role,
    );

    Ok(())
}
