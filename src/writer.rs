use crate::{
    config::Settings,
    errors::{FileOperation, IoError},
    source::ContentEntry,
    template::ManifestDocument,
};
use miette::Diagnostic;
use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use std::{io::Write, ops::Range, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum WriterError {
    #[error("I/O error within writer domain")]
    #[diagnostic(code(pearcontents::writer::io))]
    Io(#[from] IoError),

    #[error("Unable to serialize package file: {message}")]
    #[diagnostic(code(pearcontents::writer::serialize))]
    Serialize { message: String },

    #[error("Template '{}' has no root element to add contents to", .path.display())]
    #[diagnostic(code(pearcontents::writer::no_root))]
    NoRootElement { path: PathBuf },

    #[error("Contents node has not been generated")]
    #[diagnostic(
        code(pearcontents::writer::contents_not_generated),
        help("Call generate_contents before write_package_file")
    )]
    ContentsNotGenerated,
}

const CONTENTS: &[u8] = b"contents";
const DEPENDENCIES: &[u8] = b"dependencies";
const INDENT: &str = " ";

/// Configuration handed to the writer together with the document and the entries.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Value of the `baseinstalldir` attribute.
    pub base_install_dir: String,
    /// Directory the package file is written into.
    pub output_directory: PathBuf,
    /// File name of the written package file.
    pub package_file: String,
    /// Role for entries without one.
    pub default_role: String,
}
impl WriterOptions {
    pub fn from_settings(settings: &Settings, output_directory: PathBuf) -> Self {
        Self {
            base_install_dir: settings.base_install_dir.clone(),
            output_directory,
            package_file: settings.package_file.clone(),
            default_role: settings.default_role.clone(),
        }
    }
}

/// Produces a package file from a template document and a list of content entries.
///
/// The writer never sees the ignore list or the role tables. The source walk has already
/// dropped ignored files and the role resolver has already assigned each entry its role, so
/// the writer only fills in the default role for entries left unassigned.
pub trait ManifestWriter {
    /// Replaces (or adds) the contents node of the document with one built from the entries.
    fn generate_contents(&mut self) -> Result<(), WriterError>;
    /// Serializes the document into the output directory and returns the written path.
    fn write_package_file(&self) -> Result<PathBuf, WriterError>;
}

/// Where the generated contents node goes.
#[derive(Debug, PartialEq)]
enum Slot {
    Replace(Range<usize>),
    /// Before the root's `<dependencies>` child.
    Insert(usize),
    /// Before the whitespace that precedes the root's closing tag.
    InsertBeforeWhitespace(usize),
    /// Directly before the root's closing tag.
    Append(usize),
}

/// [`ManifestWriter`] working on the event stream of a PEAR package.xml.
#[derive(Debug)]
pub struct PackageFileManager {
    document: ManifestDocument,
    options: WriterOptions,
    entries: Vec<ContentEntry>,
    generated: bool,
}
impl PackageFileManager {
    pub fn new(
        document: ManifestDocument,
        options: WriterOptions,
        entries: Vec<ContentEntry>,
    ) -> Self {
        Self {
            document,
            options,
            entries,
            generated: false,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.options
            .output_directory
            .join(&self.options.package_file)
    }
    /// Serializes the current document.
    pub fn render(&self) -> Result<Vec<u8>, WriterError> {
        let mut writer = Writer::new(Vec::new());

        for event in &self.document.events {
            writer
                .write_event(event.borrow())
                .map_err(|error| WriterError::Serialize {
                    message: error.to_string(),
                })?;
        }

        Ok(writer.into_inner())
    }

    fn contents_events(&self) -> Vec<Event<'static>> {
        let base_install_dir = self.options.base_install_dir.as_str();

        let mut events = vec![
            Event::Start(BytesStart::new("contents")),
            newline(2),
            Event::Start(
                BytesStart::new("dir")
                    .with_attributes([("baseinstalldir", base_install_dir), ("name", "/")])
                    .into_owned(),
            ),
        ];

        for entry in &self.entries {
            let role = entry
                .role
                .as_deref()
                .unwrap_or(self.options.default_role.as_str());

            events.push(newline(3));
            events.push(Event::Empty(
                BytesStart::new("file")
                    .with_attributes([
                        ("baseinstalldir", base_install_dir),
                        ("name", entry.path.as_str()),
                        ("role", role),
                    ])
                    .into_owned(),
            ));
        }

        events.push(newline(2));
        events.push(Event::End(BytesEnd::new("dir")));
        events.push(newline(1));
        events.push(Event::End(BytesEnd::new("contents")));

        events
    }
}

/// Turns a self-closing root (`<package/>`) into an open and a close tag so children can be
/// added.
fn expand_empty_root(events: &mut Vec<Event<'static>>) {
    let mut depth = 0usize;
    let mut root = None;

    for (index, event) in events.iter().enumerate() {
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Empty(start) if depth == 0 => {
                root = Some((index, start.clone()));
                break;
            }
            _ => {}
        }
    }

    if let Some((index, start)) = root {
        let end = start.to_end().into_owned();

        events[index] = Event::Start(start);
        events.insert(index + 1, Event::End(end));
    }
}

/// Line break followed by the indentation of an element at `depth`.
fn newline(depth: usize) -> Event<'static> {
    Event::Text(BytesText::new(&format!("\n{}", INDENT.repeat(depth))).into_owned())
}

fn is_whitespace(event: &Event) -> bool {
    matches!(event, Event::Text(text) if text.iter().all(u8::is_ascii_whitespace))
}

/// Finds the root's `<contents>` child, else the root's `<dependencies>` child, else the root's
/// closing tag.
fn find_slot(events: &[Event<'static>]) -> Option<Slot> {
    let mut depth = 0usize;
    let mut contents_start = None;
    let mut dependencies = None;

    for (index, event) in events.iter().enumerate() {
        match event {
            Event::Start(start) => {
                if depth == 1 {
                    let name = start.local_name();
                    if name.as_ref() == CONTENTS {
                        contents_start = Some(index);
                    } else if name.as_ref() == DEPENDENCIES && dependencies.is_none() {
                        dependencies = Some(index);
                    }
                }
                depth += 1;
            }
            Event::Empty(start) if depth == 1 => {
                let name = start.local_name();
                if name.as_ref() == CONTENTS {
                    return Some(Slot::Replace(index..index + 1));
                } else if name.as_ref() == DEPENDENCIES && dependencies.is_none() {
                    dependencies = Some(index);
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);

                if depth == 1 {
                    if let Some(start) = contents_start {
                        return Some(Slot::Replace(start..index + 1));
                    }
                }

                if depth == 0 {
                    if let Some(index) = dependencies {
                        return Some(Slot::Insert(index));
                    }

                    if index > 0 && is_whitespace(&events[index - 1]) {
                        return Some(Slot::InsertBeforeWhitespace(index - 1));
                    }

                    return Some(Slot::Append(index));
                }
            }
            _ => {}
        }
    }

    None
}

impl ManifestWriter for PackageFileManager {
    fn generate_contents(&mut self) -> Result<(), WriterError> {
        let mut contents = self.contents_events();
        let events = &mut self.document.events;

        expand_empty_root(events);

        let slot = find_slot(events).ok_or_else(|| WriterError::NoRootElement {
            path: self.document.source.clone(),
        })?;

        log::debug!("inserting {} entries at {:?}", self.entries.len(), slot);

        match slot {
            Slot::Replace(range) => {
                events.splice(range, contents);
            }
            Slot::Insert(index) => {
                contents.push(newline(1));
                events.splice(index..index, contents);
            }
            Slot::InsertBeforeWhitespace(index) => {
                contents.insert(0, newline(1));
                events.splice(index..index, contents);
            }
            Slot::Append(index) => {
                contents.push(newline(0));
                events.splice(index..index, contents);
            }
        }

        self.generated = true;

        Ok(())
    }

    fn write_package_file(&self) -> Result<PathBuf, WriterError> {
        if !self.generated {
            return Err(WriterError::ContentsNotGenerated);
        }

        let bytes = self.render()?;
        let directory = &self.options.output_directory;
        let target = self.output_path();

        // stage next to the target so the final rename stays on one filesystem
        let mut file = tempfile::NamedTempFile::new_in(directory)
            .map_err(|error| IoError::new(FileOperation::CreateTemp, directory.clone(), error))?;

        file.write_all(&bytes)
            .and_then(|_| file.as_file().sync_all())
            .map_err(|error| {
                IoError::new(FileOperation::Write, file.path().to_path_buf(), error)
            })?;

        file.persist(&target)
            .map_err(|error| IoError::new(FileOperation::Persist, target.clone(), error.error))?;

        log::debug!("persisted package file: {}", target.display());

        Ok(target)
    }
}
