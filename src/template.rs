use crate::errors::{FileOperation, IoError};
use miette::Diagnostic;
use quick_xml::{events::Event, Reader};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    #[error("I/O error within template domain")]
    #[diagnostic(code(pearcontents::template::io))]
    Io(#[from] IoError),

    #[error("Unable to parse template '{}' at byte {position}: {source}", .path.display())]
    #[diagnostic(
        code(pearcontents::template::parse),
        help("The template must be a well-formed package.xml")
    )]
    Parse {
        path: PathBuf,
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Template '{}' is not well-formed: {reason}", .path.display())]
    #[diagnostic(
        code(pearcontents::template::malformed),
        help("The template must be a well-formed package.xml")
    )]
    Malformed { path: PathBuf, reason: String },
}

/// A parsed template, held as the owned event stream of the document.
///
/// Only the parser creates documents and only the writer looks inside them.
#[derive(Debug, Clone)]
pub struct ManifestDocument {
    pub(crate) events: Vec<Event<'static>>,
    pub(crate) source: PathBuf,
}
impl ManifestDocument {
    /// Path the template was read from.
    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Turns raw template bytes into a [`ManifestDocument`].
pub trait TemplateParser {
    fn parse(&self, raw: &[u8], source_path: &Path) -> Result<ManifestDocument, TemplateError>;
}

/// [`TemplateParser`] on top of `quick-xml`, checking well-formedness only.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlTemplateParser;
impl TemplateParser for XmlTemplateParser {
    fn parse(&self, raw: &[u8], source_path: &Path) -> Result<ManifestDocument, TemplateError> {
        let malformed = |reason: &str| TemplateError::Malformed {
            path: source_path.to_path_buf(),
            reason: reason.to_string(),
        };

        let mut reader = Reader::from_reader(raw);
        let mut buf = Vec::new();
        let mut events = Vec::new();
        let mut depth = 0usize;
        let mut roots = 0usize;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|error| parse_error(source_path, reader.buffer_position(), error))?;

            // quick-xml reads attributes and entity references lazily
            match &event {
                Event::Start(start) | Event::Empty(start) => {
                    for attribute in start.attributes() {
                        attribute
                            .map_err(quick_xml::Error::from)
                            .and_then(|attribute| attribute.unescape_value().map(drop))
                            .map_err(|error| {
                                parse_error(source_path, reader.buffer_position(), error)
                            })?;
                    }
                }
                Event::Text(text) => {
                    text.unescape().map_err(|error| {
                        parse_error(source_path, reader.buffer_position(), error)
                    })?;
                }
                _ => {}
            }

            match &event {
                Event::Eof => break,
                Event::Start(_) | Event::Empty(_) if depth == 0 => {
                    roots += 1;
                    if roots > 1 {
                        return Err(malformed("more than one root element"));
                    }
                }
                Event::Text(text) if depth == 0 => {
                    // only whitespace may surround the root element
                    if !text.iter().all(u8::is_ascii_whitespace) {
                        return Err(malformed("text outside of the root element"));
                    }
                }
                _ => {}
            }

            match &event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth = depth.saturating_sub(1),
                _ => {}
            }

            events.push(event.into_owned());
            buf.clear();
        }

        if depth != 0 {
            return Err(malformed("unclosed element at end of document"));
        }

        if roots == 0 {
            return Err(malformed("no root element"));
        }

        log::debug!(
            "parsed template {} into {} events",
            source_path.display(),
            events.len()
        );

        Ok(ManifestDocument {
            events,
            source: source_path.to_path_buf(),
        })
    }
}

fn parse_error(path: &Path, position: u64, source: quick_xml::Error) -> TemplateError {
    TemplateError::Parse {
        path: path.to_path_buf(),
        position,
        source,
    }
}

/// Reads the template at `path` and hands it to `parser`.
pub fn load_template(
    parser: &dyn TemplateParser,
    path: &Path,
) -> Result<ManifestDocument, TemplateError> {
    let raw = fs::read(path)
        .map_err(|error| IoError::new(FileOperation::Read, path.to_path_buf(), error))?;

    parser.parse(&raw, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package version="2.0" xmlns="http://pear.php.net/dtd/package-2.0">
 <name>Demo</name>
 <contents>
  <dir name="/"/>
 </contents>
</package>
"#;

    fn parse(raw: &str) -> Result<ManifestDocument, TemplateError> {
        XmlTemplateParser.parse(raw.as_bytes(), Path::new("package2.xml"))
    }

    #[test]
    fn test_parses_well_formed_template() {
        let document = parse(TEMPLATE).unwrap();

        assert_eq!(document.source(), Path::new("package2.xml"));
        assert!(matches!(document.events[0], Event::Decl(_)));
    }

    #[test]
    fn test_rejects_mismatched_end_tag() {
        let result = parse("<package><name>Demo</nam></package>");

        assert!(matches!(result, Err(TemplateError::Parse { .. })));
    }

    #[test]
    fn test_rejects_unclosed_element() {
        let result = parse("<package><name>Demo</name>");

        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_empty_document() {
        let result = parse("<?xml version=\"1.0\"?>\n");

        match result {
            Err(TemplateError::Malformed { reason, .. }) => assert_eq!(reason, "no root element"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_second_root() {
        let result = parse("<package/><package/>");

        assert!(matches!(result, Err(TemplateError::Malformed { .. })));
    }

    #[test]
    fn test_rejects_plain_text() {
        let result = parse("this is not xml");

        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unquoted_attribute() {
        let result = parse("<package version=2.0><contents/></package>");

        assert!(matches!(result, Err(TemplateError::Parse { .. })));
    }

    #[test]
    fn test_rejects_duplicate_attribute() {
        let result = parse(r#"<package a="1" a="2"><contents/></package>"#);

        assert!(matches!(result, Err(TemplateError::Parse { .. })));
    }

    #[test]
    fn test_rejects_undefined_entity() {
        let result = parse("<package><name>a &bogus; b</name><contents/></package>");

        match result {
            Err(TemplateError::Parse { path, .. }) => {
                assert_eq!(path, Path::new("package2.xml"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_undefined_entity_in_attribute() {
        let result = parse(r#"<package><dir name="&bogus;"/></package>"#);

        assert!(matches!(result, Err(TemplateError::Parse { .. })));
    }

    #[test]
    fn test_accepts_predefined_and_character_references() {
        let result = parse(
            r#"<package><summary>a &amp; b &lt;c&gt; &#38; &#x26;</summary><dir name="a&amp;b"/></package>"#,
        );

        assert!(result.is_ok());
    }

    #[test]
    fn test_load_template_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        let result = load_template(&XmlTemplateParser, &dir.path().join("package2.xml"));

        assert!(matches!(result, Err(TemplateError::Io(_))));
    }
}
