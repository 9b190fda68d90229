use crate::utils::normalize_dir_key;
use indexmap::IndexMap;
use miette::Diagnostic;
use std::{fmt, path::PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum OptionsError {
    #[error("No {option} given. Please use option -{flag}")]
    #[diagnostic(
        code(pearcontents::options::missing_option),
        help("Required options are: -T <templatefile>, -S <srcdir>, -D <destinationdir>")
    )]
    MissingOption { option: &'static str, flag: char },

    #[error("Roles configuration is not correct: '{item}'")]
    #[diagnostic(
        code(pearcontents::options::malformed_role_spec),
        help("Please use -R directory:role;directory:role;...")
    )]
    MalformedRoleSpec { item: String },

    #[error("Could not find {kind}: {}", .path.display())]
    #[diagnostic(
        code(pearcontents::options::path_not_found),
        help("Make sure the path exists and has the expected type")
    )]
    PathNotFound { kind: PathKind, path: PathBuf },
}

/// Which of the three required paths a check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Template,
    Source,
    Destination,
}
impl PathKind {
    fn as_str(&self) -> &str {
        match self {
            Self::Template => "template file",
            Self::Source => "code source dir",
            Self::Destination => "destination save dir",
        }
    }
}
impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Options exactly as they arrive from the command line.
#[derive(Debug, Clone, Default)]
pub struct RawOptions {
    pub templatefile: Option<String>,
    pub srcdir: Option<String>,
    pub destinationdir: Option<String>,
    pub dirroles: Option<String>,
}

/// Validated options of a `contents` run.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub template_file: PathBuf,
    pub source_dir: PathBuf,
    pub destination_dir: PathBuf,
    /// Directory -> role pairs parsed from `--dirroles`, in the order given.
    pub role_overrides: IndexMap<String, String>,
}

fn required(
    value: &Option<String>,
    option: &'static str,
    flag: char,
) -> Result<PathBuf, OptionsError> {
    match value.as_deref() {
        Some(value) if !value.trim().is_empty() => Ok(PathBuf::from(value)),
        _ => Err(OptionsError::MissingOption { option, flag }),
    }
}

/// Parses a `dir:role;dir:role` string.
///
/// Every item must split into exactly one non-empty directory and one non-empty role, so a
/// trailing `;` is rejected as an empty pair. Later items win over earlier ones with the same
/// directory.
pub fn parse_dir_roles(spec: &str) -> Result<IndexMap<String, String>, OptionsError> {
    lazy_static::lazy_static! {
        static ref DIR_ROLE_REGEX: regex::Regex = regex::Regex::new(
            r"(?x)
            ^\s*
            (?P<dir>[^:\s](?:[^:]*[^:\s])?)   # directory, no colon
            \s*:\s*
            (?P<role>[^:\s](?:[^:]*[^:\s])?)  # role, no colon
            \s*$"
        ).expect("a valid regex pattern");
    }

    let mut dir_roles = IndexMap::new();

    for item in spec.split(';') {
        let malformed = || OptionsError::MalformedRoleSpec {
            item: item.to_string(),
        };

        let captures = DIR_ROLE_REGEX.captures(item).ok_or_else(malformed)?;

        let dir = normalize_dir_key(&captures["dir"]);
        if dir.is_empty() {
            return Err(malformed());
        }

        dir_roles.insert(dir, captures["role"].to_string());
    }

    Ok(dir_roles)
}

impl Options {
    /// Checks option presence and the role string, without touching the filesystem.
    ///
    /// The first failing check is reported and the remaining checks are skipped. The order is
    /// `templatefile`, `srcdir`, `destinationdir`, `dirroles`.
    pub fn parse(raw: &RawOptions) -> Result<Self, OptionsError> {
        let template_file = required(&raw.templatefile, "templatefile", 'T')?;
        let source_dir = required(&raw.srcdir, "sourcedir", 'S')?;
        let destination_dir = required(&raw.destinationdir, "destinationdir", 'D')?;

        let role_overrides = match raw.dirroles.as_deref() {
            Some(spec) => parse_dir_roles(spec)?,
            None => IndexMap::new(),
        };

        Ok(Options {
            template_file,
            source_dir,
            destination_dir,
            role_overrides,
        })
    }
    /// Checks that the template is a file and that both directories exist, in that order.
    pub fn verify_paths(&self) -> Result<(), OptionsError> {
        let checks = [
            (PathKind::Template, &self.template_file, self.template_file.is_file()),
            (PathKind::Source, &self.source_dir, self.source_dir.is_dir()),
            (
                PathKind::Destination,
                &self.destination_dir,
                self.destination_dir.is_dir(),
            ),
        ];

        for (kind, path, found) in checks {
            if !found {
                return Err(OptionsError::PathNotFound {
                    kind,
                    path: path.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Runs [`Options::parse`] followed by [`Options::verify_paths`].
pub fn validate(raw: &RawOptions) -> Result<Options, OptionsError> {
    let options = Options::parse(raw)?;

    options.verify_paths()?;

    log::debug!("validated options: {:?}", options);

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn raw(template: &str, src: &str, dest: &str) -> RawOptions {
        RawOptions {
            templatefile: Some(template.to_string()),
            srcdir: Some(src.to_string()),
            destinationdir: Some(dest.to_string()),
            dirroles: None,
        }
    }

    #[test]
    fn test_parse_populates_all_fields() {
        let mut options = raw("package2.xml", "src", "build");
        options.dirroles = Some("lib:php;docs:doc".to_string());

        let parsed = Options::parse(&options).unwrap();

        assert_eq!(parsed.template_file, PathBuf::from("package2.xml"));
        assert_eq!(parsed.source_dir, PathBuf::from("src"));
        assert_eq!(parsed.destination_dir, PathBuf::from("build"));
        assert_eq!(
            parsed.role_overrides.iter().collect::<Vec<_>>(),
            vec![
                (&"lib".to_string(), &"php".to_string()),
                (&"docs".to_string(), &"doc".to_string())
            ]
        );
    }

    #[test]
    fn test_first_missing_option_wins() {
        let result = Options::parse(&RawOptions::default());

        assert!(matches!(
            result,
            Err(OptionsError::MissingOption {
                option: "templatefile",
                flag: 'T'
            })
        ));
    }

    #[test]
    fn test_empty_option_counts_as_missing() {
        let result = Options::parse(&raw("package2.xml", "  ", "build"));

        assert!(matches!(
            result,
            Err(OptionsError::MissingOption { flag: 'S', .. })
        ));
    }

    #[test]
    fn test_surrounding_spaces_are_kept_in_paths() {
        let options = Options::parse(&raw(" package2.xml", "src ", "build")).unwrap();

        assert_eq!(options.template_file, PathBuf::from(" package2.xml"));
        assert_eq!(options.source_dir, PathBuf::from("src "));
    }

    #[test]
    fn test_missing_destination() {
        let mut options = raw("package2.xml", "src", "build");
        options.destinationdir = None;

        let error = Options::parse(&options).unwrap_err();

        assert_eq!(
            error.to_string(),
            "No destinationdir given. Please use option -D"
        );
    }

    #[test]
    fn test_malformed_role_specs_are_rejected() {
        for spec in [
            "src",
            "src:",
            ":code",
            "src:code;",
            "src:code;;lib:php",
            "a:b:c",
            " : ",
            "/:www",
        ] {
            let result = parse_dir_roles(spec);

            assert!(
                matches!(result, Err(OptionsError::MalformedRoleSpec { .. })),
                "expected '{}' to be rejected",
                spec
            );
        }
    }

    #[test]
    fn test_malformed_role_spec_fails_whole_parse() {
        let mut options = raw("package2.xml", "src", "build");
        options.dirroles = Some("src:code;broken".to_string());

        let result = Options::parse(&options);

        match result {
            Err(OptionsError::MalformedRoleSpec { item }) => assert_eq!(item, "broken"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_role_spec_keys_are_normalized() {
        let parsed = parse_dir_roles(" ./src/ : code ;app/design:www").unwrap();

        assert_eq!(parsed.get("src").unwrap(), "code");
        assert_eq!(parsed.get("app/design").unwrap(), "www");
    }

    #[test]
    fn test_later_role_item_wins() {
        let parsed = parse_dir_roles("src:code;src:php").unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("src").unwrap(), "php");
    }

    #[test]
    fn test_validate_accepts_existing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("package2.xml");
        let src = dir.path().join("src");
        let dest = dir.path().join("build");
        fs::write(&template, "<package/>").unwrap();
        fs::create_dir(&src).unwrap();
        fs::create_dir(&dest).unwrap();

        let options = validate(&raw(
            template.to_str().unwrap(),
            src.to_str().unwrap(),
            dest.to_str().unwrap(),
        ))
        .unwrap();

        assert_eq!(options.template_file, template);
        assert_eq!(options.source_dir, src);
        assert_eq!(options.destination_dir, dest);
        assert!(options.role_overrides.is_empty());
    }

    #[test]
    fn test_validate_names_missing_source_dir() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("package2.xml");
        fs::write(&template, "<package/>").unwrap();
        let missing = dir.path().join("missing");

        let error = validate(&raw(
            template.to_str().unwrap(),
            missing.to_str().unwrap(),
            dir.path().to_str().unwrap(),
        ))
        .unwrap_err();

        match &error {
            OptionsError::PathNotFound { kind, path } => {
                assert_eq!(*kind, PathKind::Source);
                assert_eq!(path, &missing);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(error.to_string().contains("code source dir"));
    }

    #[test]
    fn test_validate_rejects_file_as_destination() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("package2.xml");
        fs::write(&template, "<package/>").unwrap();

        let error = validate(&raw(
            template.to_str().unwrap(),
            dir.path().to_str().unwrap(),
            template.to_str().unwrap(),
        ))
        .unwrap_err();

        assert!(matches!(
            error,
            OptionsError::PathNotFound {
                kind: PathKind::Destination,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_directory_as_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();

        let error = validate(&raw(path, path, path)).unwrap_err();

        assert!(matches!(
            error,
            OptionsError::PathNotFound {
                kind: PathKind::Template,
                ..
            }
        ));
    }
}
