//! Generates the `<contents>` node of a PEAR `package.xml` from a source tree.
//!
//! A run validates the command line options, loads the template package file, walks the
//! source directory assigning a role to every file and writes the updated package file into
//! the destination directory.

pub mod api;
pub mod config;
pub mod errors;
pub mod options;
pub mod preview;
pub mod roles;
pub mod source;
pub mod template;
pub mod utils;
pub mod writer;

pub use api::{
    collect_entries, generate_contents, preview_contents, ContentsPlan, PearContentsError,
    SUCCESS_MESSAGE,
};
pub use options::RawOptions;
