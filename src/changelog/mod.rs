//! Changelog parsing, formatting and writing.

pub mod file;
pub mod format;
pub mod parser;

pub use file::Changelog;
pub use format::ChangelogFormat;
pub use parser::parse_releases;
