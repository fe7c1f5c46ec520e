//! Version management and semver bumping.

pub mod bump;

pub use bump::{
    BumpType, INITIAL_VERSION_NUM, apply_bump, bump_version_num, parse_version_num,
    strip_to_version_num,
};
