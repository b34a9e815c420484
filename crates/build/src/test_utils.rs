//! Shared fixtures for unit tests that touch the filesystem.

use std::{env, path::PathBuf};

use crate::BuildDir;

/// Creates an empty directory unique to this process and call.
///
/// The directory outlives the test so failures can be inspected.
pub(crate) fn scratch_dir(name: &str) -> PathBuf {
    BuildDir::create(Some(&env::temp_dir()), name, true)
        .expect("scratch directory should be creatable")
        .path()
        .to_path_buf()
}
