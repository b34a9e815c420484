use std::{io, path::PathBuf};

use spiral_core::TraceError;
use thiserror::Error;

use crate::{BuildState, registry::RegistryError};

/// Errors that can occur while generating and building a library.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to trace the reference pipeline")]
    Trace(#[from] TraceError),

    #[error("could not open {} for writing", path.display())]
    Script {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to prepare build directory")]
    WorkDir(#[source] io::Error),

    #[error("failed to run `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("generator error (exit code {code:?})")]
    Generator { code: Option<i32>, stderr: String },

    #[error("build error during {step} (exit code {code:?})")]
    BuildTool {
        step: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    #[error("build tool succeeded but {} was not installed", path.display())]
    MissingLibrary { path: PathBuf },

    #[error("failed to record library metadata")]
    Metadata(#[from] RegistryError),

    #[error("failed to lock {}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("build aborted by observer after reaching {state:?}")]
    Aborted { state: BuildState },
}
