use std::{io, path::PathBuf};

use spiral_build::{BuildError, RegistryError};
use spiral_core::{OptionsError, ProblemError};
use thiserror::Error;

use crate::{InvokeError, LoadError};

/// Errors that can occur while constructing or running a [`Solver`].
///
/// [`Solver`]: crate::Solver
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Problem(#[from] ProblemError),

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error("cannot create library directory {}", path.display())]
    LibsDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Invoke(#[from] InvokeError),
}
