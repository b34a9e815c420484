use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Direction of a transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Inverse,
}

impl Direction {
    /// Returns the exponent sign the generator expects for this direction.
    #[must_use]
    pub fn sign(self) -> i32 {
        match self {
            Direction::Forward => -1,
            Direction::Inverse => 1,
        }
    }

    /// Returns the name used in metadata records.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Inverse => "inverse",
        }
    }
}

/// Errors that can occur when constructing a [`Problem`] or shaping its
/// operands.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProblemError {
    #[error("problem must have at least one dimension")]
    NoDimensions,

    #[error("dimension {axis} has zero extent")]
    ZeroExtent { axis: usize },

    #[error("{which} box extent {extent} must be between 1 and {n}")]
    BoxExtent {
        which: &'static str,
        extent: usize,
        n: usize,
    },

    #[error("full symbol holds {found} values, expected {expected}")]
    SymbolLength { expected: usize, found: usize },
}

/// The shape and direction of a transform.
///
/// A problem is immutable once constructed and is owned by the solver built
/// for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Problem {
    dims: Vec<usize>,
    direction: Direction,
}

impl Problem {
    /// Creates a problem from its dimensions and direction.
    ///
    /// # Errors
    ///
    /// Returns an error if `dims` is empty or any extent is zero.
    pub fn new(dims: impl Into<Vec<usize>>, direction: Direction) -> Result<Self, ProblemError> {
        let dims = dims.into();
        if dims.is_empty() {
            return Err(ProblemError::NoDimensions);
        }
        if let Some(axis) = dims.iter().position(|&n| n == 0) {
            return Err(ProblemError::ZeroExtent { axis });
        }
        Ok(Self { dims, direction })
    }

    /// Creates a forward problem.
    ///
    /// # Errors
    ///
    /// Returns an error if `dims` is empty or any extent is zero.
    pub fn forward(dims: impl Into<Vec<usize>>) -> Result<Self, ProblemError> {
        Self::new(dims, Direction::Forward)
    }

    #[must_use]
    pub fn dimensions(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the extent of the first dimension.
    #[must_use]
    pub fn dim_n(&self) -> usize {
        self.dims[0]
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the number of points in the problem box.
    #[must_use]
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }
}
