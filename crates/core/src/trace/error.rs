use thiserror::Error;

/// Errors raised while replaying a reference pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("array shape is empty")]
    EmptyShape,

    #[error("array shape {shape:?} has a zero extent")]
    ZeroExtent { shape: Vec<usize> },

    #[error("zero embedding needs at least one padding pair")]
    EmptyPadding,

    #[error("{axes} padding pairs given for an array of rank {rank}")]
    PaddingRank { axes: usize, rank: usize },

    #[error("`{op}` expects a real array")]
    ExpectedReal { op: &'static str },

    #[error("`{op}` expects a complex array")]
    ExpectedComplex { op: &'static str },

    #[error("`{op}` shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        op: &'static str,
        left: Vec<usize>,
        right: Vec<usize>,
    },

    #[error("`{op}` expects a cube of extent {n}, got {shape:?}")]
    NotCube {
        op: &'static str,
        n: usize,
        shape: Vec<usize>,
    },

    #[error("cannot extract a box of extent {nd} from extent {n}")]
    ExtractBounds { n: usize, nd: usize },
}
