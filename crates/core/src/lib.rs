//! Core traits and types for spiral solvers.
//!
//! This crate defines the shared abstractions the build and runtime crates
//! build on:
//!
//! - [`Problem`] — the shape and direction of a transform
//! - [`Options`] — the configuration surface (precision, platform, toggles)
//! - [`Transform`] — a reference pipeline that can be replayed through any
//!   [`Operators`] strategy
//! - [`trace`] — records a reference pipeline as a generator-ready
//!   [`Composition`]
//! - [`metadata`] — records describing the functions exported by a built library
//! - [`Observer`] — receives orchestration events and optionally returns
//!   control actions

pub mod metadata;
mod observer;
mod options;
mod problem;
pub mod trace;
mod transform;
pub mod transforms;

pub use observer::Observer;
pub use options::{
    ENV_KEEP_TEMP, ENV_LIBS_DIR, ENV_PRINT_RULE_TREE, ENV_SPIRAL_HOME, ENV_WORK_DIR, Options,
    OptionsError, Platform, Precision, Toolchain,
};
pub use problem::{Direction, Problem, ProblemError};
pub use trace::{Composition, Operators, Recorder, Shaped, Symbolic, Trace, TraceError};
pub use transform::{Operands, Transform, TransformKind};
