//! Operator tracing — recording a reference pipeline as a composition.
//!
//! A [`Transform`](crate::Transform) describes its computation once, as a
//! reference pipeline written against the [`Operators`] strategy. Replaying
//! that pipeline through a [`Recorder`] captures one rendered entry per
//! operator call, in data-flow order. [`Trace::finalize`] then turns the
//! entries into the [`Composition`] the generator expects: the last executed
//! operator first, every entry but the last followed by a separator.
//!
//! # Executors
//!
//! - [`Symbolic`] — tracks shapes only; the default dry-run executor
//! - [`Recorder`] — wraps any executor and records what it is asked to do
//!
//! # Example
//!
//! ```
//! use spiral_core::trace::{self, Operators};
//!
//! let composition = trace::trace_with(|ops| {
//!     let src = ops.real_input(&[2, 2, 2])?;
//!     let padded = ops.zero_embed_box(&src, &[(0, 2)])?;
//!     ops.rfftn(&padded)
//! })
//! .unwrap();
//!
//! assert_eq!(
//!     composition.entries(),
//!     &["MDPRDFT([4,4,4], -1),", "ZeroEmbedBox([4,4,4], [[0..1],[0..1],[0..1]])"],
//! );
//! ```

mod error;
mod operators;
mod recorder;
mod render;
mod symbolic;

pub use error::TraceError;
pub use operators::{Operators, Shaped};
pub use recorder::Recorder;
pub use symbolic::{Symbolic, SymbolicArray};

use crate::Transform;

/// Separator appended to every composition entry except the last.
pub const SEPARATOR: &str = ",";

/// Rendered operator entries in the order they were called.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    entries: Vec<String>,
}

impl Trace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry for the most recently executed operator.
    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    /// Returns the entries in call order.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Produces the generator-ready composition.
    ///
    /// The outermost (last executed) operator comes first, so the entries are
    /// reversed once here rather than inserted at the head while recording.
    #[must_use]
    pub fn finalize(self) -> Composition {
        let mut entries = self.entries;
        entries.reverse();
        let last = entries.len().saturating_sub(1);
        for entry in &mut entries[..last] {
            entry.push_str(SEPARATOR);
        }
        log::debug!("finalized trace with {} entries", entries.len());
        Composition { entries }
    }
}

/// A finalized, generator-ready sequence of operator entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composition {
    entries: Vec<String>,
}

impl Composition {
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

/// Traces an arbitrary reference pipeline with the [`Symbolic`] executor.
///
/// # Errors
///
/// Returns an error if the pipeline fails, for example on inconsistent shapes.
pub fn trace_with<F, R>(reference: F) -> Result<Composition, TraceError>
where
    F: FnOnce(&mut Recorder<Symbolic>) -> Result<R, TraceError>,
{
    let mut recorder = Recorder::new(Symbolic);
    reference(&mut recorder)?;
    Ok(recorder.into_trace().finalize())
}

/// Traces the reference pipeline of a transform.
///
/// # Errors
///
/// Returns an error if the transform's pipeline is inconsistent.
pub fn trace<T: Transform>(transform: &T) -> Result<Composition, TraceError> {
    let mut recorder = Recorder::new(Symbolic);
    transform.reference(&mut recorder)?;
    Ok(recorder.into_trace().finalize())
}
