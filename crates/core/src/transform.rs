use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Options, Precision, Problem, trace::Operators};

/// Kind of transform implemented by a generated function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    #[default]
    Unknown,
    Mdrconv,
    Hockney,
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransformKind::Unknown => "unknown",
            TransformKind::Mdrconv => "mdrconv",
            TransformKind::Hockney => "hockney",
        };
        f.write_str(name)
    }
}

/// Buffers the generated main function takes after the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    /// `f(dst, src)`
    Source,
    /// `f(dst, src, sym)`
    SourceAndSymbol,
}

impl Operands {
    /// Returns the number of source pointers passed after the destination.
    #[must_use]
    pub fn sources(self) -> usize {
        match self {
            Operands::Source => 1,
            Operands::SourceAndSymbol => 2,
        }
    }
}

/// A transform that can be traced, generated, and invoked.
///
/// The reference pipeline is written once against [`Operators`]; tracing it
/// through a recorder yields the composition sent to the generator.
pub trait Transform {
    fn kind(&self) -> TransformKind;

    fn problem(&self) -> &Problem;

    /// Returns the platform-independent base name of the generated function.
    fn name_base(&self, precision: Precision) -> String;

    fn operands(&self) -> Operands;

    /// Adjusts the options this transform is built with.
    ///
    /// The default leaves them unchanged.
    fn configure(&self, options: Options) -> Options {
        options
    }

    /// Builds the test input with `ops` and runs the reference pipeline.
    ///
    /// # Errors
    ///
    /// Returns any error raised by `ops`.
    fn reference<O: Operators>(&self, ops: &mut O) -> Result<O::Array, O::Error>;

    /// Returns the divisor applied to results after invocation, if any.
    ///
    /// Generated inverse transforms are unnormalized, so a transform ending in
    /// one divides by the product of its inverse transform extents.
    fn normalization(&self) -> Option<usize>;

    /// Returns the number of real elements in the destination buffer.
    fn output_len(&self) -> usize;

    /// Returns the number of real elements in the source buffer.
    fn input_len(&self) -> usize;

    /// Returns the number of real elements in the symbol buffer, if any.
    fn symbol_len(&self) -> Option<usize>;
}
