use crate::{
    Operands, Options, Precision, Problem, ProblemError, Transform, TransformKind,
    trace::Operators,
};

use super::{joined, spectrum_reals};

/// Periodic multi-dimensional real convolution.
///
/// Convolves a real box with a symbol given as the half spectrum of a real
/// box of the same shape:
///
/// ```text
/// out = irfftn(rfftn(src) * sym) / (n1 * n2 * ... )
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mdrconv {
    problem: Problem,
}

impl Mdrconv {
    /// Creates a convolution over a box of the given extents.
    ///
    /// # Errors
    ///
    /// Returns an error if `dims` is empty or has a zero extent.
    pub fn new(dims: impl Into<Vec<usize>>) -> Result<Self, ProblemError> {
        Ok(Self {
            problem: Problem::forward(dims)?,
        })
    }

    /// Cuts a full complex spectrum down to the half spectrum the generated
    /// function takes as its symbol.
    ///
    /// `full` holds interleaved `(re, im)` pairs over the whole box in row
    /// major order. Only the first `n / 2 + 1` entries along the last axis
    /// are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if `full` does not hold two values per box element.
    pub fn half_spectrum<V: Copy>(&self, full: &[V]) -> Result<Vec<V>, ProblemError> {
        let dims = self.problem.dimensions();
        let expected = 2 * self.problem.size();
        if full.len() != expected {
            return Err(ProblemError::SymbolLength {
                expected,
                found: full.len(),
            });
        }

        let last = dims.last().copied().unwrap_or(1);
        let row = 2 * last;
        let kept = 2 * (last / 2 + 1);
        Ok(full
            .chunks_exact(row)
            .flat_map(|chunk| &chunk[..kept])
            .copied()
            .collect())
    }
}

impl Transform for Mdrconv {
    fn kind(&self) -> TransformKind {
        TransformKind::Mdrconv
    }

    fn problem(&self) -> &Problem {
        &self.problem
    }

    fn name_base(&self, precision: Precision) -> String {
        format!(
            "{}Mdrconv_{}",
            precision.prefix(),
            joined(self.problem.dimensions(), "x")
        )
    }

    fn operands(&self) -> Operands {
        Operands::SourceAndSymbol
    }

    fn configure(&self, options: Options) -> Options {
        Options {
            include_metadata: true,
            ..options
        }
    }

    fn reference<O: Operators>(&self, ops: &mut O) -> Result<O::Array, O::Error> {
        let dims = self.problem.dimensions();
        let src = ops.real_input(dims)?;
        let sym = ops.spectrum_input(dims)?;

        let src_f = ops.rfftn(&src)?;
        let product = ops.pointwise(&src_f, &sym)?;
        ops.irfftn(&product, dims)
    }

    fn normalization(&self) -> Option<usize> {
        Some(self.problem.size())
    }

    fn output_len(&self) -> usize {
        self.problem.size()
    }

    fn input_len(&self) -> usize {
        self.problem.size()
    }

    fn symbol_len(&self) -> Option<usize> {
        Some(spectrum_reals(self.problem.dimensions()))
    }
}
