use crate::{
    Operands, Options, Precision, Problem, ProblemError, Transform, TransformKind,
    trace::Operators,
};

use super::spectrum_reals;

/// Free-space 3D convolution (Hockney's method).
///
/// An `nb`-cube of sources is zero-padded to an `n`-cube, convolved
/// periodically with the symbol, and the `nd`-cube in the far corner of the
/// result is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hockney {
    problem: Problem,
    nb: usize,
    nd: usize,
}

impl Hockney {
    /// Creates a convolution with padded extent `n`, input extent `nb` and
    /// output extent `nd`.
    ///
    /// # Errors
    ///
    /// Returns an error if `n` is zero or either box does not fit in `n`.
    pub fn new(n: usize, nb: usize, nd: usize) -> Result<Self, ProblemError> {
        let problem = Problem::forward([n, n, n])?;
        if nb == 0 || nb > n {
            return Err(ProblemError::BoxExtent {
                which: "input",
                extent: nb,
                n,
            });
        }
        if nd == 0 || nd > n {
            return Err(ProblemError::BoxExtent {
                which: "output",
                extent: nd,
                n,
            });
        }
        Ok(Self { problem, nb, nd })
    }

    #[must_use]
    pub fn padded_extent(&self) -> usize {
        self.problem.dim_n()
    }
}

impl Transform for Hockney {
    fn kind(&self) -> TransformKind {
        TransformKind::Hockney
    }

    fn problem(&self) -> &Problem {
        &self.problem
    }

    fn name_base(&self, precision: Precision) -> String {
        format!(
            "{}Hockney_{}_{}_{}",
            precision.prefix(),
            self.padded_extent(),
            self.nb,
            self.nd
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
        let n = self.padded_extent();
        let dims = self.problem.dimensions();

        let src = ops.real_input(&[self.nb; 3])?;
        let sym = ops.spectrum_input(dims)?;

        let padded = ops.zero_embed_box(&src, &[(0, n - self.nb)])?;
        let padded_f = ops.rfftn(&padded)?;
        let product = ops.pointwise(&padded_f, &sym)?;
        let out = ops.irfftn(&product, dims)?;
        ops.extract_box(&out, n, self.nd)
    }

    fn normalization(&self) -> Option<usize> {
        Some(self.problem.size())
    }

    fn output_len(&self) -> usize {
        self.nd.pow(3)
    }

    fn input_len(&self) -> usize {
        self.nb.pow(3)
    }

    fn symbol_len(&self) -> Option<usize> {
        Some(spectrum_reals(self.problem.dimensions()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::trace;

    #[test]
    fn traces_five_operators() {
        let hockney = Hockney::new(8, 4, 3).unwrap();

        let composition = trace::trace(&hockney).expect("should trace");

        assert_eq!(
            composition.entries(),
            &[
                "ExtractBox([8,8,8], [[5..7],[5..7],[5..7]]),",
                "IMDPRDFT([8,8,8], 1),",
                "RCDiag(FDataOfs(symvar, 640, 0)),",
                "MDPRDFT([8,8,8], -1),",
                "ZeroEmbedBox([8,8,8], [[0..3],[0..3],[0..3]])",
            ]
        );
    }

    #[test]
    fn rejects_oversized_boxes() {
        assert_eq!(
            Hockney::new(8, 9, 3),
            Err(ProblemError::BoxExtent {
                which: "input",
                extent: 9,
                n: 8
            })
        );
        assert!(matches!(
            Hockney::new(8, 4, 0),
            Err(ProblemError::BoxExtent { which: "output", .. })
        ));
    }

    #[test]
    fn normalizes_by_padded_volume() {
        let hockney = Hockney::new(8, 4, 3).unwrap();

        assert_eq!(hockney.normalization(), Some(512));
        assert_eq!(hockney.output_len(), 27);
        assert_eq!(hockney.input_len(), 64);
        assert_eq!(hockney.name_base(Precision::Double), "dHockney_8_4_3");
    }
}
