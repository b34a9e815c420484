use super::{Operators, Shaped, TraceError};

/// An array known only by its shape and element kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicArray {
    pub shape: Vec<usize>,
    pub complex: bool,
}

impl SymbolicArray {
    /// Creates a real array, validating its shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape is empty or has a zero extent.
    pub fn real(shape: &[usize]) -> Result<Self, TraceError> {
        validate_shape(shape)?;
        Ok(Self {
            shape: shape.to_vec(),
            complex: false,
        })
    }

    /// Creates the half spectrum of a real array of shape `real_shape`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape is empty or has a zero extent.
    pub fn spectrum_of(real_shape: &[usize]) -> Result<Self, TraceError> {
        validate_shape(real_shape)?;
        Ok(Self {
            shape: half_spectrum(real_shape),
            complex: true,
        })
    }
}

impl Shaped for SymbolicArray {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn is_complex(&self) -> bool {
        self.complex
    }
}

/// Shape-only executor.
///
/// Propagates shapes through each operator and rejects inconsistent
/// pipelines, without touching any data.
#[derive(Debug, Clone, Copy, Default)]
pub struct Symbolic;

impl Operators for Symbolic {
    type Array = SymbolicArray;
    type Error = TraceError;

    fn real_input(&mut self, shape: &[usize]) -> Result<SymbolicArray, TraceError> {
        SymbolicArray::real(shape)
    }

    fn spectrum_input(&mut self, real_shape: &[usize]) -> Result<SymbolicArray, TraceError> {
        SymbolicArray::spectrum_of(real_shape)
    }

    fn zero_embed_box(
        &mut self,
        src: &SymbolicArray,
        padding: &[(usize, usize)],
    ) -> Result<SymbolicArray, TraceError> {
        require_real("zero_embed_box", src)?;
        let padding = expand_padding(padding, src.shape.len())?;
        let shape: Vec<usize> = src
            .shape
            .iter()
            .zip(&padding)
            .map(|(n, (before, after))| before + n + after)
            .collect();
        SymbolicArray::real(&shape)
    }

    fn rfftn(&mut self, x: &SymbolicArray) -> Result<SymbolicArray, TraceError> {
        require_real("rfftn", x)?;
        SymbolicArray::spectrum_of(&x.shape)
    }

    fn pointwise(
        &mut self,
        x: &SymbolicArray,
        y: &SymbolicArray,
    ) -> Result<SymbolicArray, TraceError> {
        if x.shape != y.shape || x.complex != y.complex {
            return Err(TraceError::ShapeMismatch {
                op: "pointwise",
                left: x.shape.clone(),
                right: y.shape.clone(),
            });
        }
        Ok(x.clone())
    }

    fn irfftn(&mut self, x: &SymbolicArray, shape: &[usize]) -> Result<SymbolicArray, TraceError> {
        if !x.complex {
            return Err(TraceError::ExpectedComplex { op: "irfftn" });
        }
        validate_shape(shape)?;
        let expected = half_spectrum(shape);
        if x.shape != expected {
            return Err(TraceError::ShapeMismatch {
                op: "irfftn",
                left: x.shape.clone(),
                right: expected,
            });
        }
        SymbolicArray::real(shape)
    }

    fn extract_box(
        &mut self,
        x: &SymbolicArray,
        n: usize,
        nd: usize,
    ) -> Result<SymbolicArray, TraceError> {
        require_real("extract_box", x)?;
        if x.shape.iter().any(|&extent| extent != n) {
            return Err(TraceError::NotCube {
                op: "extract_box",
                n,
                shape: x.shape.clone(),
            });
        }
        if nd == 0 || nd > n {
            return Err(TraceError::ExtractBounds { n, nd });
        }
        SymbolicArray::real(&vec![nd; x.shape.len()])
    }
}

/// Expands per-axis padding to `rank` pairs, repeating the last pair.
pub(crate) fn expand_padding(
    padding: &[(usize, usize)],
    rank: usize,
) -> Result<Vec<(usize, usize)>, TraceError> {
    let Some(&last) = padding.last() else {
        return Err(TraceError::EmptyPadding);
    };
    if padding.len() > rank {
        return Err(TraceError::PaddingRank {
            axes: padding.len(),
            rank,
        });
    }
    let mut expanded = padding.to_vec();
    expanded.resize(rank, last);
    Ok(expanded)
}

/// Shape of the half spectrum of a real array: the last axis becomes `n/2 + 1`.
pub(crate) fn half_spectrum(real_shape: &[usize]) -> Vec<usize> {
    let mut shape = real_shape.to_vec();
    if let Some(last) = shape.last_mut() {
        *last = *last / 2 + 1;
    }
    shape
}

fn validate_shape(shape: &[usize]) -> Result<(), TraceError> {
    if shape.is_empty() {
        return Err(TraceError::EmptyShape);
    }
    if shape.contains(&0) {
        return Err(TraceError::ZeroExtent {
            shape: shape.to_vec(),
        });
    }
    Ok(())
}

fn require_real(op: &'static str, x: &SymbolicArray) -> Result<(), TraceError> {
    if x.complex {
        Err(TraceError::ExpectedReal { op })
    } else {
        Ok(())
    }
}
