use std::error::Error as StdError;

/// An array whose logical shape is known.
pub trait Shaped {
    /// Returns the logical extents, outermost axis first.
    fn shape(&self) -> &[usize];

    /// Returns `true` if elements are complex (a half spectrum).
    fn is_complex(&self) -> bool;

    /// Returns the number of elements.
    fn size(&self) -> usize {
        self.shape().iter().product()
    }
}

/// The symbolic tensor operations a reference pipeline is written against.
///
/// Implementations decide what a call does: [`Symbolic`](super::Symbolic)
/// only propagates shapes, [`Recorder`](super::Recorder) additionally records
/// a rendered entry for every call, and a numeric backend would compute real
/// data. A reference pipeline never knows which one it runs on.
pub trait Operators {
    type Array: Shaped;
    type Error: StdError + Send + Sync + 'static;

    /// Creates a real input array of the given shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape is empty or has a zero extent.
    fn real_input(&mut self, shape: &[usize]) -> Result<Self::Array, Self::Error>;

    /// Creates a half-spectrum input, as produced by [`Operators::rfftn`]
    /// on a real array of shape `real_shape`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape is empty or has a zero extent.
    fn spectrum_input(&mut self, real_shape: &[usize]) -> Result<Self::Array, Self::Error>;

    /// Embeds `src` in a zero box, padding each axis by `(before, after)`.
    ///
    /// When fewer pairs than axes are given, the last pair is repeated.
    ///
    /// # Errors
    ///
    /// Returns an error if `src` is complex or the padding does not fit its rank.
    fn zero_embed_box(
        &mut self,
        src: &Self::Array,
        padding: &[(usize, usize)],
    ) -> Result<Self::Array, Self::Error>;

    /// Forward multi-dimensional real DFT.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` is not real.
    fn rfftn(&mut self, x: &Self::Array) -> Result<Self::Array, Self::Error>;

    /// Pointwise multiplication of two arrays of equal shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes or element kinds differ.
    fn pointwise(&mut self, x: &Self::Array, y: &Self::Array)
    -> Result<Self::Array, Self::Error>;

    /// Inverse multi-dimensional real DFT producing a real array of `shape`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` is not the half spectrum of `shape`.
    fn irfftn(&mut self, x: &Self::Array, shape: &[usize]) -> Result<Self::Array, Self::Error>;

    /// Extracts the `nd`-cube in the far corner of an `n`-cube.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` is not a real `n`-cube or `nd` exceeds `n`.
    fn extract_box(
        &mut self,
        x: &Self::Array,
        n: usize,
        nd: usize,
    ) -> Result<Self::Array, Self::Error>;
}
