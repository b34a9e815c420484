use super::{Operators, Shaped, Trace, render};

/// Executor wrapper that records every operator call.
///
/// Each call is delegated to the wrapped executor first; only calls that
/// succeed are recorded. Entries are rendered from the logical shapes seen
/// by the pipeline, so an embedding is described by the box it produces.
#[derive(Debug)]
pub struct Recorder<O> {
    inner: O,
    trace: Trace,
}

impl<O: Operators> Recorder<O> {
    #[must_use]
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            trace: Trace::new(),
        }
    }

    /// Returns the entries recorded so far.
    #[must_use]
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    #[must_use]
    pub fn into_trace(self) -> Trace {
        self.trace
    }

    /// Returns the wrapped executor and the recorded trace.
    #[must_use]
    pub fn into_parts(self) -> (O, Trace) {
        (self.inner, self.trace)
    }
}

impl<O: Operators> Operators for Recorder<O> {
    type Array = O::Array;
    type Error = O::Error;

    fn real_input(&mut self, shape: &[usize]) -> Result<O::Array, O::Error> {
        self.inner.real_input(shape)
    }

    fn spectrum_input(&mut self, real_shape: &[usize]) -> Result<O::Array, O::Error> {
        self.inner.spectrum_input(real_shape)
    }

    fn zero_embed_box(
        &mut self,
        src: &O::Array,
        padding: &[(usize, usize)],
    ) -> Result<O::Array, O::Error> {
        let out = self.inner.zero_embed_box(src, padding)?;

        let mut output = Vec::with_capacity(src.shape().len());
        let mut bounds = Vec::with_capacity(src.shape().len());
        for (axis, &n) in src.shape().iter().enumerate() {
            let (before, after) = padding
                .get(axis)
                .or_else(|| padding.last())
                .copied()
                .unwrap_or_default();
            output.push(before + n + after);
            bounds.push((before, before + n - 1));
        }
        self.trace.push(render::zero_embed_box(&output, &bounds));

        Ok(out)
    }

    fn rfftn(&mut self, x: &O::Array) -> Result<O::Array, O::Error> {
        let out = self.inner.rfftn(x)?;
        self.trace.push(render::mdprdft(x.shape()));
        Ok(out)
    }

    fn pointwise(&mut self, x: &O::Array, y: &O::Array) -> Result<O::Array, O::Error> {
        let out = self.inner.pointwise(x, y)?;
        let reals = if x.is_complex() { 2 * x.size() } else { x.size() };
        self.trace.push(render::rc_diag(reals));
        Ok(out)
    }

    fn irfftn(&mut self, x: &O::Array, shape: &[usize]) -> Result<O::Array, O::Error> {
        let out = self.inner.irfftn(x, shape)?;
        self.trace.push(render::imdprdft(shape));
        Ok(out)
    }

    fn extract_box(&mut self, x: &O::Array, n: usize, nd: usize) -> Result<O::Array, O::Error> {
        let out = self.inner.extract_box(x, n, nd)?;
        self.trace.push(render::extract_box(n, nd, x.shape().len()));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::trace::{Symbolic, TraceError};

    #[test]
    fn embed_renders_output_box() {
        let mut recorder = Recorder::new(Symbolic);
        let src = recorder.real_input(&[2, 2, 2]).unwrap();
        recorder.zero_embed_box(&src, &[(0, 2)]).unwrap();

        assert_eq!(
            recorder.trace().entries(),
            &["ZeroEmbedBox([4,4,4], [[0..1],[0..1],[0..1]])"]
        );
    }

    #[test]
    fn inputs_are_not_recorded() {
        let mut recorder = Recorder::new(Symbolic);
        recorder.real_input(&[4, 4, 4]).unwrap();
        recorder.spectrum_input(&[4, 4, 4]).unwrap();

        assert!(recorder.trace().is_empty());
    }

    #[test]
    fn failed_calls_are_not_recorded() {
        let mut recorder = Recorder::new(Symbolic);
        let x = recorder.real_input(&[8, 8, 8]).unwrap();

        let result = recorder.extract_box(&x, 8, 10);

        assert_eq!(result, Err(TraceError::ExtractBounds { n: 8, nd: 10 }));
        assert!(recorder.trace().is_empty());
    }

    #[test]
    fn extract_renders_far_corner() {
        let mut recorder = Recorder::new(Symbolic);
        let x = recorder.real_input(&[8, 8, 8]).unwrap();
        recorder.extract_box(&x, 8, 4).unwrap();

        assert_eq!(
            recorder.trace().entries(),
            &["ExtractBox([8,8,8], [[4..7],[4..7],[4..7]])"]
        );
    }
}
