//! Transforms with a ready-made reference pipeline.
//!
//! - [`Mdrconv`] — periodic multi-dimensional real convolution
//! - [`Hockney`] — free-space convolution by zero padding and box extraction

mod hockney;
mod mdrconv;

pub use hockney::Hockney;
pub use mdrconv::Mdrconv;

/// Number of real values in the half spectrum of a real array of `dims`.
fn spectrum_reals(dims: &[usize]) -> usize {
    match dims.split_last() {
        Some((last, rest)) => 2 * rest.iter().product::<usize>() * (last / 2 + 1),
        None => 0,
    }
}

/// `4x4x8`
fn joined(dims: &[usize], sep: &str) -> String {
    dims.iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}
