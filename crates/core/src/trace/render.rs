//! Text renderings of operator calls in the generator's notation.

/// `[n1,n2,n3]`
pub(crate) fn dims(extents: &[usize]) -> String {
    let items: Vec<String> = extents.iter().map(usize::to_string).collect();
    format!("[{}]", items.join(","))
}

/// `[[lo1..hi1],[lo2..hi2]]`, bounds inclusive.
pub(crate) fn ranges(bounds: &[(usize, usize)]) -> String {
    let items: Vec<String> = bounds
        .iter()
        .map(|(lo, hi)| format!("[{lo}..{hi}]"))
        .collect();
    format!("[{}]", items.join(","))
}

pub(crate) fn zero_embed_box(output: &[usize], bounds: &[(usize, usize)]) -> String {
    format!("ZeroEmbedBox({}, {})", dims(output), ranges(bounds))
}

pub(crate) fn mdprdft(shape: &[usize]) -> String {
    format!("MDPRDFT({}, -1)", dims(shape))
}

pub(crate) fn imdprdft(shape: &[usize]) -> String {
    format!("IMDPRDFT({}, 1)", dims(shape))
}

/// Diagonal scaling by the external `symvar` buffer of `reals` real values.
pub(crate) fn rc_diag(reals: usize) -> String {
    format!("RCDiag(FDataOfs(symvar, {reals}, 0))")
}

pub(crate) fn extract_box(n: usize, nd: usize, rank: usize) -> String {
    let range = (n - nd, n - 1);
    format!(
        "ExtractBox({}, {})",
        dims(&vec![n; rank]),
        ranges(&vec![range; rank])
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_dimension_lists() {
        assert_eq!(dims(&[4, 4, 4]), "[4,4,4]");
        assert_eq!(dims(&[7]), "[7]");
    }

    #[test]
    fn renders_inclusive_ranges() {
        assert_eq!(ranges(&[(0, 3), (2, 5)]), "[[0..3],[2..5]]");
    }

    #[test]
    fn renders_extract_box() {
        assert_eq!(
            extract_box(8, 3, 3),
            "ExtractBox([8,8,8], [[5..7],[5..7],[5..7]])"
        );
    }
}
