//! Partitioning of the flat parameter vector into the contiguous per-type
//! force-constant segments, in ascending sorted order of dihedral type.

use thiserror::Error;

#[derive(Debug, Error)]
#[error("parameter vector has length {got}, expected {expected}")]
pub struct DimensionError {
    pub expected: usize,
    pub got: usize,
}

/// Split `x` into one sub-slice per term count, by cumulative offsets.
/// Concatenating the returned segments in order reproduces `x`.
pub fn split_constants<'a>(
    x: &'a [f64],
    counts: &[usize],
) -> Result<Vec<&'a [f64]>, DimensionError> {
    let expected = counts.iter().sum();
    if x.len() != expected {
        return Err(DimensionError {
            expected,
            got: x.len(),
        });
    }
    let mut segments = Vec::with_capacity(counts.len());
    let mut start = 0;
    for &count in counts {
        segments.push(&x[start..start + count]);
        start += count;
    }
    Ok(segments)
}
