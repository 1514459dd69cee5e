//! Statistical helpers: median and per-pixel median combination.


use rayon::prelude::*;

use crate::frame::Plane;

/// Pixels per parallel work unit in [`median_combine`].
const CHUNK_SIZE: usize = 4096;

/// Calculate the median of f64 values in-place.
///
/// Mutates the input buffer (partial sort via quickselect). Even-length
/// inputs average the two middle values.
#[inline]
pub fn median_f64_mut(data: &mut [f64]) -> f64 {
    debug_assert!(!data.is_empty());

    let len = data.len();
    let mid = len / 2;

    let (left_part, median, _) = data.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    let upper = *median;
    if len & 1 == 1 {
        upper
    } else {
        let lower = left_part
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        (lower + upper) * 0.5
    }
}

/// Arithmetic mean. Returns 0 for an empty slice.
pub fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Per-pixel median across same-shape planes.
///
/// Panics if `planes` is empty or shapes differ.
pub fn median_combine(planes: &[&Plane]) -> Plane {
    assert!(!planes.is_empty(), "Must provide at least one plane");

    let first = planes[0];
    let dims = first.dimensions();
    for (i, plane) in planes.iter().enumerate().skip(1) {
        assert!(
            plane.dimensions() == dims,
            "plane {} has different dimensions: {} vs {}",
            i,
            plane.dimensions(),
            dims
        );
    }

    if planes.len() == 1 {
        return first.clone();
    }

    let frame_count = planes.len();
    let mut pixels = vec![0.0f64; dims.pixel_count()];
    pixels
        .par_chunks_mut(CHUNK_SIZE)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let start_idx = chunk_idx * CHUNK_SIZE;
            let mut values = Vec::with_capacity(frame_count);
            for (i, out) in chunk.iter_mut().enumerate() {
                let idx = start_idx + i;
                values.clear();
                values.extend(planes.iter().map(|p| p.pixels()[idx]));
                *out = median_f64_mut(&mut values);
            }
        });

    Plane::new(dims.width, dims.height, pixels)
}
