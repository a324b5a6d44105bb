use rayon::prelude::*;

/// Fill a row-major `width` wide buffer with `value(row, col)`.
/// `chunk_rows` rows make up one task for multi-threading.
pub fn set_values<F>(
    a_slice: &mut [f64],
    width: usize,
    value: F,
    chunk_rows: usize,
) where
    F: Fn(usize, usize) -> f64 + Sync,
{
    debug_assert!(width > 0);
    debug_assert_eq!(a_slice.len() % width, 0);
    let chunk_size = width * chunk_rows.max(1);
    a_slice.par_chunks_mut(chunk_size).enumerate().for_each(
        |(chunk_index, a_chunk): (usize, &mut [f64])| {
            let first_row = chunk_index * chunk_rows.max(1);
            for (l, a) in a_chunk.iter_mut().enumerate() {
                *a = value(first_row + l / width, l % width);
            }
        },
    );
}

/// Smallest and largest value, `None` for an empty slice.
pub fn min_max(a_slice: &[f64], chunk_size: usize) -> Option<(f64, f64)> {
    a_slice
        .par_chunks(chunk_size.max(1))
        .map(|a_chunk| {
            a_chunk.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, a| {
                (acc.0.min(*a), acc.1.max(*a))
            })
        })
        .reduce_with(|a, b| (a.0.min(b.0), a.1.max(b.1)))
}
