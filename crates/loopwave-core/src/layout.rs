//! Batch/time restacking for `[batch, channel, time, depth]` tensors.
//!
//! A "batch of chunks" and "one long sequence" are the same data seen two ways.
//! [`merge_batch_into_time`] and [`split_time_into_batch`] convert between them
//! and are exact inverses. Both are block-major: batch item `b` owns time steps
//! `[b * T, (b + 1) * T)` of the merged sequence.
//!
//! Decoder folding is the one group-major layout:
//! [`split_time_into_batch_groups`] and [`fold_batch_groups_into_time`].

use crate::{Error, Result};
use ndarray::{s, Array3, Array4, ArrayBase, ArrayView4, Axis, Data, Ix4};

/// `[B, C, T, F]` -> `[1, C, B*T, F]`.
pub fn merge_batch_into_time<S>(x: &ArrayBase<S, Ix4>) -> Array4<f32>
where
    S: Data<Elem = f32>,
{
    let (b, c, t, f) = x.dim();
    Array4::from_shape_fn((1, c, b * t, f), |(_, ci, ti, fi)| {
        x[[ti / t, ci, ti % t, fi]]
    })
}

/// `[B, C, T, F]` -> `[B*T/block, C, block, F]`.
///
/// `T` must be a multiple of `block`.
pub fn split_time_into_batch<S>(x: &ArrayBase<S, Ix4>, block: usize) -> Result<Array4<f32>>
where
    S: Data<Elem = f32>,
{
    let (b, c, t, f) = x.dim();
    if block == 0 || t % block != 0 {
        return Err(Error::Shape(format!(
            "time length {} is not a multiple of block size {}",
            t, block
        )));
    }
    let per_item = t / block;
    Ok(Array4::from_shape_fn(
        (b * per_item, c, block, f),
        |(n, ci, ti, fi)| x[[n / per_item, ci, (n % per_item) * block + ti, fi]],
    ))
}

/// `[B, C, T, F]` -> `[B/parts, C, parts*T, F]`.
///
/// The batch axis is read as `parts` consecutive groups; group `p` becomes the
/// `p`-th time segment of every output item. Used when a model emits several
/// sub-blocks stacked on its batch axis.
pub fn fold_batch_groups_into_time<S>(x: &ArrayBase<S, Ix4>, parts: usize) -> Result<Array4<f32>>
where
    S: Data<Elem = f32>,
{
    let (b, c, t, f) = x.dim();
    if parts == 0 || b % parts != 0 {
        return Err(Error::Shape(format!(
            "batch size {} cannot be split into {} groups",
            b, parts
        )));
    }
    let group = b / parts;
    Ok(Array4::from_shape_fn(
        (group, c, parts * t, f),
        |(j, ci, ti, fi)| x[[(ti / t) * group + j, ci, ti % t, fi]],
    ))
}

/// `[B, C, T, F]` -> `[parts*B, C, T/parts, F]`, the inverse of
/// [`fold_batch_groups_into_time`].
///
/// Segment `p` of item `j` lands at batch index `p * B + j`: all first
/// segments, then all second segments. This is the layout decoders expect
/// when they unfold their batch back onto the time axis.
pub fn split_time_into_batch_groups<S>(x: &ArrayBase<S, Ix4>, parts: usize) -> Result<Array4<f32>>
where
    S: Data<Elem = f32>,
{
    let (b, c, t, f) = x.dim();
    if parts == 0 || t % parts != 0 {
        return Err(Error::Shape(format!(
            "time length {} cannot be split into {} groups",
            t, parts
        )));
    }
    let segment = t / parts;
    Ok(Array4::from_shape_fn(
        (parts * b, c, segment, f),
        |(n, ci, ti, fi)| x[[n % b, ci, (n / b) * segment + ti, fi]],
    ))
}

/// Copy depth range `[start, start + len)` of every step.
pub fn slice_depth<S>(x: &ArrayBase<S, Ix4>, start: usize, len: usize) -> Result<Array4<f32>>
where
    S: Data<Elem = f32>,
{
    let depth = x.dim().3;
    if start + len > depth {
        return Err(Error::Shape(format!(
            "depth range {}..{} exceeds depth {}",
            start,
            start + len,
            depth
        )));
    }
    Ok(x.slice(s![.., .., .., start..start + len]).to_owned())
}

/// Drop trailing time steps so the length is a multiple of `multiple`.
pub fn truncate_time<S>(x: &ArrayBase<S, Ix4>, multiple: usize) -> ArrayView4<'_, f32>
where
    S: Data<Elem = f32>,
{
    let t = x.dim().2;
    let keep = if multiple == 0 { t } else { (t / multiple) * multiple };
    x.slice(s![.., .., ..keep, ..])
}

/// Concatenate along the batch axis, preserving slice order.
pub fn concat_batch(parts: &[ArrayView4<'_, f32>]) -> Result<Array4<f32>> {
    if parts.is_empty() {
        return Err(Error::Shape("nothing to concatenate".into()));
    }
    Ok(ndarray::concatenate(Axis(0), parts)?)
}

/// Drop a singleton channel axis: `[B, 1, T, F]` -> `[B, T, F]`.
pub fn squeeze_channel(x: Array4<f32>) -> Result<Array3<f32>> {
    let c = x.dim().1;
    if c != 1 {
        return Err(Error::Shape(format!(
            "expected a single channel, found {}",
            c
        )));
    }
    Ok(x.index_axis_move(Axis(1), 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(shape: (usize, usize, usize, usize)) -> Array4<f32> {
        let n = shape.0 * shape.1 * shape.2 * shape.3;
        Array4::from_shape_vec(shape, (0..n).map(|v| v as f32).collect()).unwrap()
    }

    #[test]
    fn test_merge_is_block_major() {
        let x = ramp((3, 1, 2, 1));
        let merged = merge_batch_into_time(&x);
        assert_eq!(merged.dim(), (1, 1, 6, 1));
        let flat: Vec<f32> = merged.iter().copied().collect();
        assert_eq!(flat, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_split_inverts_merge() {
        let x = ramp((4, 2, 6, 3));
        let merged = merge_batch_into_time(&x);
        let restored = split_time_into_batch(&merged, 6).unwrap();
        assert_eq!(restored, x);
    }

    #[test]
    fn test_split_rejects_remainder() {
        let x = ramp((1, 1, 10, 2));
        assert!(matches!(
            split_time_into_batch(&x, 4),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn test_split_multi_item_order() {
        // Two items of four steps, blocks of two: item 0 yields chunks 0 and 1.
        let x = ramp((2, 1, 4, 1));
        let split = split_time_into_batch(&x, 2).unwrap();
        assert_eq!(split.dim(), (4, 1, 2, 1));
        assert_eq!(split[[1, 0, 0, 0]], 2.0);
        assert_eq!(split[[2, 0, 0, 0]], 4.0);
    }

    #[test]
    fn test_fold_groups() {
        // Batch [a0, a1, b0, b1] with two groups -> items [a0|b0, a1|b1].
        let x = ramp((4, 1, 1, 1));
        let folded = fold_batch_groups_into_time(&x, 2).unwrap();
        assert_eq!(folded.dim(), (2, 1, 2, 1));
        assert_eq!(folded[[0, 0, 0, 0]], 0.0);
        assert_eq!(folded[[0, 0, 1, 0]], 2.0);
        assert_eq!(folded[[1, 0, 0, 0]], 1.0);
        assert_eq!(folded[[1, 0, 1, 0]], 3.0);
    }

    #[test]
    fn test_split_groups_is_group_major() {
        // Items [0 1 2 3] and [4 5 6 7] in halves -> [0 1], [4 5], [2 3], [6 7].
        let x = ramp((2, 1, 4, 1));
        let split = split_time_into_batch_groups(&x, 2).unwrap();
        assert_eq!(split.dim(), (4, 1, 2, 1));
        let flat: Vec<f32> = split.iter().copied().collect();
        assert_eq!(flat, vec![0.0, 1.0, 4.0, 5.0, 2.0, 3.0, 6.0, 7.0]);
        assert!(split_time_into_batch_groups(&x, 3).is_err());
    }

    #[test]
    fn test_slice_depth_bounds() {
        let x = ramp((1, 1, 2, 4));
        let right = slice_depth(&x, 2, 2).unwrap();
        assert_eq!(right[[0, 0, 0, 0]], 2.0);
        assert!(slice_depth(&x, 3, 2).is_err());
    }

    #[test]
    fn test_truncate_time() {
        let x = ramp((1, 1, 19, 1));
        assert_eq!(truncate_time(&x, 8).dim(), (1, 1, 16, 1));
    }

    #[test]
    fn test_squeeze_channel() {
        let x = ramp((2, 1, 3, 4));
        assert_eq!(squeeze_channel(x).unwrap().dim(), (2, 3, 4));
        assert!(squeeze_channel(ramp((2, 2, 3, 4))).is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_split_then_merge_preserves_sequence(
            items in 1usize..5,
            blocks in 1usize..5,
            block in 1usize..6,
            depth in 1usize..4,
        ) {
            let x = ramp((1, 1, items * blocks * block, depth));
            let split = split_time_into_batch(&x, block).unwrap();
            proptest::prop_assert_eq!(split.dim().0, items * blocks);
            proptest::prop_assert_eq!(merge_batch_into_time(&split), x);
        }

        #[test]
        fn prop_fold_groups_inverts_split_groups(
            items in 1usize..6,
            parts in 1usize..4,
            segment in 1usize..5,
            depth in 1usize..3,
        ) {
            let x = ramp((items, 2, parts * segment, depth));
            let split = split_time_into_batch_groups(&x, parts).unwrap();
            proptest::prop_assert_eq!(fold_batch_groups_into_time(&split, parts).unwrap(), x);
        }
    }
}
