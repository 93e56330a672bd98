use crate::IndexError;

/// Norms below this are treated as zero.
pub const DEGENERATE_NORM: f32 = 1e-12;

/// Allowed deviation from 1.0 for a vector to count as unit length.
pub const UNIT_TOLERANCE: f32 = 1e-3;

/// Chunk size for the unrolled dot product.
const SIMD_CHUNK_SIZE: usize = 32;

/// Euclidean norm, accumulated in f64.
pub fn l2_norm(v: &[f32]) -> f32 {
    l2_norm_f64(v) as f32
}

/// Never overflows for finite input: `n * f32::MAX^2` fits in an f64.
fn l2_norm_f64(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// In-place L2 normalization.
///
/// Fails with [`IndexError::DegenerateVector`] for empty input, non-finite
/// values, or a norm below [`DEGENERATE_NORM`], leaving `v` untouched.
/// The scale factor stays in f64, so components near `f32::MAX` normalize
/// instead of overflowing.
pub fn l2_normalize_in_place(v: &mut [f32]) -> Result<(), IndexError> {
    if v.is_empty() || v.iter().any(|x| !x.is_finite()) {
        return Err(IndexError::DegenerateVector);
    }
    let norm = l2_norm_f64(v);
    if norm < f64::from(DEGENERATE_NORM) {
        return Err(IndexError::DegenerateVector);
    }
    let inv_norm = norm.recip();
    for x in v.iter_mut() {
        *x = (f64::from(*x) * inv_norm) as f32;
    }
    Ok(())
}

/// Allocating variant of [`l2_normalize_in_place`].
pub fn l2_normalized(v: &[f32]) -> Result<Vec<f32>, IndexError> {
    let mut out = v.to_vec();
    l2_normalize_in_place(&mut out)?;
    Ok(out)
}

pub fn is_unit(v: &[f32]) -> bool {
    (l2_norm(v) - 1.0).abs() <= UNIT_TOLERANCE
}

/// Dot product over equal-length slices, processed in fixed chunks so the
/// inner loop auto-vectorizes.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut chunks_a = a.chunks_exact(SIMD_CHUNK_SIZE);
    let mut chunks_b = b.chunks_exact(SIMD_CHUNK_SIZE);
    let mut sum = 0.0f32;
    for (ca, cb) in (&mut chunks_a).zip(&mut chunks_b) {
        sum += dot_chunk(ca, cb);
    }
    sum + dot_chunk(chunks_a.remainder(), chunks_b.remainder())
}

#[inline(always)]
fn dot_chunk(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_simple_vector() {
        let mut v = vec![3.0f32, 4.0];
        l2_normalize_in_place(&mut v).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_degenerate_and_untouched() {
        let mut v = vec![0.0f32; 4];
        assert_eq!(
            l2_normalize_in_place(&mut v),
            Err(IndexError::DegenerateVector)
        );
        assert_eq!(v, vec![0.0; 4]);
    }

    #[test]
    fn empty_and_non_finite_are_degenerate() {
        assert!(l2_normalized(&[]).is_err());
        assert!(l2_normalized(&[1.0, f32::NAN]).is_err());
        assert!(l2_normalized(&[f32::INFINITY, 0.0]).is_err());
    }

    #[test]
    fn tiny_but_nonzero_vector_still_normalizes() {
        let v = l2_normalized(&[1e-10, 1e-10, 1e-10]).unwrap();
        assert!(is_unit(&v));
    }

    #[test]
    fn huge_finite_components_still_normalize() {
        let v = l2_normalized(&[3e38, 3e38]).unwrap();
        let half = std::f32::consts::FRAC_1_SQRT_2;
        assert!((v[0] - half).abs() < 1e-6);
        assert!((v[1] - half).abs() < 1e-6);
        assert!(is_unit(&v));

        let v = l2_normalized(&[f32::MAX, -f32::MAX, 0.0]).unwrap();
        assert!(is_unit(&v));
        assert!(v[0] > 0.0 && v[1] < 0.0);
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = l2_normalized(&[1.0, 2.0, 3.0]).unwrap();
        let twice = l2_normalized(&once).unwrap();
        for (a, b) in once.iter().zip(&twice) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn chunked_dot_matches_scalar() {
        let a: Vec<f32> = (0..100).map(|i| (i as f32 * 0.37).sin()).collect();
        let b: Vec<f32> = (0..100).map(|i| (i as f32 * 0.11).cos()).collect();
        let expected: f32 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
        assert!((dot(&a, &b) - expected).abs() < 1e-4);
    }

    #[test]
    fn dot_of_short_vectors() {
        assert_eq!(dot(&[1.0, 2.0], &[3.0, 4.0]), 11.0);
        assert_eq!(dot(&[], &[]), 0.0);
    }
}
