//! Vectorized batch arithmetic.
//!
//! [`BatchOps`] is the seam between the numeric code and the instruction set:
//! [`WideBatch`] processes four lanes at a time through the `wide` crate's
//! portable `f64x4`, [`ScalarBatch`] is the plain loop. Both must agree up to
//! floating-point summation order.

use wide::f64x4;

/// Lane count of the vectorized implementation.
pub const LANES: usize = 4;

/// Batched reductions and element-wise kernels over `f64` slices.
pub trait BatchOps: Send + Sync {
    /// Sum of all elements.
    fn sum(&self, data: &[f64]) -> f64;

    /// Multiply-accumulate over the common prefix of `a` and `b`.
    fn dot(&self, a: &[f64], b: &[f64]) -> f64;

    /// `out[i] = a[i] - b[i]` over the common prefix of all three slices.
    fn sub_into(&self, a: &[f64], b: &[f64], out: &mut [f64]);

    /// Split consecutive price changes into gains and losses.
    ///
    /// `gains[i]` and `losses[i]` describe the move from `prices[i]` to
    /// `prices[i + 1]`; both are non-negative. Writes
    /// `min(prices.len() - 1, gains.len(), losses.len())` entries.
    fn split_changes(&self, prices: &[f64], gains: &mut [f64], losses: &mut [f64]);
}

/// Four-lane SIMD implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct WideBatch;

/// Scalar fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarBatch;

/// Implementation selected by the `simd` feature.
#[cfg(feature = "simd")]
pub type DefaultBatch = WideBatch;

/// Implementation selected by the `simd` feature.
#[cfg(not(feature = "simd"))]
pub type DefaultBatch = ScalarBatch;

#[inline]
fn load(chunk: &[f64]) -> f64x4 {
    f64x4::new([chunk[0], chunk[1], chunk[2], chunk[3]])
}

impl BatchOps for WideBatch {
    fn sum(&self, data: &[f64]) -> f64 {
        let chunks = data.chunks_exact(LANES);
        let tail = chunks.remainder();

        let mut acc = f64x4::splat(0.0);
        for chunk in chunks {
            acc += load(chunk);
        }

        let mut result = acc.reduce_add();
        for &value in tail {
            result += value;
        }
        result
    }

    fn dot(&self, a: &[f64], b: &[f64]) -> f64 {
        let len = a.len().min(b.len());
        let (a, b) = (&a[..len], &b[..len]);
        let split = len - len % LANES;

        let mut acc = f64x4::splat(0.0);
        for (ca, cb) in a[..split]
            .chunks_exact(LANES)
            .zip(b[..split].chunks_exact(LANES))
        {
            acc += load(ca) * load(cb);
        }

        let mut result = acc.reduce_add();
        for i in split..len {
            result += a[i] * b[i];
        }
        result
    }

    fn sub_into(&self, a: &[f64], b: &[f64], out: &mut [f64]) {
        let len = a.len().min(b.len()).min(out.len());
        let split = len - len % LANES;

        for i in (0..split).step_by(LANES) {
            let diff = load(&a[i..]) - load(&b[i..]);
            out[i..i + LANES].copy_from_slice(&diff.to_array());
        }
        for i in split..len {
            out[i] = a[i] - b[i];
        }
    }

    fn split_changes(&self, prices: &[f64], gains: &mut [f64], losses: &mut [f64]) {
        let len = prices
            .len()
            .saturating_sub(1)
            .min(gains.len())
            .min(losses.len());
        let split = len - len % LANES;
        let zero = f64x4::splat(0.0);

        for i in (0..split).step_by(LANES) {
            let diff = load(&prices[i + 1..]) - load(&prices[i..]);
            gains[i..i + LANES].copy_from_slice(&diff.max(zero).to_array());
            losses[i..i + LANES].copy_from_slice(&(-diff).max(zero).to_array());
        }
        for i in split..len {
            let change = prices[i + 1] - prices[i];
            gains[i] = change.max(0.0);
            losses[i] = (-change).max(0.0);
        }
    }
}

impl BatchOps for ScalarBatch {
    fn sum(&self, data: &[f64]) -> f64 {
        data.iter().sum()
    }

    fn dot(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    fn sub_into(&self, a: &[f64], b: &[f64], out: &mut [f64]) {
        for ((o, x), y) in out.iter_mut().zip(a).zip(b) {
            *o = x - y;
        }
    }

    fn split_changes(&self, prices: &[f64], gains: &mut [f64], losses: &mut [f64]) {
        for (i, pair) in prices.windows(2).enumerate() {
            if i >= gains.len() || i >= losses.len() {
                break;
            }
            let change = pair[1] - pair[0];
            gains[i] = change.max(0.0);
            losses[i] = (-change).max(0.0);
        }
    }
}
