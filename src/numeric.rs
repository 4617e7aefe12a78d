//! Numerically stable log-space arithmetic.
//!
//! Every merge across CTC alignments goes through [`logadd`]. Plain `(a.exp() +
//! b.exp()).ln()` underflows long before the frame counts this decoder is meant to run
//! over (T ~ 500+), so everything in `beam` and `decoder` routes through here instead.

/// The additive identity for [`logadd`]: `logadd(NEG_INFINITY, x) == x`.
pub const NEG_INFINITY: f32 = f32::NEG_INFINITY;

/// `log(exp(a) + exp(b))`, computed via the max-shift trick so it never overflows and
/// only underflows when the true result would.
///
/// `-inf` is treated as the identity on either side: `logadd(-inf, x) == x` and
/// `logadd(x, -inf) == x`, including `logadd(-inf, -inf) == -inf`.
pub fn logadd(a: f32, b: f32) -> f32 {
    if a == NEG_INFINITY {
        return b;
    }
    if b == NEG_INFINITY {
        return a;
    }
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}
