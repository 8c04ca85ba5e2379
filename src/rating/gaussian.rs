//! Standard normal helpers for the Gaussian-belief model.
//!
//! `erfc` is the Chebyshev fit from Numerical Recipes (fractional error below
//! 1.2e-7); `ierfc` refines a rational first guess with two Newton steps.

use std::f64::consts::{PI, SQRT_2};

/// Complementary error function.
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + z / 2.0);
    let poly = -1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98 + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let r = t * (-z * z + poly).exp();
    if x < 0.0 { 2.0 - r } else { r }
}

/// Inverse of [`erfc`] on `(0, 2)`.
pub fn ierfc(y: f64) -> f64 {
    if y >= 2.0 {
        return -100.0;
    }
    if y <= 0.0 {
        return 100.0;
    }

    let lower_half = y < 1.0;
    let y = if lower_half { y } else { 2.0 - y };
    let t = (-2.0 * (y / 2.0).ln()).sqrt();
    let mut x = -0.707_11 * ((2.307_53 + t * 0.270_61) / (1.0 + t * (0.992_29 + t * 0.044_81)) - t);
    for _ in 0..2 {
        let err = erfc(x) - y;
        x += err / (1.128_379_167_095_512_6 * (-(x * x)).exp() - x * err);
    }
    if lower_half { x } else { -x }
}

/// Density of N(0, 1).
pub fn pdf(x: f64) -> f64 {
    (-(x * x) / 2.0).exp() / (2.0 * PI).sqrt()
}

/// Cumulative distribution of N(0, 1).
pub fn cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Quantile function of N(0, 1).
pub fn ppf(p: f64) -> f64 {
    -SQRT_2 * ierfc(2.0 * p)
}

// =============================================================================
// TRUNCATION CORRECTIONS
// =============================================================================

/// Mean correction for a decisive result.
pub fn v_win(diff: f64, draw_margin: f64) -> f64 {
    let x = diff - draw_margin;
    let denom = cdf(x);
    if denom > 0.0 { pdf(x) / denom } else { -x }
}

/// Mean correction for a draw.
pub fn v_draw(diff: f64, draw_margin: f64) -> f64 {
    let abs_diff = diff.abs();
    let a = draw_margin - abs_diff;
    let b = -draw_margin - abs_diff;
    let denom = cdf(a) - cdf(b);
    let numer = pdf(b) - pdf(a);
    let v = if denom > 0.0 { numer / denom } else { a };
    if diff < 0.0 { -v } else { v }
}

/// Variance correction for a decisive result, kept inside `[0, 1]`.
pub fn w_win(diff: f64, draw_margin: f64) -> f64 {
    let x = diff - draw_margin;
    let v = v_win(diff, draw_margin);
    (v * (v + x)).clamp(0.0, 1.0)
}

/// Variance correction for a draw, kept inside `[0, 1]`.
pub fn w_draw(diff: f64, draw_margin: f64) -> f64 {
    let abs_diff = diff.abs();
    let a = draw_margin - abs_diff;
    let b = -draw_margin - abs_diff;
    let denom = cdf(a) - cdf(b);
    if denom <= 0.0 {
        return 1.0;
    }
    let v = v_draw(abs_diff, draw_margin);
    (v * v + (a * pdf(a) - b * pdf(b)) / denom).clamp(0.0, 1.0)
}
