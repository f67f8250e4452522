//! Normal distribution helpers.

use std::f64::consts::PI;
use std::sync::OnceLock;

use statrs::distribution::{ContinuousCDF, Normal};

fn standard_normal() -> &'static Normal {
    static STANDARD_NORMAL: OnceLock<Normal> = OnceLock::new();
    STANDARD_NORMAL.get_or_init(|| Normal::new(0.0, 1.0).expect("unit normal is well formed"))
}

/// Standard normal CDF.
pub fn norm_cdf(x: f64) -> f64 {
    standard_normal().cdf(x)
}

/// Standard normal PDF.
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdf_matches_known_quantiles() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-10);
        assert!((norm_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((norm_cdf(-1.96) - 0.025).abs() < 1e-3);
    }

    #[test]
    fn pdf_is_symmetric_and_peaks_at_zero() {
        assert!((norm_pdf(1.3) - norm_pdf(-1.3)).abs() < 1e-15);
        assert!(norm_pdf(0.0) > norm_pdf(0.1));
        assert!((norm_pdf(0.0) - 0.398_942_280_401_432_7).abs() < 1e-12);
    }
}
