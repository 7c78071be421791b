//! Regression Module
//! Ordinary least squares with Pearson correlation and a two-sided p-value
//! for the slope's significance.

use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegressionError {
    #[error("Regression needs at least 2 points, got {0}")]
    TooFewPoints(usize),
    #[error("x and y lengths differ: {0} vs {1}")]
    LengthMismatch(usize, usize),
}

/// Result of one least-squares fit.
///
/// `predicted` holds the fitted values over the independent vector sorted
/// ascending (not the original row order), ready for trend-line plotting.
#[derive(Debug, Clone)]
pub struct Regression {
    pub predicted: Vec<f64>,
    pub corr: f64,
    pub p_value: f64,
}

/// Fit `y = slope * x + intercept` by ordinary least squares.
///
/// Non-finite inputs are not filtered: they propagate into the coefficients
/// as NaN, which downstream consumers mask out. Only structural problems
/// (mismatched or degenerate input sizes) are errors.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Result<Regression, RegressionError> {
    if x.len() != y.len() {
        return Err(RegressionError::LengthMismatch(x.len(), y.len()));
    }
    let n = x.len();
    if n < 2 {
        return Err(RegressionError::TooFewPoints(n));
    }

    let nf = n as f64;
    let mean_x = x.iter().sum::<f64>() / nf;
    let mean_y = y.iter().sum::<f64>() / nf;

    let mut ss_xx = 0.0;
    let mut ss_yy = 0.0;
    let mut ss_xy = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        ss_xx += dx * dx;
        ss_yy += dy * dy;
        ss_xy += dx * dy;
    }

    let slope = ss_xy / ss_xx;
    let intercept = mean_y - slope * mean_x;
    // rounding on near-collinear data can push the ratio past 1, which
    // would make the t statistic NaN; NaN itself passes through clamp
    let corr = (ss_xy / (ss_xx * ss_yy).sqrt()).clamp(-1.0, 1.0);

    let p_value = two_sided_p_value(corr, nf - 2.0);

    let mut x_sorted = x.to_vec();
    x_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let predicted = x_sorted.iter().map(|&xi| slope * xi + intercept).collect();

    Ok(Regression {
        predicted,
        corr,
        p_value,
    })
}

/// Two-sided p-value for the correlation's t statistic with `df` degrees
/// of freedom.
fn two_sided_p_value(corr: f64, df: f64) -> f64 {
    let t = corr * (df / (1.0 - corr * corr)).sqrt();
    if t.is_nan() {
        return f64::NAN;
    }
    if t.is_infinite() {
        // perfect correlation
        return 0.0;
    }

    // Two-tailed p-value using t-distribution
    if let Ok(dist) = StudentsT::new(0.0, 1.0, df) {
        2.0 * (1.0 - dist.cdf(t.abs()))
    } else {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_perfectly_linear_data() {
        let reg = linear_fit(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((reg.corr - 1.0).abs() < 1e-12);
        assert!(reg.p_value.abs() < 1e-12);
        for (got, want) in reg.predicted.iter().zip([2.0, 4.0, 6.0]) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn negative_trend_has_negative_corr() {
        let reg = linear_fit(&[1.0, 2.0, 3.0, 4.0], &[8.0, 6.0, 4.0, 2.0]).unwrap();
        assert!((reg.corr + 1.0).abs() < 1e-12);
    }

    #[test]
    fn predicted_follows_sorted_x() {
        // x unsorted on input, predicted must be ascending in x
        let reg = linear_fit(&[3.0, 1.0, 2.0], &[6.0, 2.0, 4.0]).unwrap();
        for (got, want) in reg.predicted.iter().zip([2.0, 4.0, 6.0]) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn noisy_data_gives_nonzero_p() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = [2.0, 1.0, 4.0, 3.0, 6.0, 5.0];
        let reg = linear_fit(&x, &y).unwrap();
        assert!(reg.corr > 0.0 && reg.corr < 1.0);
        assert!(reg.p_value > 0.0 && reg.p_value < 1.0);
    }

    #[test]
    fn collinear_large_magnitude_x_keeps_p_value_finite() {
        // differences of ~1e-6 relative magnitude make the correlation
        // ratio round past 1 without the clamp
        let x = [93318886.33595073, 93318882.79885045, 93318886.88017821];
        let y: Vec<f64> = x.iter().map(|&xi| 1.2447 * xi - 3.858).collect();

        let reg = linear_fit(&x, &y).unwrap();
        assert!(reg.corr <= 1.0);
        assert!(reg.corr > 0.999);
        assert!(!reg.p_value.is_nan());
        assert!(reg.p_value >= 0.0 && reg.p_value < 1e-6);
    }

    #[test]
    fn nan_inputs_propagate() {
        let reg = linear_fit(&[1.0, f64::NAN, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!(reg.corr.is_nan());
        assert!(reg.p_value.is_nan());
    }

    #[test]
    fn rejects_degenerate_input() {
        assert!(matches!(
            linear_fit(&[1.0], &[2.0]),
            Err(RegressionError::TooFewPoints(1))
        ));
        assert!(matches!(
            linear_fit(&[1.0, 2.0], &[2.0]),
            Err(RegressionError::LengthMismatch(2, 1))
        ));
    }
}
