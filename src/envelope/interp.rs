use bspline::BSpline;
use itertools::Itertools as _;

use crate::error::{Error, Result};

/// Piecewise-linear interpolant over strictly increasing sample positions.
///
/// Outside the sampled range the first/last segment is extended linearly.
#[derive(Debug, Clone)]
pub struct LinearInterp {
    spline: BSpline<f64, f64>,
    head_slope: f64,
    tail_slope: f64,
    head: f64,
    tail: f64,
}

impl LinearInterp {
    pub(crate) fn new(knots: &[f64], values: &[f64]) -> Result<Self> {
        check_samples(knots, values)?;
        let n = knots.len();
        let slope = |a: usize, b: usize| (values[b] - values[a]) / (knots[b] - knots[a]);
        // A degree-1 B-spline with doubled end knots passes through every control
        // point at the matching knot.
        let spline_knots = std::iter::once(knots[0])
            .chain(knots.iter().copied())
            .chain(std::iter::once(knots[n - 1]))
            .collect();
        Ok(Self {
            spline: BSpline::new(1, values.to_vec(), spline_knots),
            head_slope: slope(0, 1),
            tail_slope: slope(n - 2, n - 1),
            head: values[0],
            tail: values[n - 1],
        })
    }

    #[must_use]
    pub fn value(&self, x: f64) -> f64 {
        let (min, max) = self.spline.knot_domain();
        if x.is_nan() {
            f64::NAN
        } else if x < min {
            (x - min).mul_add(self.head_slope, self.head)
        } else if x > max {
            (x - max).mul_add(self.tail_slope, self.tail)
        } else {
            self.spline.point(x)
        }
    }

    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        self.spline.knot_domain()
    }
}

fn check_samples(knots: &[f64], values: &[f64]) -> Result<()> {
    if knots.len() != values.len() {
        return Err(Error::ShapeMismatch(format!(
            "{} sample times but {} values",
            knots.len(),
            values.len()
        )));
    }
    if knots.len() < 2 {
        return Err(Error::ShapeMismatch(format!(
            "At least 2 samples required, got {}",
            knots.len()
        )));
    }
    if let Some(v) = knots.iter().chain(values).find(|v| !v.is_finite()) {
        return Err(Error::ShapeMismatch(format!("Non-finite sample {v}")));
    }
    if let Some((a, b)) = knots.iter().tuple_windows().find(|(a, b)| a >= b) {
        return Err(Error::ShapeMismatch(format!(
            "Sample times must be strictly increasing, got {a} then {b}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    #[test]
    fn interpolates_between_samples() {
        let interp = LinearInterp::new(&[0.0, 5.0, 10.0], &[0.0, 1.0, 0.5]).unwrap();
        assert_approx_eq!(f64, interp.value(0.0), 0.0);
        assert_approx_eq!(f64, interp.value(2.5), 0.5);
        assert_approx_eq!(f64, interp.value(5.0), 1.0);
        assert_approx_eq!(f64, interp.value(7.5), 0.75);
        assert_approx_eq!(f64, interp.value(10.0), 0.5);
        assert_eq!(interp.domain(), (0.0, 10.0));
    }

    #[test]
    fn extrapolates_linearly() {
        let interp = LinearInterp::new(&[0.0, 5.0, 10.0], &[0.0, 1.0, 0.5]).unwrap();
        assert_approx_eq!(f64, interp.value(-1.0), -0.2);
        assert_approx_eq!(f64, interp.value(11.0), 0.4);
        assert!(interp.value(f64::NAN).is_nan());
    }

    #[test]
    fn rejects_bad_samples() {
        assert!(matches!(
            LinearInterp::new(&[0.0, 1.0], &[0.0]),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(matches!(
            LinearInterp::new(&[0.0], &[0.0]),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(matches!(
            LinearInterp::new(&[0.0, 2.0, 2.0], &[0.0, 1.0, 2.0]),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(matches!(
            LinearInterp::new(&[0.0, 1.0], &[0.0, f64::NAN]),
            Err(Error::ShapeMismatch(_))
        ));
    }
}
