//! Reproductive output at the season boundary.

use ndarray::Array2;

/// Reproductive output for every `(ts, d)`.
///
/// Non-zero only when `ts` is a season boundary (`ts mod max_ts == 0`), where
/// fecundity declines linearly with damage.
pub fn reproductive_output(k_fec: f64, max_ts: usize, max_d: usize) -> Array2<f64> {
    Array2::from_shape_fn((max_ts + 1, max_d + 1), |(ts, d)| {
        if is_breeding_epoch(ts, max_ts) {
            fecundity(k_fec, d)
        } else {
            0.0
        }
    })
}

#[inline]
pub fn is_breeding_epoch(ts: usize, max_ts: usize) -> bool {
    ts % max_ts == 0
}

#[inline]
pub fn fecundity(k_fec: f64, d: usize) -> f64 {
    (1.0 - k_fec * d as f64).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_fecundity_cost() {
        let repro = reproductive_output(0.0, 10, 20);
        for ts in 0..=10 {
            for d in 0..=20 {
                let expected = if ts == 0 || ts == 10 { 1.0 } else { 0.0 };
                assert_eq!(repro[[ts, d]], expected);
            }
        }
    }

    #[test]
    fn test_fecundity_declines_with_damage() {
        let repro = reproductive_output(0.05, 10, 20);
        assert!((repro[[10, 0]] - 1.0).abs() < 1e-12);
        assert!((repro[[10, 10]] - 0.5).abs() < 1e-12);
        assert!(repro[[10, 20]].abs() < 1e-12);
        assert_eq!(repro[[5, 0]], 0.0);
    }

    #[test]
    fn test_fecundity_floored_at_zero() {
        assert_eq!(fecundity(0.2, 10), 0.0);
    }
}
