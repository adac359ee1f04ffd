//! Predation and background mortality.

use ndarray::Array1;

/// Probability that an attack kills, as a function of hormone level.
///
/// `pKilled[h] = max(0, 1 - (h / max_h)^alpha)`; a full stress response
/// (`h = max_h`) always escapes.
pub fn kill_probability(alpha: f64, max_h: usize) -> Array1<f64> {
    Array1::from_shape_fn(max_h + 1, |h| {
        let level = h as f64 / max_h as f64;
        (1.0 - level.powf(alpha)).max(0.0)
    })
}

/// Background mortality per time step, linear in damage and capped at 1
pub fn background_mortality(mu0: f64, k_mort: f64, max_d: usize) -> Array1<f64> {
    Array1::from_shape_fn(max_d + 1, |d| (mu0 + k_mort * d as f64).min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_probability_bounds() {
        for &alpha in &[0.5, 1.0, 2.0, 5.0] {
            let p = kill_probability(alpha, 500);
            assert!((p[0] - 1.0).abs() < 1e-12);
            assert!(p[500].abs() < 1e-12);
            assert!(p.iter().all(|&x| (0.0..=1.0).contains(&x)));
        }
    }

    #[test]
    fn test_kill_probability_non_increasing() {
        for &alpha in &[0.3, 1.0, 3.0] {
            let p = kill_probability(alpha, 100);
            for h in 1..=100 {
                assert!(p[h] <= p[h - 1], "alpha {} h {}", alpha, h);
            }
        }
    }

    #[test]
    fn test_kill_probability_linear() {
        let p = kill_probability(1.0, 4);
        assert!((p[1] - 0.75).abs() < 1e-12);
        assert!((p[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mortality_capped() {
        let mu = background_mortality(0.002, 0.1, 20);
        assert!((mu[0] - 0.002).abs() < 1e-12);
        assert_eq!(mu[20], 1.0);
        for d in 1..=20 {
            assert!(mu[d] >= mu[d - 1]);
            assert!((0.0..=1.0).contains(&mu[d]));
        }
    }

    #[test]
    fn test_mortality_flat_without_slope() {
        let mu = background_mortality(0.002, 0.0, 20);
        assert!(mu.iter().all(|&m| (m - 0.002).abs() < 1e-15));
    }
}
