//! Golden-section search over the hormone lattice.
//!
//! The search assumes the objective is unimodal in `h` (a single interior
//! maximum, possibly at an end point). On a multimodal row it returns a
//! local maximum without noticing. [`UnimodalityAudit`] compares the search
//! against an exhaustive scan and is meant for diagnostics and tests.

use serde::{Deserialize, Serialize};

/// Inverse of the golden ratio
pub const INV_PHI: f64 = 0.618_033_988_749_894_9;

/// Lattice point maximising `fitness` over `0..=max_h`.
///
/// The bracket `[lhs, rhs]` starts at the full range; its two interior
/// points sit at the inverse-golden-ratio split and the side with the
/// lower interior value is dropped until the points meet or cross.
pub fn golden_section_argmax<F>(max_h: usize, fitness: F) -> usize
where
    F: Fn(usize) -> f64,
{
    let split = |from: usize, to: usize| ((to - from) as f64 * INV_PHI).round() as usize;

    let mut lhs = 0usize;
    let mut rhs = max_h;
    let mut x1 = rhs - split(lhs, rhs);
    let mut x2 = lhs + split(lhs, rhs);

    while x1 < x2 {
        if fitness(x1) < fitness(x2) {
            lhs = x1;
            x1 = x2;
            x2 = rhs - split(x1, rhs);
        } else {
            rhs = x2;
            x2 = x1;
            x1 = lhs + split(lhs, x2);
        }
    }

    x1
}

/// Exhaustive argmax; the first index wins ties
pub fn scan_argmax<F>(max_h: usize, fitness: F) -> usize
where
    F: Fn(usize) -> f64,
{
    let mut best = 0;
    let mut best_value = fitness(0);
    for h in 1..=max_h {
        let value = fitness(h);
        if value > best_value {
            best = h;
            best_value = value;
        }
    }
    best
}

/// Running comparison of golden-section results against full scans
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UnimodalityAudit {
    /// Rows compared
    pub rows_checked: u64,
    /// Rows where the search fell short of the scan maximum
    pub mismatches: u64,
    /// Largest fitness shortfall seen
    pub worst_shortfall: f64,
}

impl UnimodalityAudit {
    /// Shortfall below which the search counts as exact
    pub const TOLERANCE: f64 = 1e-12;

    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a search result with the exhaustive maximum of the same row
    pub fn check<F>(&mut self, max_h: usize, fitness: F, found: usize) -> bool
    where
        F: Fn(usize) -> f64,
    {
        let best = scan_argmax(max_h, &fitness);
        let shortfall = fitness(best) - fitness(found);
        self.rows_checked += 1;
        if shortfall > Self::TOLERANCE {
            self.mismatches += 1;
            self.worst_shortfall = self.worst_shortfall.max(shortfall);
            false
        } else {
            true
        }
    }

    pub fn merge(&mut self, other: &UnimodalityAudit) {
        self.rows_checked += other.rows_checked;
        self.mismatches += other.mismatches;
        self.worst_shortfall = self.worst_shortfall.max(other.worst_shortfall);
    }

    pub fn is_clean(&self) -> bool {
        self.mismatches == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_interior_peak() {
        for &max_h in &[10usize, 20, 50, 100, 500] {
            for peak in 0..=max_h {
                let found = golden_section_argmax(max_h, |h| -((h as f64 - peak as f64).powi(2)));
                let error = (found as i64 - peak as i64).abs();
                assert!(error <= 1, "max_h {} peak {} found {}", max_h, peak, found);
            }
        }
    }

    #[test]
    fn test_finds_tent_peak() {
        let max_h = 500;
        for peak in [0usize, 1, 37, 150, 250, 499, 500] {
            let found = golden_section_argmax(max_h, |h| -(h as f64 - peak as f64).abs());
            assert!((found as i64 - peak as i64).abs() <= 1);
        }
    }

    #[test]
    fn test_tiny_ranges() {
        assert_eq!(golden_section_argmax(0, |_| 1.0), 0);
        assert_eq!(golden_section_argmax(1, |h| h as f64), 1);
        assert_eq!(golden_section_argmax(1, |h| -(h as f64)), 0);
    }

    #[test]
    fn test_scan_argmax() {
        let values = [0.1, 0.5, 0.9, 0.9, 0.2];
        assert_eq!(scan_argmax(4, |h| values[h]), 2);
    }

    #[test]
    fn test_audit_flags_local_maximum() {
        // Two peaks: a low one near 10 and the global one near 90
        let row: Vec<f64> = (0..=100)
            .map(|h| {
                let h = h as f64;
                (-(h - 10.0).powi(2) / 20.0).exp() + 2.0 * (-(h - 90.0).powi(2) / 20.0).exp()
            })
            .collect();

        let mut audit = UnimodalityAudit::new();
        assert!(!audit.check(100, |h| row[h], 10));
        assert!(audit.check(100, |h| row[h], 90));
        assert_eq!(audit.rows_checked, 2);
        assert_eq!(audit.mismatches, 1);
        assert!(audit.worst_shortfall > 0.5);
    }
}
