//! Running score for the current level
//!
//! Strictly additive; a level reload builds a fresh tracker.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreTracker {
    total: u64,
}

impl ScoreTracker {
    pub fn new() -> Self {
        Self { total: 0 }
    }

    /// Add points and return the new total
    pub fn add_points(&mut self, points: u32) -> u64 {
        self.total = self.total.saturating_add(u64::from(points));
        self.total
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Text for the score display
    pub fn display(&self) -> String {
        format!("SCORE {}", self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_add_points_accumulates() {
        let mut score = ScoreTracker::new();
        score.add_points(50);
        assert_eq!(score.add_points(100), 150);
        assert_eq!(score.total(), 150);
        assert_eq!(score.display(), "SCORE 150");
    }

    proptest! {
        #[test]
        fn prop_total_is_sum_and_never_decreases(awards in prop::collection::vec(0u32..10_000, 0..64)) {
            let mut score = ScoreTracker::new();
            let mut previous = 0u64;
            for &points in &awards {
                let total = score.add_points(points);
                prop_assert!(total >= previous);
                previous = total;
            }
            let expected: u64 = awards.iter().map(|&p| u64::from(p)).sum();
            prop_assert_eq!(score.total(), expected);
        }
    }
}
