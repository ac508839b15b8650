//! Belt tier selection by flow rate

use log::warn;

/// Transport tier, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tier(pub usize);

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mk{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ThroughputClassifier {
    capacities: Vec<f64>,
}

impl ThroughputClassifier {
    /// `capacities` must be ascending and non-empty.
    pub fn new(capacities: Vec<f64>) -> Self {
        debug_assert!(!capacities.is_empty());
        debug_assert!(capacities.windows(2).all(|w| w[0] <= w[1]));
        Self { capacities }
    }

    pub fn highest(&self) -> Tier {
        Tier(self.capacities.len())
    }

    pub fn capacity(&self, tier: Tier) -> f64 {
        self.capacities[tier.0 - 1]
    }

    /// Cheapest tier that carries `rate`; the top tier when none does.
    pub fn tier_for(&self, rate: f64) -> Tier {
        match self.capacities.iter().position(|&cap| cap >= rate) {
            Some(idx) => Tier(idx + 1),
            None => {
                warn!(
                    "{:.2}/min exceeds the top belt capacity of {:.2}/min",
                    rate,
                    self.capacities.last().copied().unwrap_or_default()
                );
                self.highest()
            }
        }
    }
}
