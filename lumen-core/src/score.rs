// Severity-weighted scoring of aggregate impact counts

use crate::decode::{ImpactLevel, Violation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactCounts {
    pub total_issues: u64,
    pub critical: u64,
    pub serious: u64,
    pub moderate: u64,
    pub minor: u64,
    pub none: u64,
}

impl ImpactCounts {
    pub fn get(&self, level: ImpactLevel) -> u64 {
        match level {
            ImpactLevel::Critical => self.critical,
            ImpactLevel::Serious => self.serious,
            ImpactLevel::Moderate => self.moderate,
            ImpactLevel::Minor => self.minor,
            ImpactLevel::None => self.none,
        }
    }

    /// Add `count` issues at `level`, keeping `total_issues` in step.
    pub fn add(&mut self, level: ImpactLevel, count: u64) {
        let slot = match level {
            ImpactLevel::Critical => &mut self.critical,
            ImpactLevel::Serious => &mut self.serious,
            ImpactLevel::Moderate => &mut self.moderate,
            ImpactLevel::Minor => &mut self.minor,
            ImpactLevel::None => &mut self.none,
        };
        *slot += count;
        self.total_issues += count;
    }

    pub fn record(&mut self, violation: &Violation) {
        self.add(violation.impact, violation.issue_count());
    }

    pub fn record_all<'a>(&mut self, violations: impl IntoIterator<Item = &'a Violation>) {
        for violation in violations {
            self.record(violation);
        }
    }
}

/// Penalty weights and normalizing constants of the score formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub critical: f64,
    pub serious: f64,
    pub moderate: f64,
    pub minor: f64,
    pub none: f64,
    /// Audit units added to `total_issues` so the denominator is never zero.
    pub baseline: u64,
    /// Divisor applied per audit unit; the largest weight by default.
    pub normalizer: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            critical: 5.0,
            serious: 3.0,
            moderate: 2.0,
            minor: 1.0,
            none: 0.0,
            baseline: 10,
            normalizer: 5.0,
        }
    }
}

impl ScoreWeights {
    pub fn weight(&self, level: ImpactLevel) -> f64 {
        match level {
            ImpactLevel::Critical => self.critical,
            ImpactLevel::Serious => self.serious,
            ImpactLevel::Moderate => self.moderate,
            ImpactLevel::Minor => self.minor,
            ImpactLevel::None => self.none,
        }
    }

    pub fn penalty(&self, counts: &ImpactCounts) -> f64 {
        ImpactLevel::ALL
            .iter()
            .map(|level| counts.get(*level) as f64 * self.weight(*level))
            .sum()
    }
}

/// Score with the default weights.
pub fn score(counts: &ImpactCounts) -> f64 {
    score_with(counts, &ScoreWeights::default())
}

/// `max(0, round1(100 - penalty / (audit_base * normalizer) * 100))` where
/// `audit_base = total_issues + baseline`. Returns 100 when the denominator
/// would be zero.
pub fn score_with(counts: &ImpactCounts, weights: &ScoreWeights) -> f64 {
    let audit_base = counts.total_issues + weights.baseline;
    if audit_base == 0 || weights.normalizer <= 0.0 {
        return 100.0;
    }

    let ratio = weights.penalty(counts) / (audit_base as f64 * weights.normalizer);
    let rounded = ((100.0 - ratio * 100.0) * 10.0).round() / 10.0;
    if rounded > 0.0 { rounded } else { 0.0 }
}
