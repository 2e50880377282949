//! Risk scoring: category weight, blast radius, symbol diff

use std::fmt;

use lattice_core::Category;
use lattice_indexer::SymbolChanges;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            RiskLevel::Critical
        } else if score >= 0.6 {
            RiskLevel::High
        } else if score >= 0.4 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Starting score for a change to a file of this category.
pub fn base_weight(category: Category) -> f64 {
    match category {
        Category::Model | Category::Migration => 0.9,
        Category::Dto | Category::Config => 0.8,
        Category::Route | Category::Middleware => 0.7,
        Category::Service => 0.6,
        Category::Util => 0.4,
        Category::Test => 0.1,
        Category::Unknown => 0.3,
    }
}

/// Amplification for the number of transitively affected files.
pub fn blast_radius_bonus(affected: usize) -> f64 {
    match affected {
        n if n > 20 => 0.3,
        n if n > 10 => 0.2,
        n if n > 5 => 0.1,
        _ => 0.0,
    }
}

/// Score in `[0.0, 1.0]`, rounded to two decimals.
pub fn risk_score(category: Category, affected: usize, changes: Option<&SymbolChanges>) -> f64 {
    let mut score = base_weight(category) + blast_radius_bonus(affected);
    if let Some(changes) = changes {
        if !changes.removed.is_empty() {
            score += 0.2;
        }
        if !changes.modified.is_empty() {
            score += 0.1;
        }
    }
    round2(score.min(1.0))
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
