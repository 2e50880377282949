//! Lattice Impact: blast radius, risk scoring, and breaking-change detection

pub mod analyzer;
pub mod risk;


pub use analyzer::{
    ChangeImpact, DependencyMap, FileChange, FileInfo, ImpactAnalyzer, ImpactDetails, ImpactError,
    MultiChangeImpact,
};
pub use risk::{RiskLevel, base_weight, blast_radius_bonus, risk_score};
