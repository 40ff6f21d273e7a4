//! Result assembly.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::profile::ProfileCatalog;
use crate::scoring::{ComplexityClass, DenormalizationCandidate};
use crate::target::TargetParadigm;
use crate::telemetry::TelemetryInsights;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplexitySummary {
    pub entity_scores: BTreeMap<String, u32>,
    pub total_score: u64,
    pub average_score: f64,
    /// Class of the average entity score.
    pub overall: ComplexityClass,
}

impl ComplexitySummary {
    pub fn from_scores(entity_scores: BTreeMap<String, u32>) -> Self {
        let total_score: u64 = entity_scores.values().map(|&s| u64::from(s)).sum();
        let average_score = if entity_scores.is_empty() {
            0.0
        } else {
            total_score as f64 / entity_scores.len() as f64
        };
        let overall = ComplexityClass::from_score(average_score.round() as u32);
        Self {
            entity_scores,
            total_score,
            average_score,
            overall,
        }
    }
}

/// Highest priority first. `sort_by` is stable, so equal scores keep their
/// incoming order.
pub fn rank_candidates(candidates: &mut [DenormalizationCandidate]) {
    candidates.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
}

/// Output of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    profiles: ProfileCatalog,
    candidates: Vec<DenormalizationCandidate>,
    complexity: ComplexitySummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    telemetry: Option<TelemetryInsights>,
}

impl AnalysisResult {
    pub fn assemble(
        profiles: ProfileCatalog,
        mut candidates: Vec<DenormalizationCandidate>,
        complexity: ComplexitySummary,
        telemetry: Option<TelemetryInsights>,
    ) -> Self {
        rank_candidates(&mut candidates);
        Self {
            profiles,
            candidates,
            complexity,
            telemetry,
        }
    }

    pub fn profiles(&self) -> &ProfileCatalog {
        &self.profiles
    }

    /// Candidates by descending priority.
    pub fn candidates(&self) -> &[DenormalizationCandidate] {
        &self.candidates
    }

    pub fn candidate(&self, entity: &str) -> Option<&DenormalizationCandidate> {
        self.candidates.iter().find(|c| c.primary_entity == entity)
    }

    pub fn complexity(&self) -> &ComplexitySummary {
        &self.complexity
    }

    pub fn telemetry(&self) -> Option<&TelemetryInsights> {
        self.telemetry.as_ref()
    }

    pub fn candidates_by_target(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for c in &self.candidates {
            *counts.entry(c.target.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn count_for(&self, target: TargetParadigm) -> usize {
        self.candidates.iter().filter(|c| c.target == target).count()
    }
}
