//! Candidate scoring.
//!
//! Candidacy is an ordered list of tagged rules. Every rule is evaluated so the
//! candidate's reason lists all of them that fired; any single one is enough to
//! make an entity a candidate. Complexity and priority are additive scores
//! whose weights, caps and class bands are the constants below.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::{AnalysisConfig, CandidacyMode};
use crate::model::{Cardinality, RelationalSchema};
use crate::profile::{EntityUsageProfile, ProfileCatalog};
use crate::target::{select_target, TargetParadigm};

// ============================================================================
// Complexity
// ============================================================================

pub const NAVIGATION_WEIGHT: u32 = 5;
pub const CIRCULAR_REFERENCE_PENALTY: u32 = 15;
pub const ALWAYS_LOADED_WEIGHT: u32 = 3;
pub const MULTI_LEVEL_WEIGHT: u32 = 4;
pub const MANY_TO_MANY_WEIGHT: u32 = 10;
pub const COLUMN_COUNT_CAP: u32 = 20;
pub const INDEX_WEIGHT: u32 = 2;
pub const RELATIONSHIP_DEGREE_WEIGHT: u32 = 3;

/// Highest score still classed LOW.
pub const LOW_COMPLEXITY_MAX: u32 = 20;
/// Highest score still classed MEDIUM.
pub const MEDIUM_COMPLEXITY_MAX: u32 = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplexityClass {
    #[default]
    Low,
    Medium,
    High,
}

impl ComplexityClass {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=LOW_COMPLEXITY_MAX => ComplexityClass::Low,
            s if s <= MEDIUM_COMPLEXITY_MAX => ComplexityClass::Medium,
            _ => ComplexityClass::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComplexityClass::Low => "LOW",
            ComplexityClass::Medium => "MEDIUM",
            ComplexityClass::High => "HIGH",
        }
    }
}

impl std::fmt::Display for ComplexityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn clamp_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Structural migration difficulty of one entity. Schema density terms are
/// added only when the entity's table is present in `schema`.
pub fn complexity_score(profile: &EntityUsageProfile, schema: Option<&RelationalSchema>) -> u32 {
    let mut score = clamp_u32(profile.navigation_count).saturating_mul(NAVIGATION_WEIGHT);
    if profile.has_circular_reference {
        score = score.saturating_add(CIRCULAR_REFERENCE_PENALTY);
    }
    score = score
        .saturating_add(clamp_u32(profile.always_loaded_count()).saturating_mul(ALWAYS_LOADED_WEIGHT))
        .saturating_add(profile.multi_level_patterns.saturating_mul(MULTI_LEVEL_WEIGHT))
        .saturating_add(clamp_u32(profile.many_to_many_navigations).saturating_mul(MANY_TO_MANY_WEIGHT));

    if let Some(schema) = schema {
        if let Some(table) = schema.table(&profile.table_name) {
            score = score
                .saturating_add(clamp_u32(table.columns.len()).min(COLUMN_COUNT_CAP))
                .saturating_add(clamp_u32(table.indexes.len()).saturating_mul(INDEX_WEIGHT))
                .saturating_add(
                    clamp_u32(schema.relationship_degree(&table.name))
                        .saturating_mul(RELATIONSHIP_DEGREE_WEIGHT),
                );
        }
    }
    score
}

// ============================================================================
// Priority
// ============================================================================

/// Production executions per priority point.
pub const PRODUCTION_SCALE: f64 = 100.0;
pub const PRODUCTION_CAP: f64 = 25.0;
pub const CO_ACCESS_INCREMENT: f64 = 5.0;
pub const CO_ACCESS_CAP: f64 = 20.0;
/// Accesses (eager loads plus production executions) per priority point.
pub const ACCESS_FREQUENCY_SCALE: f64 = 10.0;
pub const ACCESS_FREQUENCY_CAP: f64 = 15.0;
pub const ALWAYS_LOADED_INCREMENT: f64 = 3.0;
pub const ALWAYS_LOADED_CAP: f64 = 15.0;
/// Full bonus above the high ratio threshold, half above half of it.
pub const READ_RATIO_BONUS: f64 = 10.0;
pub const COMPLEX_QUERY_INCREMENT: f64 = 2.0;
pub const COMPLEX_QUERY_CAP: f64 = 10.0;
pub const SIMPLE_ACCESS_BONUS: f64 = 10.0;
pub const COMPLEX_RELATIONSHIP_PENALTY: f64 = 10.0;
pub const CIRCULAR_PRIORITY_PENALTY: f64 = 5.0;

/// Sum of every cap and bonus. Used for calibration only; scores are not capped.
pub const MAX_THEORETICAL_PRIORITY: f64 = PRODUCTION_CAP
    + CO_ACCESS_CAP
    + ACCESS_FREQUENCY_CAP
    + ALWAYS_LOADED_CAP
    + READ_RATIO_BONUS
    + COMPLEX_QUERY_CAP
    + SIMPLE_ACCESS_BONUS;

/// Individual priority terms, kept so reports can show where a score came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PriorityBreakdown {
    pub production: f64,
    pub co_access: f64,
    pub access_frequency: f64,
    pub always_loaded: f64,
    pub read_ratio: f64,
    pub complex_queries: f64,
    pub simple_access_bonus: f64,
    pub complex_relationship_penalty: f64,
    pub circular_reference_penalty: f64,
}

impl PriorityBreakdown {
    /// Sum of terms minus penalties, never below zero.
    pub fn total(&self) -> f64 {
        let sum = self.production
            + self.co_access
            + self.access_frequency
            + self.always_loaded
            + self.read_ratio
            + self.complex_queries
            + self.simple_access_bonus
            - self.complex_relationship_penalty
            - self.circular_reference_penalty;
        sum.max(0.0)
    }
}

pub fn priority_breakdown(profile: &EntityUsageProfile, config: &AnalysisConfig) -> PriorityBreakdown {
    let t = &config.thresholds;

    let co_accessed = profile.co_accessed_above(t.co_access).count() as f64;
    let accesses = profile
        .eager_loading_count
        .saturating_add(profile.production_execution_count) as f64;

    let ratio = profile.combined_read_write_ratio();
    let read_ratio = if ratio > t.high_read_write_ratio {
        READ_RATIO_BONUS
    } else if ratio > t.high_read_write_ratio / 2.0 {
        READ_RATIO_BONUS / 2.0
    } else {
        0.0
    };

    PriorityBreakdown {
        production: (profile.production_execution_count as f64 / PRODUCTION_SCALE).min(PRODUCTION_CAP),
        co_access: (co_accessed * CO_ACCESS_INCREMENT).min(CO_ACCESS_CAP),
        access_frequency: (accesses / ACCESS_FREQUENCY_SCALE).min(ACCESS_FREQUENCY_CAP),
        always_loaded: (profile.always_loaded_count() as f64 * ALWAYS_LOADED_INCREMENT)
            .min(ALWAYS_LOADED_CAP),
        read_ratio,
        complex_queries: (f64::from(profile.multi_level_patterns) * COMPLEX_QUERY_INCREMENT)
            .min(COMPLEX_QUERY_CAP),
        simple_access_bonus: if profile.has_simple_key_access() {
            SIMPLE_ACCESS_BONUS
        } else {
            0.0
        },
        complex_relationship_penalty: if profile.has_complex_relationships() {
            COMPLEX_RELATIONSHIP_PENALTY
        } else {
            0.0
        },
        circular_reference_penalty: if profile.has_circular_reference {
            CIRCULAR_PRIORITY_PENALTY
        } else {
            0.0
        },
    }
}

// ============================================================================
// Candidacy rules
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidacyRule {
    HighProductionUsage,
    FrequentCoAccess,
    EagerLoading,
    ReadHeavy,
    ComplexQueries,
}

/// A rule that fired, with the reason rendered from the values it tested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleFiring {
    pub rule: CandidacyRule,
    pub reason: String,
}

type RuleCheck = fn(&EntityUsageProfile, &AnalysisConfig) -> Option<String>;

fn high_production_usage(p: &EntityUsageProfile, c: &AnalysisConfig) -> Option<String> {
    let limit = c.thresholds.high_production_execution;
    (p.production_execution_count > limit).then(|| {
        format!(
            "high production usage ({} executions > {limit})",
            p.production_execution_count
        )
    })
}

fn frequent_co_access(p: &EntityUsageProfile, c: &AnalysisConfig) -> Option<String> {
    let (entity, weight) = p
        .co_accessed_above(c.thresholds.co_access)
        .max_by_key(|(_, w)| *w)?;
    Some(format!(
        "frequent co-access with {entity} ({weight} executions)"
    ))
}

fn eager_loading(p: &EntityUsageProfile, c: &AnalysisConfig) -> Option<String> {
    let fired = match c.candidacy {
        CandidacyMode::Discovery => p.eager_loading_count > 0,
        CandidacyMode::Conservative => p.eager_loading_count > c.thresholds.high_frequency,
    };
    fired.then(|| format!("eager loading observed ({} loads)", p.eager_loading_count))
}

fn read_heavy(p: &EntityUsageProfile, c: &AnalysisConfig) -> Option<String> {
    let ratio = p.combined_read_write_ratio();
    (ratio > c.thresholds.high_read_write_ratio && p.read_count > c.thresholds.min_read_sample).then(
        || {
            format!(
                "read-heavy access (read/write ratio {ratio:.1} over {} reads)",
                p.read_count
            )
        },
    )
}

fn complex_queries(p: &EntityUsageProfile, c: &AnalysisConfig) -> Option<String> {
    (p.multi_level_patterns > c.effective_complex_query_minimum()).then(|| {
        format!(
            "multi-level eager loading in {} query patterns",
            p.multi_level_patterns
        )
    })
}

const CANDIDACY_RULES: [(CandidacyRule, RuleCheck); 5] = [
    (CandidacyRule::HighProductionUsage, high_production_usage),
    (CandidacyRule::FrequentCoAccess, frequent_co_access),
    (CandidacyRule::EagerLoading, eager_loading),
    (CandidacyRule::ReadHeavy, read_heavy),
    (CandidacyRule::ComplexQueries, complex_queries),
];

/// Every candidacy rule that fires for `profile`, in rule order.
pub fn evaluate_candidacy(profile: &EntityUsageProfile, config: &AnalysisConfig) -> Vec<RuleFiring> {
    CANDIDACY_RULES
        .iter()
        .filter_map(|(rule, check)| {
            check(profile, config).map(|reason| RuleFiring {
                rule: *rule,
                reason,
            })
        })
        .collect()
}

/// Entities to fold into the candidate's item.
pub fn candidate_related_entities(
    profile: &EntityUsageProfile,
    catalog: &ProfileCatalog,
    config: &AnalysisConfig,
) -> BTreeSet<String> {
    let mut related = profile.always_loaded_with.clone();

    for (entity, cardinality) in &profile.related_entities {
        let include = match cardinality {
            Cardinality::OneToOne => true,
            Cardinality::OneToMany | Cardinality::ManyToOne => {
                profile.always_loaded_with.contains(entity)
                    || catalog.is_always_loaded_with(entity, &profile.entity_name)
            }
            Cardinality::ManyToMany => false,
        };
        if include {
            related.insert(entity.clone());
        }
    }

    related.extend(
        profile
            .co_accessed_above(config.thresholds.co_access)
            .map(|(entity, _)| entity.to_string()),
    );
    related.remove(&profile.entity_name);
    related
}

// ============================================================================
// Candidates
// ============================================================================

/// A recommendation to fold `related_entities` into `primary_entity`'s item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DenormalizationCandidate {
    pub primary_entity: String,
    pub related_entities: BTreeSet<String>,
    pub complexity: ComplexityClass,
    pub complexity_score: u32,
    pub priority_score: f64,
    pub priority: PriorityBreakdown,
    pub target: TargetParadigm,
    pub target_reason: String,
    pub fired_rules: Vec<RuleFiring>,
    pub reason: String,
}

/// Scores one profile; `None` when no candidacy rule fires.
pub fn score_entity(
    profile: &EntityUsageProfile,
    catalog: &ProfileCatalog,
    schema: Option<&RelationalSchema>,
    config: &AnalysisConfig,
) -> Option<DenormalizationCandidate> {
    let fired_rules = evaluate_candidacy(profile, config);
    if fired_rules.is_empty() {
        return None;
    }

    let complexity_score = complexity_score(profile, schema);
    let priority = priority_breakdown(profile, config);
    let target = select_target(profile);
    let reason = fired_rules
        .iter()
        .map(|f| f.reason.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    Some(DenormalizationCandidate {
        primary_entity: profile.entity_name.clone(),
        related_entities: candidate_related_entities(profile, catalog, config),
        complexity: ComplexityClass::from_score(complexity_score),
        complexity_score,
        priority_score: priority.total(),
        priority,
        target: target.paradigm,
        target_reason: target.reason.to_string(),
        fired_rules,
        reason,
    })
}

/// Scores every profile in parallel; output keeps catalog order.
pub fn score_candidates(
    catalog: &ProfileCatalog,
    schema: Option<&RelationalSchema>,
    config: &AnalysisConfig,
) -> Vec<DenormalizationCandidate> {
    catalog
        .as_slice()
        .par_iter()
        .filter_map(|p| score_entity(p, catalog, schema, config))
        .collect()
}

/// Complexity score of every profile, candidate or not.
pub fn complexity_scores(
    catalog: &ProfileCatalog,
    schema: Option<&RelationalSchema>,
) -> BTreeMap<String, u32> {
    catalog
        .as_slice()
        .par_iter()
        .map(|p| (p.entity_name.clone(), complexity_score(p, schema)))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}
