//! Property-based tests for the scoring engine
//!
//! Uses proptest for:
//! 1. Read/write ratios are always finite
//! 2. Priority scores are never negative
//! 3. Ranking is a stable descending sort
//! 4. Co-access retention is exclusive at the threshold
//! 5. Entities without signals never become candidates

use denorm_core::profile::read_write_ratio;
use denorm_core::result::rank_candidates;
use denorm_core::scoring::{priority_breakdown, PriorityBreakdown};
use denorm_core::telemetry::frequent_table_combinations;
use denorm_core::*;
use proptest::prelude::*;
use std::collections::BTreeSet;

// ============================================================================
// Strategies
// ============================================================================

fn entity_name_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{2,10}".prop_map(|s| s)
}

fn pattern_kind_strategy() -> impl Strategy<Value = PatternKind> {
    prop_oneof![
        Just(PatternKind::SingleLookup),
        Just(PatternKind::FilteredLookup),
        Just(PatternKind::CollectionScan),
        Just(PatternKind::EagerLoad),
        Just(PatternKind::MultiLevelEagerLoad),
        Just(PatternKind::Pagination),
        Just(PatternKind::Mutation),
    ]
}

fn profile_strategy() -> impl Strategy<Value = EntityUsageProfile> {
    (
        0u64..100_000,
        0u64..100_000,
        0u64..10_000,
        0u64..1_000_000,
        0u32..20,
        0usize..5,
        any::<bool>(),
        proptest::collection::btree_set("[A-Z][a-z]{2,6}", 0..8),
    )
        .prop_map(
            |(reads, writes, eager, production, multi, m2m, circular, loaded)| EntityUsageProfile {
                entity_name: "Subject".to_string(),
                table_name: "subject".to_string(),
                read_count: reads,
                write_count: writes,
                eager_loading_count: eager,
                production_execution_count: production,
                multi_level_patterns: multi,
                many_to_many_navigations: m2m,
                has_circular_reference: circular,
                always_loaded_with: loaded,
                ..Default::default()
            },
        )
}

fn candidate(name: String, score: f64) -> DenormalizationCandidate {
    DenormalizationCandidate {
        primary_entity: name,
        related_entities: BTreeSet::new(),
        complexity: ComplexityClass::Low,
        complexity_score: 0,
        priority_score: score,
        priority: PriorityBreakdown::default(),
        target: TargetParadigm::KeyValue,
        target_reason: String::new(),
        fired_rules: Vec::new(),
        reason: String::new(),
    }
}

// ============================================================================
// Invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn ratio_is_always_finite(reads in any::<u64>(), writes in any::<u64>()) {
        let ratio = read_write_ratio(reads, writes);
        prop_assert!(ratio.is_finite());
        prop_assert!(ratio >= 0.0);
        if writes == 0 {
            prop_assert_eq!(ratio, reads as f64);
        }
    }

    #[test]
    fn priority_never_negative(profile in profile_strategy()) {
        let breakdown = priority_breakdown(&profile, &AnalysisConfig::discovery());
        prop_assert!(breakdown.total() >= 0.0);
        prop_assert!(breakdown.total() <= scoring::MAX_THEORETICAL_PRIORITY);
    }

    #[test]
    fn ranking_is_stable_descending(scores in proptest::collection::vec(0u8..10, 0..30)) {
        let mut candidates: Vec<DenormalizationCandidate> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| candidate(format!("E{i}"), f64::from(*s)))
            .collect();
        rank_candidates(&mut candidates);

        for pair in candidates.windows(2) {
            prop_assert!(pair[0].priority_score >= pair[1].priority_score);
            if pair[0].priority_score == pair[1].priority_score {
                let a: usize = pair[0].primary_entity[1..].parse().unwrap();
                let b: usize = pair[1].primary_entity[1..].parse().unwrap();
                prop_assert!(a < b);
            }
        }
    }

    #[test]
    fn co_access_boundary_is_exclusive(total in 0u64..1_000, threshold in 0u64..1_000) {
        let telemetry = ProductionTelemetry {
            queries: vec![ProductionQuery::new(OperationKind::Read, ["a", "b"], total)],
            ..Default::default()
        };
        let combos = frequent_table_combinations(&telemetry, threshold);
        prop_assert_eq!(combos.len() == 1, total > threshold);
    }

    #[test]
    fn entities_without_signals_are_never_candidates(
        quiet in entity_name_strategy(),
        kinds in proptest::collection::vec(pattern_kind_strategy(), 0..10),
    ) {
        let busy = format!("{quiet}Busy");
        let input = AnalysisInput {
            entities: vec![EntityModel::new(quiet.clone()), EntityModel::new(busy.clone())],
            patterns: kinds
                .into_iter()
                .map(|k| QueryPattern::new(k, format!("{busy}.Things"), 500))
                .collect(),
            ..Default::default()
        };
        let result = analyze(&input, &AnalysisConfig::discovery()).unwrap();
        let profile = result.profiles().get(&quiet).unwrap();
        prop_assert_eq!(profile.read_count, 0);
        prop_assert_eq!(profile.eager_loading_count, 0);
        prop_assert!(result.candidate(&quiet).is_none());
    }
}
