//! Usage-profile building: folds static query patterns into profiles.

use std::collections::{BTreeSet, HashMap};

use crate::config::{AlwaysLoadedPolicy, AnalysisConfig};
use crate::model::QueryPattern;
use crate::profile::ProfileAggregate;

/// Maps a data-access-layer property name (`Orders`, `Customers`) to its entity.
pub type PropertyMap = HashMap<String, String>;

/// Counters reported after folding patterns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternFoldStats {
    pub folded: usize,
    pub unresolved: usize,
    pub malformed: usize,
}

/// Owning entity of a pattern: the first path segment when the target has a
/// prefix, otherwise the raw name through `property_map` (falling back to the
/// raw name).
pub fn resolve_owner(pattern: &QueryPattern, property_map: &PropertyMap) -> Option<String> {
    let first = *pattern.segments().first()?;
    if pattern.has_path_prefix() {
        return Some(first.to_string());
    }
    Some(
        property_map
            .get(first)
            .cloned()
            .unwrap_or_else(|| first.to_string()),
    )
}

/// Resolves a related path segment or joined-entity name seen from `owner`.
fn resolve_related(
    agg: &ProfileAggregate,
    owner: &str,
    name: &str,
    property_map: &PropertyMap,
) -> String {
    if let Some(nav) = agg
        .navigations_of(owner)
        .iter()
        .find(|n| n.property_name == name)
    {
        return nav.target_entity.clone();
    }
    if agg.contains(name) {
        return name.to_string();
    }
    property_map
        .get(name)
        .cloned()
        .unwrap_or_else(|| name.to_string())
}

/// Entities that a single eager-load pattern puts into the owner's
/// always-loaded set under `policy`.
fn always_loaded_targets(
    agg: &ProfileAggregate,
    owner: &str,
    pattern: &QueryPattern,
    property_map: &PropertyMap,
    config: &AnalysisConfig,
) -> BTreeSet<String> {
    let above_medium = pattern.frequency > config.thresholds.medium_frequency;

    let names: Vec<&str> = match (pattern.joined_entities(), config.always_loaded) {
        (Some(joined), AlwaysLoadedPolicy::JoinedEntities) => {
            joined.iter().map(String::as_str).collect()
        }
        (Some(joined), AlwaysLoadedPolicy::FrequencyGated) if above_medium => {
            joined.iter().map(String::as_str).collect()
        }
        (None, _) if above_medium => pattern.related_segment().into_iter().collect(),
        _ => Vec::new(),
    };

    names
        .into_iter()
        .map(|n| resolve_related(agg, owner, n.trim(), property_map))
        .filter(|n| !n.is_empty() && n != owner)
        .collect()
}

/// Folds every pattern into the profile of its owning entity.
///
/// Patterns whose owner has no profile are dropped; they are expected when the
/// extractor sees repositories for entities outside the analysed model.
pub fn fold_query_patterns(
    agg: &mut ProfileAggregate,
    patterns: &[QueryPattern],
    property_map: &PropertyMap,
    config: &AnalysisConfig,
) -> PatternFoldStats {
    let mut stats = PatternFoldStats::default();

    for pattern in patterns {
        let Some(owner) = resolve_owner(pattern, property_map) else {
            tracing::warn!(target_path = %pattern.target, "skipping query pattern with an empty target path");
            stats.malformed += 1;
            continue;
        };
        if !agg.contains(&owner) {
            stats.unresolved += 1;
            continue;
        }

        let kind = pattern.kind;
        let frequency = pattern.frequency;
        let nested = pattern.is_nested_eager_load();
        let loaded_with = if kind.is_eager_load() {
            always_loaded_targets(agg, &owner, pattern, property_map, config)
        } else {
            BTreeSet::new()
        };

        let Some(profile) = agg.get_mut(&owner) else {
            continue;
        };
        profile.record_access(kind, frequency);

        if kind.is_write() {
            profile.write_count = profile.write_count.saturating_add(frequency);
        } else {
            profile.read_count = profile.read_count.saturating_add(frequency);
        }
        if kind.is_eager_load() {
            profile.eager_loading_count = profile.eager_loading_count.saturating_add(frequency);
            profile.always_loaded_with.extend(loaded_with);
        }
        if nested {
            profile.multi_level_patterns = profile.multi_level_patterns.saturating_add(1);
            profile.has_nested_eager_load = true;
        }
        if let Some(detail) = &pattern.detail {
            profile
                .filter_columns
                .extend(detail.where_columns.iter().cloned());
        }
        if pattern.has_complex_predicate() {
            profile.complex_predicate_count = profile.complex_predicate_count.saturating_add(1);
        }
        stats.folded += 1;
    }

    tracing::debug!(
        folded = stats.folded,
        unresolved = stats.unresolved,
        malformed = stats.malformed,
        "folded query patterns into usage profiles"
    );
    stats
}
