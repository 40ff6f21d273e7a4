//! Per-entity usage profiles.
//!
//! Phase A (profile building, relationship correlation, telemetry folding)
//! writes into a [`ProfileAggregate`] it owns exclusively. Once every signal is
//! folded in, the aggregate is frozen into a [`ProfileCatalog`], which only
//! hands out shared references. Scoring works on the catalog, so nothing in
//! phase B can observe a half-merged profile.

use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::model::{Cardinality, EntityModel, NavigationRelationship, PatternKind};

/// Profiles with more always-loaded entities than this have complex relationships.
pub const COMPLEX_ALWAYS_LOADED_LIMIT: usize = 5;

/// Always-loaded entity count above which the entity looks like a graph hub.
pub const GRAPH_ALWAYS_LOADED_LIMIT: usize = 3;

/// Reads divided by writes; zero writes yields the read count.
pub fn read_write_ratio(reads: u64, writes: u64) -> f64 {
    if writes == 0 {
        reads as f64
    } else {
        reads as f64 / writes as f64
    }
}

/// Everything the engine knows about one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityUsageProfile {
    pub entity_name: String,
    pub table_name: String,

    // Static access counters (query patterns)
    pub read_count: u64,
    pub write_count: u64,
    pub eager_loading_count: u64,
    pub always_loaded_with: BTreeSet<String>,
    pub multi_level_patterns: u32,
    pub has_nested_eager_load: bool,
    pub access_by_kind: BTreeMap<PatternKind, u64>,
    pub filter_columns: BTreeSet<String>,
    pub complex_predicate_count: u32,

    // Structure (navigations + schema)
    pub related_entities: BTreeMap<String, Cardinality>,
    pub navigation_count: usize,
    pub many_to_many_navigations: usize,
    pub has_circular_reference: bool,

    // Production telemetry
    pub co_accessed: BTreeMap<String, u64>,
    pub production_execution_count: u64,
    pub production_reads: u64,
    pub production_writes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_read_write_ratio: Option<f64>,
}

impl EntityUsageProfile {
    pub fn new(model: &EntityModel) -> Self {
        Self {
            entity_name: model.name.clone(),
            table_name: model.table().to_string(),
            navigation_count: model.navigations.len(),
            many_to_many_navigations: model.many_to_many_count(),
            has_circular_reference: model.has_circular_reference(),
            ..Default::default()
        }
    }

    pub fn static_read_write_ratio(&self) -> f64 {
        read_write_ratio(self.read_count, self.write_count)
    }

    /// Production ratio when telemetry provided one, else the static ratio.
    pub fn combined_read_write_ratio(&self) -> f64 {
        self.production_read_write_ratio
            .unwrap_or_else(|| self.static_read_write_ratio())
    }

    pub fn always_loaded_count(&self) -> usize {
        self.always_loaded_with.len()
    }

    /// Most read volume goes through single or filtered-single lookups.
    pub fn has_simple_key_access(&self) -> bool {
        let mut key = 0u64;
        let mut total = 0u64;
        for (kind, volume) in &self.access_by_kind {
            if kind.is_write() {
                continue;
            }
            total = total.saturating_add(*volume);
            if kind.is_key_lookup() {
                key = key.saturating_add(*volume);
            }
        }
        total > 0 && key.saturating_mul(2) > total
    }

    pub fn has_complex_relationships(&self) -> bool {
        self.many_to_many_navigations > 1
            || self.always_loaded_count() > COMPLEX_ALWAYS_LOADED_LIMIT
    }

    pub fn has_graph_shape(&self) -> bool {
        self.has_circular_reference || self.always_loaded_count() > GRAPH_ALWAYS_LOADED_LIMIT
    }

    /// Entities whose co-access weight is strictly above `threshold`.
    pub fn co_accessed_above(&self, threshold: u64) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.co_accessed
            .iter()
            .filter(move |(_, w)| **w > threshold)
            .map(|(name, w)| (name.as_str(), *w))
    }

    pub(crate) fn record_access(&mut self, kind: PatternKind, frequency: u64) {
        let volume = self.access_by_kind.entry(kind).or_insert(0);
        *volume = volume.saturating_add(frequency);
    }
}

// ============================================================================
// Phase A: mutable aggregate
// ============================================================================

/// The owned, mutable profile set used while signals are being folded in.
#[derive(Debug, Default)]
pub struct ProfileAggregate {
    profiles: Vec<EntityUsageProfile>,
    navigations: Vec<Vec<NavigationRelationship>>,
    by_name: HashMap<String, usize>,
    by_table: HashMap<String, usize>,
    by_table_folded: HashMap<String, usize>,
}

impl ProfileAggregate {
    /// One profile per distinct, non-empty entity name. Later duplicates are
    /// dropped with a warning.
    pub fn from_entities(entities: &[EntityModel]) -> Self {
        let mut agg = Self::default();
        for model in entities {
            let name = model.name.as_str();
            if name.trim().is_empty() {
                tracing::warn!("skipping entity model with an empty name");
                continue;
            }
            if agg.by_name.contains_key(name) {
                tracing::warn!(entity = %name, "duplicate entity model; keeping the first");
                continue;
            }

            let idx = agg.profiles.len();
            let profile = EntityUsageProfile::new(model);
            agg.by_name.insert(profile.entity_name.clone(), idx);
            agg.by_table.entry(profile.table_name.clone()).or_insert(idx);
            agg.by_table_folded
                .entry(profile.table_name.to_lowercase())
                .or_insert(idx);
            agg.profiles.push(profile);
            agg.navigations.push(model.navigations.clone());
        }
        agg
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.by_name.contains_key(entity)
    }

    pub fn get(&self, entity: &str) -> Option<&EntityUsageProfile> {
        self.by_name.get(entity).map(|&i| &self.profiles[i])
    }

    pub fn get_mut(&mut self, entity: &str) -> Option<&mut EntityUsageProfile> {
        let idx = *self.by_name.get(entity)?;
        self.profiles.get_mut(idx)
    }

    pub(crate) fn navigations_of(&self, entity: &str) -> &[NavigationRelationship] {
        self.by_name
            .get(entity)
            .and_then(|&i| self.navigations.get(i))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn entity_names(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.entity_name.clone()).collect()
    }

    /// Canonical table name first, then a case-insensitive match.
    pub fn entity_for_table(&self, table: &str) -> Option<&str> {
        let table = table.trim();
        self.by_table
            .get(table)
            .or_else(|| self.by_table_folded.get(&table.to_lowercase()))
            .map(|&i| self.profiles[i].entity_name.as_str())
    }

    pub fn freeze(self) -> ProfileCatalog {
        ProfileCatalog {
            profiles: self.profiles,
            by_name: self.by_name,
        }
    }
}

// ============================================================================
// Phase B: frozen catalog
// ============================================================================

/// Read-only view over finished profiles, in entity input order.
#[derive(Debug, Clone, Default)]
pub struct ProfileCatalog {
    profiles: Vec<EntityUsageProfile>,
    by_name: HashMap<String, usize>,
}

impl ProfileCatalog {
    #[cfg(test)]
    pub(crate) fn from_profiles(profiles: Vec<EntityUsageProfile>) -> Self {
        let by_name = profiles
            .iter()
            .enumerate()
            .map(|(i, p)| (p.entity_name.clone(), i))
            .collect();
        Self { profiles, by_name }
    }

    pub fn get(&self, entity: &str) -> Option<&EntityUsageProfile> {
        self.by_name.get(entity).map(|&i| &self.profiles[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntityUsageProfile> {
        self.profiles.iter()
    }

    pub fn as_slice(&self) -> &[EntityUsageProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// True when `entity` lists `other` as always loaded with it.
    pub fn is_always_loaded_with(&self, entity: &str, other: &str) -> bool {
        self.get(entity)
            .is_some_and(|p| p.always_loaded_with.contains(other))
    }
}

impl<'a> IntoIterator for &'a ProfileCatalog {
    type Item = &'a EntityUsageProfile;
    type IntoIter = std::slice::Iter<'a, EntityUsageProfile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for ProfileCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.profiles.iter().map(|p| (&p.entity_name, p)))
    }
}
