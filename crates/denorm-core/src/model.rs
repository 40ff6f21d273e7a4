//! Input data contracts.
//!
//! These are the facts handed to the engine by the extractors that sit in
//! front of it: entity models with their navigation properties, query-access
//! patterns, and the relational schema. Everything here is plain data with
//! serde derives so the CLI can read it straight from JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Separator used in query-pattern target paths (`Customer.Orders`).
pub const PATH_SEPARATOR: char = '.';

/// Marker segment used for second-level eager loads (`Customer.nested.OrderItems`).
pub const NESTED_MARKER: &str = "nested";

// ============================================================================
// Cardinality
// ============================================================================

/// Relationship multiplicity between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    /// The same relationship seen from the other side.
    pub fn inverse(self) -> Self {
        match self {
            Cardinality::OneToOne => Cardinality::OneToOne,
            Cardinality::OneToMany => Cardinality::ManyToOne,
            Cardinality::ManyToOne => Cardinality::OneToMany,
            Cardinality::ManyToMany => Cardinality::ManyToMany,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Cardinality::OneToOne => "ONE_TO_ONE",
            Cardinality::OneToMany => "ONE_TO_MANY",
            Cardinality::ManyToOne => "MANY_TO_ONE",
            Cardinality::ManyToMany => "MANY_TO_MANY",
        }
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Entity models
// ============================================================================

/// A navigation property declared on an entity model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRelationship {
    pub property_name: String,
    pub target_entity: String,
    pub cardinality: Cardinality,
}

/// An entity model as discovered in the application's data-access layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityModel {
    pub name: String,
    /// Backing table; the entity name is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default)]
    pub navigations: Vec<NavigationRelationship>,
}

impl EntityModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            navigations: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }

    pub fn with_navigation(
        mut self,
        property_name: impl Into<String>,
        target_entity: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        self.navigations.push(NavigationRelationship {
            property_name: property_name.into(),
            target_entity: target_entity.into(),
            cardinality,
        });
        self
    }

    pub fn table(&self) -> &str {
        self.table_name.as_deref().unwrap_or(&self.name)
    }

    /// True iff any navigation points back at this entity.
    pub fn has_circular_reference(&self) -> bool {
        self.navigations.iter().any(|n| n.target_entity == self.name)
    }

    pub fn many_to_many_count(&self) -> usize {
        self.navigations
            .iter()
            .filter(|n| n.cardinality == Cardinality::ManyToMany)
            .count()
    }

    pub fn navigation_target(&self, property_name: &str) -> Option<&str> {
        self.navigations
            .iter()
            .find(|n| n.property_name == property_name)
            .map(|n| n.target_entity.as_str())
    }
}

// ============================================================================
// Query patterns
// ============================================================================

/// Shape of a declarative query access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    SingleLookup,
    FilteredLookup,
    CollectionScan,
    EagerLoad,
    MultiLevelEagerLoad,
    WhereClause,
    OrderBy,
    Aggregation,
    Pagination,
    GroupBy,
    /// Save/insert/update/delete call sites.
    Mutation,
}

impl PatternKind {
    pub fn is_eager_load(self) -> bool {
        matches!(self, PatternKind::EagerLoad | PatternKind::MultiLevelEagerLoad)
    }

    /// Key-based accesses that map onto a partition/sort key lookup.
    pub fn is_key_lookup(self) -> bool {
        matches!(self, PatternKind::SingleLookup | PatternKind::FilteredLookup)
    }

    pub fn is_write(self) -> bool {
        matches!(self, PatternKind::Mutation)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::SingleLookup => "single_lookup",
            PatternKind::FilteredLookup => "filtered_lookup",
            PatternKind::CollectionScan => "collection_scan",
            PatternKind::EagerLoad => "eager_load",
            PatternKind::MultiLevelEagerLoad => "multi_level_eager_load",
            PatternKind::WhereClause => "where_clause",
            PatternKind::OrderBy => "order_by",
            PatternKind::Aggregation => "aggregation",
            PatternKind::Pagination => "pagination",
            PatternKind::GroupBy => "group_by",
            PatternKind::Mutation => "mutation",
        }
    }
}

/// Optional detail recorded by the query-pattern extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDetail {
    /// Entities jointly materialized by the query.
    #[serde(default)]
    pub joined_entities: BTreeSet<String>,
    #[serde(default)]
    pub where_columns: BTreeSet<String>,
    #[serde(default)]
    pub complex_predicate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPattern {
    pub kind: PatternKind,
    pub target: String,
    pub frequency: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<QueryDetail>,
}

impl QueryPattern {
    pub fn new(kind: PatternKind, target: impl Into<String>, frequency: u64) -> Self {
        Self {
            kind,
            target: target.into(),
            frequency,
            detail: None,
        }
    }

    pub fn with_joins<I, S>(mut self, joined: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let detail = self.detail.get_or_insert_with(QueryDetail::default);
        detail.joined_entities.extend(joined.into_iter().map(Into::into));
        self
    }

    pub fn with_where_columns<I, S>(mut self, columns: I, complex_predicate: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let detail = self.detail.get_or_insert_with(QueryDetail::default);
        detail.where_columns.extend(columns.into_iter().map(Into::into));
        detail.complex_predicate |= complex_predicate;
        self
    }

    /// Non-empty path segments of the target.
    pub fn segments(&self) -> Vec<&str> {
        self.target
            .split(PATH_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn has_path_prefix(&self) -> bool {
        self.target.contains(PATH_SEPARATOR)
    }

    /// Second-level eager load: explicit type marker, a `nested` segment, or
    /// more than two path segments.
    pub fn is_nested_eager_load(&self) -> bool {
        if self.kind == PatternKind::MultiLevelEagerLoad {
            return true;
        }
        if !self.kind.is_eager_load() {
            return false;
        }
        let segments = self.segments();
        segments.len() > 2 || segments.iter().any(|s| *s == NESTED_MARKER)
    }

    /// The related segment reached by the first eager-load hop, skipping the
    /// nested marker.
    pub fn related_segment(&self) -> Option<&str> {
        self.segments()
            .into_iter()
            .skip(1)
            .find(|s| *s != NESTED_MARKER)
    }

    pub fn joined_entities(&self) -> Option<&BTreeSet<String>> {
        self.detail
            .as_ref()
            .map(|d| &d.joined_entities)
            .filter(|j| !j.is_empty())
    }

    pub fn has_complex_predicate(&self) -> bool {
        self.detail.as_ref().is_some_and(|d| d.complex_predicate)
    }
}

// ============================================================================
// Relational schema
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub indexes: Vec<IndexInfo>,
}

/// A relationship derived from foreign keys, uniqueness and junction shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRelationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub cardinality: Cardinality,
}

/// The relational schema contract consumed by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationalSchema {
    #[serde(default)]
    pub tables: Vec<TableInfo>,
    #[serde(default)]
    pub relationships: Vec<SchemaRelationship>,
}

/// Unicode case-insensitive name comparison.
fn same_table(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

impl RelationalSchema {
    /// Exact match first, then case-insensitive.
    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .or_else(|| self.tables.iter().find(|t| same_table(&t.name, name)))
    }

    /// Number of schema relationships touching `table` on either side.
    pub fn relationship_degree(&self, table: &str) -> usize {
        self.relationships
            .iter()
            .filter(|r| same_table(&r.from_table, table) || same_table(&r.to_table, table))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_segment_skips_nested_marker() {
        let p = QueryPattern::new(PatternKind::EagerLoad, "Customer.nested.OrderItems", 10);
        assert_eq!(p.related_segment(), Some("OrderItems"));
        assert!(p.is_nested_eager_load());

        let flat = QueryPattern::new(PatternKind::EagerLoad, "Customer.Orders", 10);
        assert_eq!(flat.related_segment(), Some("Orders"));
        assert!(!flat.is_nested_eager_load());
    }

    #[test]
    fn test_circular_reference_detection() {
        let employee = EntityModel::new("Employee")
            .with_navigation("Manager", "Employee", Cardinality::ManyToOne)
            .with_navigation("Department", "Department", Cardinality::ManyToOne);
        assert!(employee.has_circular_reference());
        assert!(!EntityModel::new("Order").has_circular_reference());
    }

    #[test]
    fn test_pattern_json_shape() {
        let json = r#"{
            "kind": "eager_load",
            "target": "Customer.Orders",
            "frequency": 150,
            "detail": { "joined_entities": ["Order"] }
        }"#;
        let p: QueryPattern = serde_json::from_str(json).unwrap();
        assert_eq!(p.kind, PatternKind::EagerLoad);
        assert_eq!(p.joined_entities().map(|j| j.len()), Some(1));

        let c: Cardinality = serde_json::from_str("\"MANY_TO_MANY\"").unwrap();
        assert_eq!(c, Cardinality::ManyToMany);
    }

    #[test]
    fn test_schema_table_lookup_folds_unicode_case() {
        let schema = RelationalSchema {
            tables: vec![TableInfo {
                name: "Übungen".to_string(),
                columns: Vec::new(),
                primary_key: Vec::new(),
                indexes: Vec::new(),
            }],
            relationships: vec![SchemaRelationship {
                from_table: "übungen".to_string(),
                from_column: "kurs_id".to_string(),
                to_table: "kurse".to_string(),
                to_column: "id".to_string(),
                cardinality: Cardinality::ManyToOne,
            }],
        };
        assert!(schema.table("ÜBUNGEN").is_some());
        assert_eq!(schema.relationship_degree("ÜBUNGEN"), 1);
        assert_eq!(schema.relationship_degree("KURSE"), 1);
    }
}
