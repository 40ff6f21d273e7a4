//! Relationship derivation
//!
//! Turns raw foreign keys into cardinality-tagged relationships:
//! - FK columns exactly covered by the PK or a UNIQUE constraint -> ONE_TO_ONE
//! - any other FK -> MANY_TO_ONE
//! - pure junction tables -> an extra MANY_TO_MANY edge between the two targets

use std::collections::BTreeSet;

use denorm_core::model::{Cardinality, SchemaRelationship, TableInfo};

use crate::{DdlFacts, ForeignKey};

/// Non-key columns a junction table may carry and still count as pure.
const AUDIT_COLUMNS: &[&str] = &[
    "created_at",
    "updated_at",
    "created_on",
    "updated_on",
    "created",
    "modified",
    "modified_at",
    "inserted_at",
];

fn column_set(cols: &[String]) -> BTreeSet<String> {
    cols.iter().map(|c| c.to_ascii_lowercase()).collect()
}

fn is_exactly_unique(fk: &ForeignKey, facts: &DdlFacts) -> bool {
    let fk_cols = column_set(&fk.from_columns);
    let table = facts
        .tables
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(&fk.from_table));

    let pk_matches = table
        .map(|t| !t.primary_key.is_empty() && column_set(&t.primary_key) == fk_cols)
        .unwrap_or(false);

    pk_matches
        || facts
            .unique_keys
            .iter()
            .filter(|u| u.table.eq_ignore_ascii_case(&fk.from_table))
            .any(|u| column_set(&u.columns) == fk_cols)
}

/// The two foreign keys of a pure junction table, if `table` is one.
pub fn junction_keys<'a>(table: &TableInfo, fks: &[&'a ForeignKey]) -> Option<(&'a ForeignKey, &'a ForeignKey)> {
    let [a, b] = fks else {
        return None;
    };
    if a.from_columns.len() != 1 || b.from_columns.len() != 1 {
        return None;
    }

    let key_cols: BTreeSet<String> = column_set(&a.from_columns)
        .union(&column_set(&b.from_columns))
        .cloned()
        .collect();
    if key_cols.len() != 2 || column_set(&table.primary_key) != key_cols {
        return None;
    }

    let only_audit_extras = table.columns.iter().all(|c| {
        let name = c.name.to_ascii_lowercase();
        key_cols.contains(&name) || AUDIT_COLUMNS.contains(&name.as_str())
    });
    only_audit_extras.then_some((*a, *b))
}

fn edge(fk: &ForeignKey, cardinality: Cardinality) -> SchemaRelationship {
    SchemaRelationship {
        from_table: fk.from_table.clone(),
        from_column: fk.from_columns.join(","),
        to_table: fk.to_table.clone(),
        to_column: fk.to_columns.join(","),
        cardinality,
    }
}

/// Derive all schema relationships in declaration order.
pub fn derive_relationships(facts: &DdlFacts) -> Vec<SchemaRelationship> {
    let mut relationships = Vec::new();

    for fk in &facts.foreign_keys {
        let cardinality = if is_exactly_unique(fk, facts) {
            Cardinality::OneToOne
        } else {
            Cardinality::ManyToOne
        };
        relationships.push(edge(fk, cardinality));
    }

    for table in &facts.tables {
        let fks: Vec<&ForeignKey> = facts
            .foreign_keys
            .iter()
            .filter(|fk| fk.from_table.eq_ignore_ascii_case(&table.name))
            .collect();
        if let Some((a, b)) = junction_keys(table, &fks) {
            tracing::debug!(table = %table.name, left = %a.to_table, right = %b.to_table, "junction table");
            relationships.push(SchemaRelationship {
                from_table: a.to_table.clone(),
                from_column: a.to_columns.join(","),
                to_table: b.to_table.clone(),
                to_column: b.to_columns.join(","),
                cardinality: Cardinality::ManyToMany,
            });
        }
    }

    relationships
}
