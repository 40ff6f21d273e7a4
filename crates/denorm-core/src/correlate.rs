//! Relationship correlation.
//!
//! Schema relationships are applied first (both directions), then navigation
//! properties (owner side only). A navigation therefore wins over the schema
//! when both describe the same pair from the owner's side.

use crate::model::{Cardinality, RelationalSchema};
use crate::profile::ProfileAggregate;

fn link(agg: &mut ProfileAggregate, from: &str, to: &str, cardinality: Cardinality) {
    if let Some(profile) = agg.get_mut(from) {
        profile.related_entities.insert(to.to_string(), cardinality);
    }
}

/// Records every schema relationship whose tables both map to profiled
/// entities, on both sides, with the schema's cardinality.
pub fn apply_schema_relationships(agg: &mut ProfileAggregate, schema: &RelationalSchema) -> usize {
    let mut applied = 0;
    for rel in &schema.relationships {
        let (Some(from), Some(to)) = (
            agg.entity_for_table(&rel.from_table).map(str::to_string),
            agg.entity_for_table(&rel.to_table).map(str::to_string),
        ) else {
            continue;
        };
        link(agg, &from, &to, rel.cardinality);
        link(agg, &to, &from, rel.cardinality);
        applied += 1;
    }
    applied
}

/// Records each navigation whose target is profiled, on the owner only.
pub fn apply_navigation_relationships(agg: &mut ProfileAggregate) -> usize {
    let mut applied = 0;
    for entity in agg.entity_names() {
        let edges: Vec<(String, Cardinality)> = agg
            .navigations_of(&entity)
            .iter()
            .filter(|n| agg.contains(&n.target_entity))
            .map(|n| (n.target_entity.clone(), n.cardinality))
            .collect();
        for (target, cardinality) in edges {
            link(agg, &entity, &target, cardinality);
            applied += 1;
        }
    }
    applied
}

/// Schema first (when present), then navigations.
pub fn correlate(agg: &mut ProfileAggregate, schema: Option<&RelationalSchema>) {
    let schema_edges = schema.map_or(0, |s| apply_schema_relationships(agg, s));
    let navigation_edges = apply_navigation_relationships(agg);
    tracing::debug!(schema_edges, navigation_edges, "correlated entity relationships");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityModel, SchemaRelationship};

    fn rel(from: &str, to: &str, cardinality: Cardinality) -> SchemaRelationship {
        SchemaRelationship {
            from_table: from.to_string(),
            from_column: "id".to_string(),
            to_table: to.to_string(),
            to_column: "id".to_string(),
            cardinality,
        }
    }

    #[test]
    fn test_schema_edges_are_bidirectional_and_navigation_overwrites() {
        let mut agg = ProfileAggregate::from_entities(&[
            EntityModel::new("Customer")
                .with_table("customers")
                .with_navigation("Orders", "Order", Cardinality::OneToMany),
            EntityModel::new("Order").with_table("orders"),
            EntityModel::new("Tag"),
        ]);
        let schema = RelationalSchema {
            tables: Vec::new(),
            relationships: vec![
                rel("orders", "customers", Cardinality::ManyToOne),
                rel("orders", "audit_log", Cardinality::ManyToOne),
            ],
        };

        correlate(&mut agg, Some(&schema));

        let order = agg.get("Order").unwrap();
        assert_eq!(order.related_entities.get("Customer"), Some(&Cardinality::ManyToOne));
        assert_eq!(order.related_entities.len(), 1);

        // Schema wrote MANY_TO_ONE for Customer -> Order; the navigation overwrote it.
        let customer = agg.get("Customer").unwrap();
        assert_eq!(customer.related_entities.get("Order"), Some(&Cardinality::OneToMany));
        assert!(agg.get("Tag").unwrap().related_entities.is_empty());
    }

    #[test]
    fn test_navigation_to_unprofiled_target_is_ignored() {
        let mut agg = ProfileAggregate::from_entities(&[
            EntityModel::new("Post").with_navigation("Author", "User", Cardinality::ManyToOne)
        ]);
        correlate(&mut agg, None);
        assert!(agg.get("Post").unwrap().related_entities.is_empty());
    }
}
