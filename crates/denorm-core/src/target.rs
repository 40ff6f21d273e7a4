//! Target paradigm selection.

use serde::{Deserialize, Serialize};

use crate::profile::EntityUsageProfile;

/// Storage paradigm recommended for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetParadigm {
    /// Wide-column / key-value.
    KeyValue,
    Document,
    Graph,
}

impl TargetParadigm {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetParadigm::KeyValue => "key-value",
            TargetParadigm::Document => "document",
            TargetParadigm::Graph => "graph",
        }
    }
}

impl std::fmt::Display for TargetParadigm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Always-loaded entity count above which the aggregate is a document.
pub const DOCUMENT_ALWAYS_LOADED_LIMIT: usize = 2;
/// Key-value items may embed at most this many always-loaded entities.
pub const KEY_VALUE_ALWAYS_LOADED_LIMIT: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetSelection {
    pub paradigm: TargetParadigm,
    pub reason: &'static str,
}

fn is_embedded_aggregate(p: &EntityUsageProfile) -> bool {
    p.always_loaded_count() > DOCUMENT_ALWAYS_LOADED_LIMIT || p.has_nested_eager_load
}

fn is_relationship_centric(p: &EntityUsageProfile) -> bool {
    p.many_to_many_navigations > 1 || p.has_graph_shape()
}

fn is_key_addressable(p: &EntityUsageProfile) -> bool {
    p.has_simple_key_access() && p.always_loaded_count() <= KEY_VALUE_ALWAYS_LOADED_LIMIT
}

type TargetRule = (TargetParadigm, &'static str, fn(&EntityUsageProfile) -> bool);

/// Evaluated in order; the first matching rule wins.
const TARGET_RULES: [TargetRule; 3] = [
    (
        TargetParadigm::Document,
        "embedded aggregate: several always-loaded entities or nested eager loading",
        is_embedded_aggregate,
    ),
    (
        TargetParadigm::Graph,
        "relationship-centric: many-to-many navigations or graph-shaped references",
        is_relationship_centric,
    ),
    (
        TargetParadigm::KeyValue,
        "simple key-based access with at most one embedded entity",
        is_key_addressable,
    ),
];

pub fn select_target(profile: &EntityUsageProfile) -> TargetSelection {
    TARGET_RULES
        .iter()
        .find(|(_, _, matches)| matches(profile))
        .map(|&(paradigm, reason, _)| TargetSelection { paradigm, reason })
        .unwrap_or(TargetSelection {
            paradigm: TargetParadigm::KeyValue,
            reason: "default",
        })
}
