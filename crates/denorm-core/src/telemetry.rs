//! Production telemetry integration.
//!
//! Input is the already-typed aggregate produced by a telemetry ingester: one
//! record per normalized query with its operation kind, the tables it touches
//! and how often it ran. Two signals come out of it:
//!
//! - **co-access**: table sets touched together by the same query, kept only
//!   when their accumulated executions are strictly above the co-access
//!   threshold. These feed per-entity execution volume and pairwise weights.
//! - **read/write mix**: executions per table split by operation kind.
//!
//! Telemetry that is absent, empty, or carries no usable record leaves the
//! profiles untouched.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::Thresholds;
use crate::profile::{read_write_ratio, ProfileAggregate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Read,
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    pub fn is_write(self) -> bool {
        !matches!(self, OperationKind::Read)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Read => "read",
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

/// One normalized production query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionQuery {
    pub operation: OperationKind,
    pub tables: BTreeSet<String>,
    pub execution_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_duration_ms: Option<f64>,
    /// Normalized query text, when the ingester kept it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl ProductionQuery {
    pub fn new<I, S>(operation: OperationKind, tables: I, execution_count: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operation,
            tables: tables.into_iter().map(Into::into).collect(),
            execution_count,
            mean_duration_ms: None,
            fingerprint: None,
        }
    }

    pub fn with_duration(mut self, mean_duration_ms: f64) -> Self {
        self.mean_duration_ms = Some(mean_duration_ms);
        self
    }
}

/// Aggregates the ingester may have pre-computed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryStatistics {
    pub operation_breakdown: BTreeMap<OperationKind, u64>,
    pub table_combinations: Vec<FrequentTableCombination>,
    pub mean_duration_ms: Option<f64>,
    pub slow_query_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionTelemetry {
    pub total_queries_analyzed: u64,
    pub queries: Vec<ProductionQuery>,
    pub statistics: Option<TelemetryStatistics>,
}

impl ProductionTelemetry {
    /// At least one record touches a table and actually executed.
    pub fn is_usable(&self) -> bool {
        self.queries
            .iter()
            .any(|q| q.execution_count > 0 && !q.tables.is_empty())
    }

    pub fn grand_total(&self) -> u64 {
        self.queries
            .iter()
            .fold(0u64, |acc, q| acc.saturating_add(q.execution_count))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequentTableCombination {
    pub tables: BTreeSet<String>,
    pub total_executions: u64,
    /// Share of the telemetry's grand total, 0–100.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlowQuery {
    pub tables: BTreeSet<String>,
    pub operation: OperationKind,
    pub execution_count: u64,
    pub mean_duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// What the integrator learned, reported alongside the candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetryInsights {
    pub total_queries_analyzed: u64,
    pub total_executions: u64,
    pub operation_breakdown: BTreeMap<OperationKind, u64>,
    pub frequent_combinations: Vec<FrequentTableCombination>,
    pub slow_queries: Vec<SlowQuery>,
    /// Tables seen in telemetry with no matching entity.
    pub unresolved_tables: BTreeSet<String>,
    /// Aggregates pre-computed by the ingester, passed through as reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported: Option<TelemetryStatistics>,
}

/// Table sets touched together whose accumulated executions exceed
/// `threshold`, most executed first.
pub fn frequent_table_combinations(
    telemetry: &ProductionTelemetry,
    threshold: u64,
) -> Vec<FrequentTableCombination> {
    let mut totals: BTreeMap<&BTreeSet<String>, u64> = BTreeMap::new();
    for q in telemetry.queries.iter().filter(|q| q.tables.len() > 1) {
        let total = totals.entry(&q.tables).or_insert(0);
        *total = total.saturating_add(q.execution_count);
    }

    let grand_total = telemetry.grand_total();
    let mut combos: Vec<FrequentTableCombination> = totals
        .into_iter()
        .filter(|(_, total)| *total > threshold)
        .map(|(tables, total)| FrequentTableCombination {
            tables: tables.clone(),
            total_executions: total,
            percentage: if grand_total == 0 {
                0.0
            } else {
                total as f64 * 100.0 / grand_total as f64
            },
        })
        .collect();
    combos.sort_by(|a, b| b.total_executions.cmp(&a.total_executions));
    combos
}

fn operation_breakdown(telemetry: &ProductionTelemetry) -> BTreeMap<OperationKind, u64> {
    let mut breakdown: BTreeMap<OperationKind, u64> = BTreeMap::new();
    for q in &telemetry.queries {
        let total = breakdown.entry(q.operation).or_insert(0);
        *total = total.saturating_add(q.execution_count);
    }
    breakdown
}

fn slow_queries(telemetry: &ProductionTelemetry, slow_query_ms: f64) -> Vec<SlowQuery> {
    let mut slow: Vec<SlowQuery> = telemetry
        .queries
        .iter()
        .filter_map(|q| {
            let mean = q.mean_duration_ms?;
            (mean > slow_query_ms).then(|| SlowQuery {
                tables: q.tables.clone(),
                operation: q.operation,
                execution_count: q.execution_count,
                mean_duration_ms: mean,
                fingerprint: q.fingerprint.clone(),
            })
        })
        .collect();
    slow.sort_by(|a, b| b.mean_duration_ms.total_cmp(&a.mean_duration_ms));
    slow
}

/// Folds production telemetry into the profiles. Returns `None` (and changes
/// nothing) when the telemetry is absent or unusable.
pub fn integrate_telemetry(
    agg: &mut ProfileAggregate,
    telemetry: Option<&ProductionTelemetry>,
    thresholds: &Thresholds,
) -> Option<TelemetryInsights> {
    let telemetry = match telemetry {
        Some(t) if t.is_usable() => t,
        Some(_) => {
            tracing::debug!("telemetry has no usable records; skipping integration");
            return None;
        }
        None => return None,
    };

    let mut unresolved_tables = BTreeSet::new();
    for q in &telemetry.queries {
        if q.tables.is_empty() {
            tracing::warn!(operation = ?q.operation, "skipping telemetry record with no tables");
            continue;
        }
        for table in &q.tables {
            if agg.entity_for_table(table).is_none() {
                unresolved_tables.insert(table.clone());
            }
        }
    }

    // Co-access over retained combinations.
    let combinations = frequent_table_combinations(telemetry, thresholds.co_access);
    for combo in &combinations {
        let entities: BTreeSet<String> = combo
            .tables
            .iter()
            .filter_map(|t| agg.entity_for_table(t).map(str::to_string))
            .collect();
        for entity in &entities {
            let Some(profile) = agg.get_mut(entity) else {
                continue;
            };
            profile.production_execution_count = profile
                .production_execution_count
                .saturating_add(combo.total_executions);
            for other in entities.iter().filter(|o| *o != entity) {
                let weight = profile.co_accessed.entry(other.clone()).or_insert(0);
                *weight = weight.saturating_add(combo.total_executions);
            }
        }
    }

    // Read/write mix per table.
    let mut per_table: HashMap<&str, (u64, u64)> = HashMap::new();
    for q in &telemetry.queries {
        for table in &q.tables {
            let entry = per_table.entry(table.as_str()).or_insert((0, 0));
            if q.operation.is_write() {
                entry.1 = entry.1.saturating_add(q.execution_count);
            } else {
                entry.0 = entry.0.saturating_add(q.execution_count);
            }
        }
    }
    let mut touched = BTreeSet::new();
    for (table, (reads, writes)) in per_table {
        let Some(entity) = agg.entity_for_table(table).map(str::to_string) else {
            continue;
        };
        if let Some(profile) = agg.get_mut(&entity) {
            profile.production_reads = profile.production_reads.saturating_add(reads);
            profile.production_writes = profile.production_writes.saturating_add(writes);
            touched.insert(entity);
        }
    }
    for entity in touched {
        if let Some(profile) = agg.get_mut(&entity) {
            profile.production_read_write_ratio = Some(read_write_ratio(
                profile.production_reads,
                profile.production_writes,
            ));
        }
    }

    let total_queries_analyzed = match telemetry.total_queries_analyzed {
        0 => telemetry.queries.len() as u64,
        n => n,
    };
    tracing::debug!(
        combinations = combinations.len(),
        unresolved = unresolved_tables.len(),
        "integrated production telemetry"
    );

    Some(TelemetryInsights {
        total_queries_analyzed,
        total_executions: telemetry.grand_total(),
        operation_breakdown: operation_breakdown(telemetry),
        frequent_combinations: combinations,
        slow_queries: slow_queries(telemetry, thresholds.slow_query_ms),
        unresolved_tables,
        reported: telemetry.statistics.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityModel;
    use approx::assert_relative_eq;

    fn agg() -> ProfileAggregate {
        ProfileAggregate::from_entities(&[
            EntityModel::new("Customer").with_table("customers"),
            EntityModel::new("Order").with_table("orders"),
            EntityModel::new("Product").with_table("products"),
        ])
    }

    #[test]
    fn test_co_access_boundary_is_exclusive() {
        let telemetry = ProductionTelemetry {
            queries: vec![
                ProductionQuery::new(OperationKind::Read, ["customers", "orders"], 100),
                ProductionQuery::new(OperationKind::Read, ["orders", "products"], 101),
            ],
            ..Default::default()
        };
        let combos = frequent_table_combinations(&telemetry, 100);
        assert_eq!(combos.len(), 1);
        assert!(combos[0].tables.contains("products"));
        assert_relative_eq!(combos[0].percentage, 101.0 * 100.0 / 201.0);
    }

    #[test]
    fn test_co_access_weights_and_execution_volume() {
        let mut agg = agg();
        let telemetry = ProductionTelemetry {
            total_queries_analyzed: 3,
            queries: vec![
                ProductionQuery::new(OperationKind::Read, ["customers", "orders"], 400),
                ProductionQuery::new(OperationKind::Read, ["ORDERS", "customers"], 50),
                ProductionQuery::new(OperationKind::Update, ["orders"], 9_000),
            ],
            statistics: None,
        };
        let insights = integrate_telemetry(&mut agg, Some(&telemetry), &Thresholds::discovery())
            .expect("usable telemetry");

        // Two distinct table sets: only the 400-execution one survives.
        assert_eq!(insights.frequent_combinations.len(), 1);
        let customer = agg.get("Customer").unwrap();
        assert_eq!(customer.production_execution_count, 400);
        assert_eq!(customer.co_accessed.get("Order"), Some(&400));
        // Single-table queries never add execution volume.
        assert_eq!(agg.get("Order").unwrap().production_execution_count, 400);
        assert_eq!(insights.operation_breakdown.get(&OperationKind::Update), Some(&9_000));
    }

    #[test]
    fn test_read_write_ratio_from_telemetry() {
        let mut agg = agg();
        let telemetry = ProductionTelemetry {
            queries: vec![
                ProductionQuery::new(OperationKind::Read, ["customers"], 1021),
                ProductionQuery::new(OperationKind::Insert, ["customers"], 20),
                ProductionQuery::new(OperationKind::Delete, ["customers"], 1),
                ProductionQuery::new(OperationKind::Read, ["products"], 500),
            ],
            ..Default::default()
        };
        integrate_telemetry(&mut agg, Some(&telemetry), &Thresholds::discovery());
        let ratio = agg.get("Customer").unwrap().production_read_write_ratio.unwrap();
        assert_relative_eq!(ratio, 1021.0 / 21.0);
        assert_eq!(agg.get("Product").unwrap().production_read_write_ratio, Some(500.0));
        assert_eq!(agg.get("Order").unwrap().production_read_write_ratio, None);
    }

    #[test]
    fn test_unusable_telemetry_changes_nothing() {
        let mut agg = agg();
        let empty = ProductionTelemetry::default();
        assert!(integrate_telemetry(&mut agg, Some(&empty), &Thresholds::discovery()).is_none());

        let partial = ProductionTelemetry {
            total_queries_analyzed: 10,
            queries: vec![ProductionQuery::new(OperationKind::Read, Vec::<String>::new(), 10)],
            statistics: None,
        };
        assert!(integrate_telemetry(&mut agg, Some(&partial), &Thresholds::discovery()).is_none());
        assert!(agg.get("Customer").unwrap().production_read_write_ratio.is_none());
    }

    #[test]
    fn test_slow_queries_use_threshold() {
        let mut agg = agg();
        let telemetry = ProductionTelemetry {
            queries: vec![
                ProductionQuery::new(OperationKind::Read, ["orders"], 5).with_duration(2_500.0),
                ProductionQuery::new(OperationKind::Read, ["customers"], 5).with_duration(1_000.0),
            ],
            ..Default::default()
        };
        let insights =
            integrate_telemetry(&mut agg, Some(&telemetry), &Thresholds::discovery()).unwrap();
        assert_eq!(insights.slow_queries.len(), 1);
        assert_eq!(insights.total_queries_analyzed, 2);
    }
}
