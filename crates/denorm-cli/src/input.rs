//! Loading analysis inputs from disk.
//!
//! - bundle JSON: `entities`, `patterns`, `property_map` (and optionally
//!   `schema` / `telemetry` inline)
//! - SQL DDL: parsed by `denorm-ingest-sql`, replaces any inline schema
//! - telemetry JSON: replaces any inline telemetry
//! - threshold overrides: a partial JSON object merged over the mode's defaults

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::Path;

use denorm_core::{AnalysisInput, ProductionTelemetry, RelationalSchema, Thresholds};

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {what} {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {what} {}", path.display()))
}

pub fn load_bundle(path: &Path) -> Result<AnalysisInput> {
    read_json(path, "bundle")
}

pub fn load_telemetry(path: &Path) -> Result<ProductionTelemetry> {
    read_json(path, "telemetry")
}

pub fn load_schema(path: &Path) -> Result<RelationalSchema> {
    let sql =
        fs::read_to_string(path).with_context(|| format!("reading DDL {}", path.display()))?;
    denorm_ingest_sql::parse_sql_ddl(&sql).with_context(|| format!("parsing DDL {}", path.display()))
}

/// Assemble one run's input; files given explicitly win over inline sections.
pub fn assemble_input(
    bundle: &Path,
    schema: Option<&Path>,
    telemetry: Option<&Path>,
) -> Result<AnalysisInput> {
    let mut input = load_bundle(bundle)?;
    if let Some(path) = schema {
        input.schema = Some(load_schema(path)?);
    }
    if let Some(path) = telemetry {
        input.telemetry = Some(load_telemetry(path)?);
    }
    tracing::debug!(
        entities = input.entities.len(),
        patterns = input.patterns.len(),
        schema = input.schema.is_some(),
        telemetry = input.telemetry.is_some(),
        "input assembled"
    );
    Ok(input)
}

/// Merge a partial threshold object over `base`.
pub fn apply_threshold_overrides(base: &Thresholds, overrides: Value) -> Result<Thresholds> {
    let mut merged = serde_json::to_value(base)?;
    let fields = merged
        .as_object_mut()
        .ok_or_else(|| anyhow!("thresholds did not serialize to an object"))?;
    let Value::Object(overrides) = overrides else {
        return Err(anyhow!("threshold config must be a JSON object"));
    };

    for (key, value) in overrides {
        if !fields.contains_key(&key) {
            tracing::warn!(field = %key, "ignoring unknown threshold");
            continue;
        }
        fields.insert(key, value);
    }
    serde_json::from_value(merged).context("invalid threshold value")
}

pub fn load_threshold_overrides(base: &Thresholds, path: &Path) -> Result<Thresholds> {
    let overrides: Value = read_json(path, "threshold config")?;
    apply_threshold_overrides(base, overrides)
}
