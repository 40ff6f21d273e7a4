//! Analysis configuration.
//!
//! Two named default sets exist: `discovery` casts a wide net (any eager load
//! makes an entity a candidate) and `conservative` only flags entities with
//! strong, frequent signals. Loading these values from disk is the caller's
//! concern; every field has a serde default so partial files work.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Named numeric thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Eager-load count a conservative run requires for candidacy.
    pub high_frequency: u64,
    /// Frequency above which an eager-load target joins the always-loaded set.
    pub medium_frequency: u64,
    pub high_read_write_ratio: f64,
    /// Co-access totals must be strictly above this.
    pub co_access: u64,
    pub high_production_execution: u64,
    /// Multi-level eager-load patterns must exceed this count.
    pub complex_query_minimum: u32,
    pub slow_query_ms: f64,
    /// Reads required before a read/write ratio is trusted.
    pub min_read_sample: u64,
}

impl Thresholds {
    pub fn discovery() -> Self {
        Self {
            high_frequency: 100,
            medium_frequency: 50,
            high_read_write_ratio: 10.0,
            co_access: 100,
            high_production_execution: 1_000,
            complex_query_minimum: 0,
            slow_query_ms: 1_000.0,
            min_read_sample: 10,
        }
    }

    pub fn conservative() -> Self {
        Self {
            high_frequency: 50,
            medium_frequency: 20,
            high_read_write_ratio: 5.0,
            co_access: 50,
            high_production_execution: 500,
            complex_query_minimum: 2,
            slow_query_ms: 500.0,
            min_read_sample: 100,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("high_read_write_ratio", self.high_read_write_ratio),
            ("slow_query_ms", self.slow_query_ms),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AnalysisError::InvalidThreshold { name, value });
            }
        }
        if self.medium_frequency > self.high_frequency {
            tracing::warn!(
                medium = self.medium_frequency,
                high = self.high_frequency,
                "medium frequency threshold exceeds the high frequency threshold"
            );
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::discovery()
    }
}

/// How the eager-loading candidacy rule reads the eager-load count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidacyMode {
    /// Any eager loading qualifies; no multi-level minimum.
    #[default]
    Discovery,
    /// Eager loading must exceed `high_frequency`; multi-level patterns must
    /// exceed `complex_query_minimum`.
    Conservative,
}

/// How eager-load targets enter an entity's always-loaded set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlwaysLoadedPolicy {
    /// Explicit join lists count unconditionally; a path-derived target only
    /// counts above `medium_frequency`.
    #[default]
    JoinedEntities,
    /// Every target, explicit or path-derived, must be above `medium_frequency`.
    FrequencyGated,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub thresholds: Thresholds,
    pub candidacy: CandidacyMode,
    pub always_loaded: AlwaysLoadedPolicy,
}

impl AnalysisConfig {
    pub fn discovery() -> Self {
        Self::default()
    }

    pub fn conservative() -> Self {
        Self {
            thresholds: Thresholds::conservative(),
            candidacy: CandidacyMode::Conservative,
            always_loaded: AlwaysLoadedPolicy::FrequencyGated,
        }
    }

    /// Minimum multi-level eager-load count the complex-query rule must exceed.
    pub fn effective_complex_query_minimum(&self) -> u32 {
        match self.candidacy {
            CandidacyMode::Discovery => 0,
            CandidacyMode::Conservative => self.thresholds.complex_query_minimum,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()
    }
}
