//! Denorm core: usage-pattern correlation and denormalization candidate scoring
//!
//! Reconciles four independently extracted signals about a relational
//! application into one profile per entity, then ranks which entities should
//! become single items in a non-relational store.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        ANALYSIS PIPELINE                             │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │  Phase A (single writer, owns ProfileAggregate)                      │
//! │  ┌───────────────┐   ┌───────────────┐   ┌────────────────────┐      │
//! │  │ Profile       │──►│ Relationship  │──►│ Telemetry          │      │
//! │  │ Builder       │   │ Correlator    │   │ Integrator (opt.)  │      │
//! │  └───────────────┘   └───────────────┘   └─────────┬──────────┘      │
//! │   entities+patterns   schema+navigations           │ freeze()        │
//! │                                                    ▼                 │
//! │  Phase B (read-only ProfileCatalog, parallel per entity)             │
//! │  ┌───────────────┐   ┌───────────────┐   ┌────────────────────┐      │
//! │  │ Candidate     │──►│ Target        │──►│ Result             │      │
//! │  │ Scorer        │   │ Selector      │   │ Assembler (rank)   │      │
//! │  └───────────────┘   └───────────────┘   └────────────────────┘      │
//! │                                                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Signals
//! - **Navigation graph**: entity models and their navigation properties
//! - **Query-access shape**: declarative query patterns and their frequency
//! - **Schema cardinality**: relationships derived from the relational schema
//! - **Production telemetry**: co-access and read/write mix (optional)

pub mod builder;
pub mod config;
pub mod correlate;
pub mod error;
pub mod model;
pub mod profile;
pub mod result;
pub mod scoring;
pub mod target;
pub mod telemetry;


use serde::{Deserialize, Serialize};

pub use builder::PropertyMap;
pub use config::{AlwaysLoadedPolicy, AnalysisConfig, CandidacyMode, Thresholds};
pub use error::{AnalysisError, Result};
pub use model::{
    Cardinality, ColumnInfo, EntityModel, IndexInfo, NavigationRelationship, PatternKind,
    QueryDetail, QueryPattern, RelationalSchema, SchemaRelationship, TableInfo,
};
pub use profile::{EntityUsageProfile, ProfileAggregate, ProfileCatalog};
pub use result::{AnalysisResult, ComplexitySummary};
pub use scoring::{CandidacyRule, ComplexityClass, DenormalizationCandidate, RuleFiring};
pub use target::TargetParadigm;
pub use telemetry::{OperationKind, ProductionQuery, ProductionTelemetry, TelemetryInsights};

/// Everything one analysis run consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisInput {
    pub entities: Vec<EntityModel>,
    pub patterns: Vec<QueryPattern>,
    pub property_map: PropertyMap,
    pub schema: Option<RelationalSchema>,
    pub telemetry: Option<ProductionTelemetry>,
}

/// Runs the pipeline with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Phase A: builds, correlates and (optionally) enriches the profiles.
    pub fn build_profiles(
        &self,
        input: &AnalysisInput,
    ) -> (ProfileAggregate, Option<TelemetryInsights>) {
        let mut agg = ProfileAggregate::from_entities(&input.entities);
        builder::fold_query_patterns(&mut agg, &input.patterns, &input.property_map, &self.config);
        correlate::correlate(&mut agg, input.schema.as_ref());
        let insights =
            telemetry::integrate_telemetry(&mut agg, input.telemetry.as_ref(), &self.config.thresholds);
        (agg, insights)
    }

    pub fn analyze(&self, input: &AnalysisInput) -> AnalysisResult {
        let (agg, insights) = self.build_profiles(input);
        let catalog = agg.freeze();

        let schema = input.schema.as_ref();
        let candidates = scoring::score_candidates(&catalog, schema, &self.config);
        let complexity = ComplexitySummary::from_scores(scoring::complexity_scores(&catalog, schema));

        tracing::info!(
            entities = catalog.len(),
            candidates = candidates.len(),
            telemetry = insights.is_some(),
            "denormalization analysis complete"
        );
        AnalysisResult::assemble(catalog, candidates, complexity, insights)
    }
}

/// Validates `config` and runs one analysis.
pub fn analyze(input: &AnalysisInput, config: &AnalysisConfig) -> Result<AnalysisResult> {
    Ok(Analyzer::new(config.clone())?.analyze(input))
}
