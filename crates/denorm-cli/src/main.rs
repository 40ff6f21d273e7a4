//! Denorm CLI
//!
//! Command-line interface for:
//! - Ranking denormalization candidates from an extracted usage bundle
//!   (entities, query patterns, property map), optional SQL DDL and optional
//!   production telemetry
//! - Inspecting the relationships derived from SQL DDL

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use denorm_core::{AlwaysLoadedPolicy, AnalysisConfig, Analyzer};

mod input;
mod report;

#[derive(Parser)]
#[command(name = "denorm")]
#[command(
    author,
    version,
    about = "Denorm: denormalization candidates for relational-to-NoSQL migration"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a usage bundle and rank denormalization candidates.
    Analyze {
        /// Bundle JSON (`entities`, `patterns`, `property_map`)
        #[arg(short, long)]
        input: PathBuf,
        /// SQL DDL describing the relational schema
        #[arg(long)]
        schema: Option<PathBuf>,
        /// Production telemetry JSON
        #[arg(long)]
        telemetry: Option<PathBuf>,
        /// Partial threshold overrides (JSON object)
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Mode::Discovery)]
        mode: Mode,
        /// How eager-load targets join the always-loaded set
        #[arg(long, value_enum)]
        always_loaded: Option<AlwaysLoaded>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Parse SQL DDL and print the derived tables and relationships.
    Schema {
        /// Input SQL file
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Discovery,
    Conservative,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum AlwaysLoaded {
    Joined,
    Gated,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(
    mode: Mode,
    always_loaded: Option<AlwaysLoaded>,
    overrides: Option<&Path>,
) -> Result<AnalysisConfig> {
    let mut config = match mode {
        Mode::Discovery => AnalysisConfig::discovery(),
        Mode::Conservative => AnalysisConfig::conservative(),
    };
    if let Some(policy) = always_loaded {
        config.always_loaded = match policy {
            AlwaysLoaded::Joined => AlwaysLoadedPolicy::JoinedEntities,
            AlwaysLoaded::Gated => AlwaysLoadedPolicy::FrequencyGated,
        };
    }
    if let Some(path) = overrides {
        config.thresholds = input::load_threshold_overrides(&config.thresholds, path)?;
    }
    Ok(config)
}

fn emit(text: &str, out: Option<&PathBuf>) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, text)?;
            eprintln!("{} {}", "wrote".green().bold(), path.display().to_string().bold());
        }
        None => print!("{text}"),
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_analyze(
    bundle: &Path,
    schema: Option<&Path>,
    telemetry: Option<&Path>,
    overrides: Option<&Path>,
    mode: Mode,
    always_loaded: Option<AlwaysLoaded>,
    format: Format,
    out: Option<&PathBuf>,
) -> Result<()> {
    let config = build_config(mode, always_loaded, overrides)?;
    let analyzer = Analyzer::new(config)?;
    let input = input::assemble_input(bundle, schema, telemetry)?;
    let result = analyzer.analyze(&input);

    let text = match format {
        Format::Text => {
            if out.is_some() {
                colored::control::set_override(false);
            }
            report::render_analysis(&result)
        }
        Format::Json => serde_json::to_string_pretty(&result)? + "\n",
    };
    emit(&text, out)
}

fn cmd_schema(input: &Path, format: Format) -> Result<()> {
    let schema = input::load_schema(input)?;
    let text = match format {
        Format::Text => report::render_schema(&schema),
        Format::Json => serde_json::to_string_pretty(&schema)? + "\n",
    };
    emit(&text, None)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            schema,
            telemetry,
            config,
            mode,
            always_loaded,
            format,
            out,
        } => cmd_analyze(
            &input,
            schema.as_deref(),
            telemetry.as_deref(),
            config.as_deref(),
            mode,
            always_loaded,
            format,
            out.as_ref(),
        ),
        Commands::Schema { input, format } => cmd_schema(&input, format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use denorm_core::CandidacyMode;
    use std::io::Write;

    #[test]
    fn test_conservative_mode_with_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "high_frequency": 5 }}"#).unwrap();

        let config =
            build_config(Mode::Conservative, Some(AlwaysLoaded::Gated), Some(file.path())).unwrap();
        assert_eq!(config.candidacy, CandidacyMode::Conservative);
        assert_eq!(config.always_loaded, AlwaysLoadedPolicy::FrequencyGated);
        assert_eq!(config.thresholds.high_frequency, 5);
        assert_eq!(config.thresholds.co_access, 50);
    }

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::try_parse_from([
            "denorm",
            "analyze",
            "--input",
            "bundle.json",
            "--mode",
            "conservative",
            "--always-loaded",
            "joined",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze {
                mode,
                always_loaded,
                format,
                schema,
                ..
            } => {
                assert_eq!(mode, Mode::Conservative);
                assert_eq!(always_loaded, Some(AlwaysLoaded::Joined));
                assert_eq!(format, Format::Json);
                assert!(schema.is_none());
            }
            Commands::Schema { .. } => panic!("expected analyze"),
        }
    }
}
