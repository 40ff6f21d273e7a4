//! Human-readable reports.

use colored::{ColoredString, Colorize};
use std::fmt::Write;

use denorm_core::{AnalysisResult, ComplexityClass, RelationalSchema, TargetParadigm};

fn class_label(class: ComplexityClass) -> ColoredString {
    match class {
        ComplexityClass::Low => class.as_str().green(),
        ComplexityClass::Medium => class.as_str().yellow(),
        ComplexityClass::High => class.as_str().red(),
    }
}

fn target_label(target: TargetParadigm) -> ColoredString {
    match target {
        TargetParadigm::KeyValue => target.as_str().cyan(),
        TargetParadigm::Document => target.as_str().magenta(),
        TargetParadigm::Graph => target.as_str().blue(),
    }
}

pub fn render_analysis(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let candidates = result.candidates();

    let _ = writeln!(
        out,
        "{} ({} of {} entities)",
        "Denormalization candidates".bold(),
        candidates.len(),
        result.profiles().len()
    );
    if candidates.is_empty() {
        let _ = writeln!(out, "  (none)");
    }

    for (rank, c) in candidates.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. {}  priority {:.1}  complexity {} ({})  -> {}",
            rank + 1,
            c.primary_entity.bold(),
            c.priority_score,
            class_label(c.complexity),
            c.complexity_score,
            target_label(c.target)
        );
        if !c.related_entities.is_empty() {
            let related: Vec<&str> = c.related_entities.iter().map(String::as_str).collect();
            let _ = writeln!(out, "     embeds: {}", related.join(", "));
        }
        if let Some(profile) = result.profiles().get(&c.primary_entity) {
            if !profile.filter_columns.is_empty() {
                let columns: Vec<&str> = profile.filter_columns.iter().map(String::as_str).collect();
                let _ = write!(out, "     filters: {}", columns.join(", "));
                if profile.complex_predicate_count > 0 {
                    let _ = write!(
                        out,
                        " ({} complex predicates)",
                        profile.complex_predicate_count
                    );
                }
                let _ = writeln!(out);
            }
        }
        let _ = writeln!(out, "     why:    {}", c.reason);
        let _ = writeln!(out, "     target: {}", c.target_reason.dimmed());
    }

    let by_target = result.candidates_by_target();
    if !by_target.is_empty() {
        let parts: Vec<String> = by_target.iter().map(|(t, n)| format!("{t} {n}")).collect();
        let _ = writeln!(out, "\n{} {}", "Targets:".bold(), parts.join(", "));
    }

    let summary = result.complexity();
    let _ = writeln!(
        out,
        "\n{} total {}, average {:.2}, overall {}",
        "Complexity:".bold(),
        summary.total_score,
        summary.average_score,
        class_label(summary.overall)
    );

    if let Some(insights) = result.telemetry() {
        let _ = writeln!(
            out,
            "\n{} {} queries, {} executions",
            "Telemetry:".bold(),
            insights.total_queries_analyzed,
            insights.total_executions
        );
        for (op, n) in &insights.operation_breakdown {
            let _ = writeln!(out, "  {:<7} {n}", op.as_str());
        }
        if !insights.frequent_combinations.is_empty() {
            let _ = writeln!(out, "  frequent table combinations:");
            for combo in &insights.frequent_combinations {
                let tables: Vec<&str> = combo.tables.iter().map(String::as_str).collect();
                let _ = writeln!(
                    out,
                    "    {}  {} executions ({:.1}%)",
                    tables.join(" + "),
                    combo.total_executions,
                    combo.percentage
                );
            }
        }
        if !insights.slow_queries.is_empty() {
            let _ = writeln!(out, "  {}", "slow queries:".yellow());
            for slow in &insights.slow_queries {
                let tables: Vec<&str> = slow.tables.iter().map(String::as_str).collect();
                let _ = writeln!(
                    out,
                    "    {} {}  {:.1} ms x {}",
                    slow.operation.as_str(),
                    tables.join(" + "),
                    slow.mean_duration_ms,
                    slow.execution_count
                );
            }
        }
        if !insights.unresolved_tables.is_empty() {
            let unresolved: Vec<&str> = insights.unresolved_tables.iter().map(String::as_str).collect();
            let _ = writeln!(out, "  unresolved tables: {}", unresolved.join(", ").dimmed());
        }
    }

    out
}

pub fn render_schema(schema: &RelationalSchema) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{} ({})", "Tables".bold(), schema.tables.len());
    for table in &schema.tables {
        let pk = if table.primary_key.is_empty() {
            "no primary key".to_string()
        } else {
            format!("pk({})", table.primary_key.join(", "))
        };
        let _ = writeln!(
            out,
            "  {}  {} columns, {} indexes, {}",
            table.name.bold(),
            table.columns.len(),
            table.indexes.len(),
            pk
        );
    }

    let _ = writeln!(out, "\n{} ({})", "Relationships".bold(), schema.relationships.len());
    for rel in &schema.relationships {
        let _ = writeln!(
            out,
            "  {}.{} -> {}.{}  {}",
            rel.from_table,
            rel.from_column,
            rel.to_table,
            rel.to_column,
            rel.cardinality.as_str().cyan()
        );
    }

    out
}
