//! `kitwise decompose`: expand composite sales against the stored catalog.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use kitwise_core::pipeline::{self, LineTotals};
use kitwise_core::{DecompositionReport, LineKind, PipelineOptions};
use kitwise_store::CatalogStore;

use crate::ingest::sales::load_sales_file;

use super::{print_warnings, require_catalog, write_json};

#[derive(Debug, Clone, Args)]
pub struct DecomposeArgs {
    /// Sales export (CSV, `;`, `,` or tab separated)
    #[arg(long)]
    pub sales: PathBuf,

    /// Where to write the decomposition report (JSON)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DecomposeSummary {
    pub report: DecompositionReport,
    /// Billed totals of the input, for the reconciliation line.
    pub totals: LineTotals,
    pub written_to: Option<PathBuf>,
}

pub async fn execute<S: CatalogStore>(
    args: &DecomposeArgs,
    store: &S,
    options: &PipelineOptions,
    pretty: bool,
) -> Result<DecomposeSummary> {
    let catalog = require_catalog(store).await?;
    let sales = load_sales_file(&args.sales)?;

    let mut report = pipeline::run(&sales.rows, &catalog, options);

    // Skipped rows first: they explain gaps in the line numbering
    let mut warnings = sales.warnings;
    warnings.append(&mut report.warnings);
    report.warnings = warnings;

    if let Some(out) = &args.out {
        write_json(out, &report, pretty).await?;
    }

    info!(
        lines = report.stats.lines_imported,
        composites = report.stats.composites_found,
        added = report.stats.components_added,
        errors = report.stats.errors.len(),
        "Decomposition finished"
    );

    Ok(DecomposeSummary {
        totals: pipeline::totals(&report.decomposed_lines),
        report,
        written_to: args.out.clone(),
    })
}

pub fn print(summary: &DecomposeSummary) {
    let report = &summary.report;
    let stats = &report.stats;

    let count = |kind: LineKind| {
        report
            .original_lines
            .iter()
            .filter(|l| l.line_kind == kind)
            .count()
    };

    println!("Lines imported: {}", stats.lines_imported);
    println!(
        "  {} original, {} composed, {} cumulated",
        count(LineKind::Original),
        count(LineKind::Composed),
        count(LineKind::Cumulated)
    );
    println!("Composites expanded: {}", stats.composites_found);
    println!("Component lines added: {}", stats.components_added);
    println!("Lines after decomposition: {}", stats.lines_after_decomposition);
    println!(
        "Billed total: {} over {} units",
        summary.totals.amount_incl,
        summary.totals.quantity
    );

    print_warnings("Errors", &stats.errors);
    print_warnings("Warnings", &report.warnings);

    if let Some(path) = &summary.written_to {
        println!("Report written to {}", path.display());
    }
}
