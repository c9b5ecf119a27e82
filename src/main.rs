// Entry point and high-level CLI flow.
//
// One invocation is one report run:
// - load the inventory first (it drives zone backfill for the event log),
// - load events and the optional redeem/availability extracts,
// - reconcile every requested tenant and write one CSV per tenant,
//   the unmatched-event list and a JSON summary.
use anyhow::{Context, Result};
use clap::Parser;
use outage_sla_report::alias::TenantNormalizer;
use outage_sla_report::availability::AvailabilityIndex;
use outage_sla_report::config::ReportConfig;
use outage_sla_report::inventory::SiteInventoryIndex;
use outage_sla_report::loader::{self, LoadReport};
use outage_sla_report::redeem::HistoricalRedeemIndex;
use outage_sla_report::reports::{generate_summary, ReportContext, ReportReconciler, RunOutput};
use outage_sla_report::types::TenantKey;
use outage_sla_report::{output, util};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "outage-sla-report", about = "Per-tenant outage SLA reports")]
struct Cli {
    /// Alarm/event log CSV
    #[arg(long)]
    events: PathBuf,

    /// Canonical site inventory CSV
    #[arg(long)]
    inventory: PathBuf,

    /// Prior-period summary CSV with carried-over hours
    #[arg(long)]
    redeem: Option<PathBuf>,

    /// Power-availability CSV
    #[arg(long)]
    availability: Option<PathBuf>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory (overrides config)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Only report these tenants (repeatable)
    #[arg(long = "tenant")]
    tenants: Vec<String>,

    /// Rows shown per table in the console preview (overrides config)
    #[arg(long)]
    preview_rows: Option<usize>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Everything loaded for one run.
struct Loaded {
    ctx: ReportContext,
    loads: Vec<LoadReport>,
}

/// Load every source table. A table that fails its schema check is logged and
/// left out; the reconciler decides per tenant whether that is fatal.
fn handle_load(cli: &Cli, config: &ReportConfig, normalizer: &TenantNormalizer) -> Loaded {
    let mut loads = Vec::new();

    let inventory = match loader::load_inventory(&cli.inventory, normalizer) {
        Ok((sites, report)) => {
            loads.push(report);
            Some(SiteInventoryIndex::build(&sites))
        }
        Err(e) => {
            error!(error = %e, "inventory not loaded");
            None
        }
    };

    let events = match loader::load_events(&cli.events, normalizer, inventory.as_ref()) {
        Ok((events, report)) => {
            loads.push(report);
            Some(events)
        }
        Err(e) => {
            error!(error = %e, "event log not loaded");
            None
        }
    };

    let redeem = cli.redeem.as_ref().and_then(|path| {
        match loader::load_redeem(path, normalizer, config.history.header_row) {
            Ok((records, report)) => {
                loads.push(report);
                Some(HistoricalRedeemIndex::build(&records))
            }
            Err(e) => {
                warn!(error = %e, "redeem history not loaded, carried-over hours default to 0");
                None
            }
        }
    });

    let availability = cli.availability.as_ref().and_then(|path| {
        match loader::load_availability(path) {
            Ok((records, report)) => {
                loads.push(report);
                Some(AvailabilityIndex::build(
                    &records,
                    &config.availability.excluded_site_prefixes,
                ))
            }
            Err(e) => {
                warn!(error = %e, "availability not loaded, columns left blank");
                None
            }
        }
    });

    for report in &loads {
        println!(
            "{}: {} rows loaded ({} skipped)",
            report.table,
            util::format_int(report.loaded_rows),
            util::format_int(report.skipped_rows)
        );
    }

    Loaded {
        ctx: ReportContext::from_parts(events, inventory, redeem, availability),
        loads,
    }
}

/// Write each tenant sheet, the unmatched list and the JSON summary.
fn handle_generate_reports(
    loaded: &Loaded,
    requested: &[TenantKey],
    config: &ReportConfig,
) -> Result<RunOutput> {
    let reconciler = ReportReconciler::new(&loaded.ctx);
    let tenants: BTreeSet<TenantKey> = if requested.is_empty() {
        reconciler.default_tenants()
    } else {
        requested.iter().cloned().collect()
    };
    let run = reconciler.run(&tenants);
    let out_dir = &config.output.dir;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    println!("\nGenerating reports into {}...\n", out_dir.display());
    for (tenant, result) in &run.reports {
        match result {
            Ok(table) => {
                let path = output::write_report(out_dir, table)?;
                println!("Report: {}", tenant);
                if table.is_empty() {
                    println!("(tenant has no sites in the inventory)\n");
                } else {
                    output::preview_table_rows(table.all_rows(), config.output.preview_rows);
                }
                println!("(Full table exported to {})\n", path.display());
            }
            Err(e) => println!("Report: {} FAILED: {}\n", tenant, e),
        }
    }

    if !run.unmatched.is_empty() {
        let path = out_dir.join("unmatched_events.csv");
        output::write_csv(&path, &run.unmatched)?;
        println!(
            "{} events could not be matched to the inventory:",
            util::format_int(run.unmatched.len())
        );
        output::preview_table_rows(&run.unmatched, config.output.preview_rows);
        println!("(Full list exported to {})\n", path.display());
    }

    let summary = generate_summary(&loaded.ctx, &run, &loaded.loads);
    output::write_json(&out_dir.join("summary.json"), &summary)?;
    println!(
        "Summary: {} tenants reported, {} failed, {} hours of outage, {} hours redeemed",
        util::format_int(summary.tenants_reported),
        util::format_int(summary.failures.len()),
        util::format_number(summary.total_duration_hours, 2),
        util::format_number(summary.total_redeem_hours, 2)
    );
    Ok(run)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = match &cli.config {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };
    if let Some(dir) = &cli.out_dir {
        config.output.dir = dir.clone();
    }
    if let Some(rows) = cli.preview_rows {
        config.output.preview_rows = rows;
    }

    let normalizer = TenantNormalizer::from_config(&config.tenants);
    let requested: Vec<TenantKey> = cli
        .tenants
        .iter()
        .filter_map(|t| normalizer.normalize(t))
        .collect();

    let loaded = handle_load(&cli, &config, &normalizer);
    let run = handle_generate_reports(&loaded, &requested, &config)?;
    info!(
        tenants = run.reports.len(),
        failed = run.failures().count(),
        "done"
    );
    Ok(())
}
