#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Once;

use outage_sla_report::alias::TenantNormalizer;
use outage_sla_report::loader;
use outage_sla_report::reports::ReportContext;
use outage_sla_report::types::TenantKey;
use tempfile::TempDir;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Initialize tracing once for integration tests.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::registry()
            .with(fmt::layer().with_test_writer())
            .with(filter)
            .init();
    });
}

pub fn tenant(name: &str) -> TenantKey {
    TenantNormalizer::default()
        .normalize(name)
        .expect("non-blank tenant")
}

/// CSV source files for one run, kept alive with their temp directory.
pub struct Fixture {
    pub dir: TempDir,
    pub events: PathBuf,
    pub inventory: PathBuf,
    pub redeem: Option<PathBuf>,
    pub availability: Option<PathBuf>,
}

impl Fixture {
    pub fn new(events: &str, inventory: &str) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let events_path = dir.path().join("events.csv");
        let inventory_path = dir.path().join("inventory.csv");
        std::fs::write(&events_path, events).expect("write events");
        std::fs::write(&inventory_path, inventory).expect("write inventory");
        Self {
            dir,
            events: events_path,
            inventory: inventory_path,
            redeem: None,
            availability: None,
        }
    }

    pub fn with_redeem(mut self, content: &str) -> Self {
        let path = self.dir.path().join("redeem.csv");
        std::fs::write(&path, content).expect("write redeem");
        self.redeem = Some(path);
        self
    }

    pub fn with_availability(mut self, content: &str) -> Self {
        let path = self.dir.path().join("availability.csv");
        std::fs::write(&path, content).expect("write availability");
        self.availability = Some(path);
        self
    }

    /// Load every table the way the binary does; schema failures leave the
    /// table out of the context.
    pub fn context(&self) -> ReportContext {
        let normalizer = TenantNormalizer::default();
        let sites = loader::load_inventory(&self.inventory, &normalizer)
            .ok()
            .map(|(sites, _)| sites);
        let inventory = sites
            .as_deref()
            .map(outage_sla_report::inventory::SiteInventoryIndex::build);
        let events = loader::load_events(&self.events, &normalizer, inventory.as_ref())
            .ok()
            .map(|(events, _)| events);
        let redeem = self.redeem.as_ref().and_then(|p| {
            loader::load_redeem(p, &normalizer, 1)
                .ok()
                .map(|(records, _)| records)
        });
        let availability = self.availability.as_ref().and_then(|p| {
            loader::load_availability(p)
                .ok()
                .map(|(records, _)| records)
        });
        ReportContext::build(
            events,
            sites.as_deref(),
            redeem.as_deref(),
            availability.as_deref(),
            &[],
        )
    }
}
