//! Per-tenant report reconciliation.
//!
//! Every run works off an explicit [`ReportContext`]; nothing here reads
//! process-wide state, so independent runs can coexist.
use crate::availability::AvailabilityIndex;
use crate::error::ReportError;
use crate::events::{explode, EventAggregator};
use crate::inventory::{SiteInventoryIndex, ZoneKey};
use crate::loader::LoadReport;
use crate::redeem::HistoricalRedeemIndex;
use crate::types::{
    AvailabilityRecord, Event, RedeemRecord, ReportRow, ReportTable, SiteRecord, TenantKey,
    UnmatchReason, UnmatchedEvent,
};
use crate::util::round2;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

pub const TOTAL_LABEL: &str = "Total";

/// Indexes built from one batch of input tables.
///
/// `None` means the table was never loaded (or failed its schema check).
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub events: Option<Vec<Event>>,
    pub aggregated: Option<EventAggregator>,
    pub inventory: Option<SiteInventoryIndex>,
    pub redeem: Option<HistoricalRedeemIndex>,
    pub availability: Option<AvailabilityIndex>,
}

impl ReportContext {
    pub fn build(
        events: Option<Vec<Event>>,
        sites: Option<&[SiteRecord]>,
        redeem: Option<&[RedeemRecord]>,
        availability: Option<&[AvailabilityRecord]>,
        excluded_site_prefixes: &[String],
    ) -> Self {
        Self::from_parts(
            events,
            sites.map(SiteInventoryIndex::build),
            redeem.map(HistoricalRedeemIndex::build),
            availability.map(|records| AvailabilityIndex::build(records, excluded_site_prefixes)),
        )
    }

    /// Use an inventory index that was already built (e.g. for zone backfill
    /// while loading events).
    pub fn from_parts(
        events: Option<Vec<Event>>,
        inventory: Option<SiteInventoryIndex>,
        redeem: Option<HistoricalRedeemIndex>,
        availability: Option<AvailabilityIndex>,
    ) -> Self {
        let aggregated = events.as_deref().map(EventAggregator::aggregate);
        Self {
            events,
            aggregated,
            inventory,
            redeem,
            availability,
        }
    }
}

/// Outcome of one multi-tenant run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub reports: BTreeMap<TenantKey, Result<ReportTable, ReportError>>,
    pub unmatched: Vec<UnmatchedEvent>,
}

impl RunOutput {
    pub fn tables(&self) -> impl Iterator<Item = &ReportTable> {
        self.reports.values().filter_map(|r| r.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&TenantKey, &ReportError)> {
        self.reports
            .iter()
            .filter_map(|(t, r)| r.as_ref().err().map(|e| (t, e)))
    }
}

pub struct ReportReconciler<'a> {
    ctx: &'a ReportContext,
}

impl<'a> ReportReconciler<'a> {
    pub fn new(ctx: &'a ReportContext) -> Self {
        Self { ctx }
    }

    /// Tenants named by the inventory or the event log.
    pub fn default_tenants(&self) -> BTreeSet<TenantKey> {
        let mut tenants: BTreeSet<TenantKey> = self
            .ctx
            .inventory
            .as_ref()
            .map(SiteInventoryIndex::tenants)
            .unwrap_or_default();
        if let Some(agg) = &self.ctx.aggregated {
            tenants.extend(agg.tenants().cloned());
        }
        tenants
    }

    /// Build one report per tenant. A failing tenant is recorded and the rest
    /// carry on.
    pub fn run<'t>(&self, tenants: impl IntoIterator<Item = &'t TenantKey>) -> RunOutput {
        let mut reports = BTreeMap::new();
        for tenant in tenants {
            let result = self.reconcile(tenant);
            if let Err(e) = &result {
                warn!(tenant = %tenant, error = %e, "report generation failed");
            }
            reports.insert(tenant.clone(), result);
        }
        let unmatched = self.unmatched_events();
        info!(
            tenants = reports.len(),
            unmatched = unmatched.len(),
            "report run complete"
        );
        RunOutput { reports, unmatched }
    }

    #[instrument(skip_all, fields(tenant = %tenant))]
    pub fn reconcile(&self, tenant: &TenantKey) -> Result<ReportTable, ReportError> {
        let inventory = self
            .ctx
            .inventory
            .as_ref()
            .ok_or(ReportError::MissingInventory)?;
        let aggregated = self
            .ctx
            .aggregated
            .as_ref()
            .ok_or(ReportError::MissingEvents)?;

        let zones = inventory.zones_for(tenant);
        if zones.is_empty() {
            warn!("tenant has no canonical zone coverage in the inventory");
            return Ok(ReportTable {
                tenant: tenant.clone(),
                rows: Vec::new(),
                total: None,
            });
        }

        let outages = aggregated.for_tenant(tenant);
        let rows: Vec<ReportRow> = zones
            .into_iter()
            .map(|zone_key| {
                let outage = outages
                    .and_then(|o| o.get(&zone_key))
                    .cloned()
                    .unwrap_or_default();
                let redeem = self
                    .ctx
                    .redeem
                    .as_ref()
                    .map_or(0.0, |r| r.hours_for(tenant, &zone_key.1));
                let availability = self
                    .ctx
                    .availability
                    .as_ref()
                    .and_then(|a| a.availability_for(&zone_key.1));
                let total_site_count = inventory.site_count(tenant, &zone_key);
                let (region, zone) = zone_key;
                ReportRow {
                    region,
                    zone,
                    site_count: outage.site_count,
                    duration_hours: round2(outage.duration_hours),
                    event_count: outage.event_count,
                    total_redeem_hours: round2(redeem),
                    total_site_count,
                    avg_ac_pct: availability.and_then(|a| a.avg_ac),
                    avg_dc_pct: availability.and_then(|a| a.avg_dc),
                }
            })
            .collect();

        debug!(zones = rows.len(), "reconciled canonical zones");
        let total = total_row(&rows);
        Ok(ReportTable {
            tenant: tenant.clone(),
            rows,
            total: Some(total),
        })
    }

    /// Events that cannot land in any canonical-zone report, one entry per
    /// (event, tenant).
    pub fn unmatched_events(&self) -> Vec<UnmatchedEvent> {
        let Some(events) = &self.ctx.events else {
            return Vec::new();
        };
        let inventory = self.ctx.inventory.as_ref();
        let mut unmatched = Vec::new();

        for event in events.iter().filter(|e| e.tenants.is_empty()) {
            unmatched.push(unmatched_entry(event, None, UnmatchReason::Unattributable));
        }
        let Some(inventory) = inventory else {
            return unmatched;
        };
        for (tenant, event) in explode(events) {
            let zone: ZoneKey = (event.region.clone(), event.zone.clone());
            let reason = if !inventory.knows_tenant(tenant) {
                UnmatchReason::UnknownTenant
            } else if !inventory.covers(tenant, &zone) {
                UnmatchReason::ZoneNotInInventory
            } else {
                continue;
            };
            unmatched.push(unmatched_entry(event, Some(tenant.clone()), reason));
        }
        unmatched
    }
}

fn unmatched_entry(
    event: &Event,
    tenant: Option<TenantKey>,
    reason: UnmatchReason,
) -> UnmatchedEvent {
    UnmatchedEvent {
        site: event.site.clone(),
        tenant,
        region: event.region.clone(),
        zone: event.zone.clone(),
        duration_hours: event.duration_hours,
        reason,
    }
}

/// Column sums of the additive fields; availability is left blank.
pub fn total_row(rows: &[ReportRow]) -> ReportRow {
    ReportRow {
        region: TOTAL_LABEL.to_string(),
        zone: String::new(),
        site_count: rows.iter().map(|r| r.site_count).sum(),
        duration_hours: round2(rows.iter().map(|r| r.duration_hours).sum()),
        event_count: rows.iter().map(|r| r.event_count).sum(),
        total_redeem_hours: round2(rows.iter().map(|r| r.total_redeem_hours).sum()),
        total_site_count: rows.iter().map(|r| r.total_site_count).sum(),
        avg_ac_pct: None,
        avg_dc_pct: None,
    }
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub tenants_reported: usize,
    pub tenants_without_coverage: Vec<TenantKey>,
    pub failures: BTreeMap<TenantKey, String>,
    pub unmatched_events: usize,
    pub total_duration_hours: f64,
    pub total_redeem_hours: f64,
    /// Distinct inventory sites; `None` when the inventory was not loaded.
    pub inventory_sites: Option<usize>,
    /// (tenant, zone) pairs with carried-over hours.
    pub redeem_pairs: Option<usize>,
    /// Zones with availability data.
    pub availability_zones: Option<usize>,
    pub loads: Vec<LoadReport>,
}

pub fn generate_summary(
    ctx: &ReportContext,
    run: &RunOutput,
    loads: &[LoadReport],
) -> RunSummary {
    let totals: Vec<&ReportRow> = run.tables().filter_map(|t| t.total.as_ref()).collect();
    RunSummary {
        tenants_reported: run.tables().filter(|t| !t.is_empty()).count(),
        tenants_without_coverage: run
            .tables()
            .filter(|t| t.is_empty())
            .map(|t| t.tenant.clone())
            .collect(),
        failures: run
            .failures()
            .map(|(t, e)| (t.clone(), e.to_string()))
            .collect(),
        unmatched_events: run.unmatched.len(),
        total_duration_hours: round2(totals.iter().map(|r| r.duration_hours).sum()),
        total_redeem_hours: round2(totals.iter().map(|r| r.total_redeem_hours).sum()),
        inventory_sites: ctx.inventory.as_ref().map(SiteInventoryIndex::total_sites),
        redeem_pairs: ctx.redeem.as_ref().map(HistoricalRedeemIndex::len),
        availability_zones: ctx.availability.as_ref().map(AvailabilityIndex::len),
        loads: loads.to_vec(),
    }
}
