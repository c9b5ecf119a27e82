use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

/// Canonical tenant name; the only key tenant-level joins are made on.
///
/// Built by [`crate::alias::TenantNormalizer`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TenantKey(String);

impl TenantKey {
    pub(crate) fn new(canonical: impl Into<String>) -> Self {
        Self(canonical.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Deserialize)]
pub struct RawEventRow {
    #[serde(rename = "Site Alias")]
    pub site_alias: Option<String>,
    #[serde(rename = "Start Time")]
    pub start_time: Option<String>,
    #[serde(rename = "End Time")]
    pub end_time: Option<String>,
    #[serde(rename = "Cluster")]
    pub cluster: Option<String>,
    #[serde(rename = "Zone")]
    pub zone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawSiteRow {
    #[serde(rename = "Site Alias")]
    pub site_alias: Option<String>,
    #[serde(rename = "Cluster")]
    pub cluster: Option<String>,
    #[serde(rename = "Zone")]
    pub zone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawRedeemRow {
    #[serde(rename = "Tenant")]
    pub tenant: Option<String>,
    #[serde(rename = "Zone")]
    pub zone: Option<String>,
    #[serde(rename = "Elapsed Time")]
    pub elapsed_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawAvailabilityRow {
    #[serde(rename = "Site", default)]
    pub site: Option<String>,
    #[serde(rename = "Zone")]
    pub zone: Option<String>,
    #[serde(rename = "AC Availability (%)")]
    pub ac_availability: Option<String>,
    #[serde(rename = "DC Availability (%)")]
    pub dc_availability: Option<String>,
}

/// One outage from the alarm log.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub site: String,
    /// Every tenant hosted at the site; each is credited with the full event.
    pub tenants: Vec<TenantKey>,
    pub region: String,
    pub zone: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub duration_hours: f64,
    /// False when the timestamps were unusable and the duration fell back to 0.
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteRecord {
    pub alias: String,
    pub site: String,
    pub region: String,
    pub zone: String,
    pub tenants: Vec<TenantKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RedeemRecord {
    pub tenant: TenantKey,
    pub zone: String,
    pub elapsed_hours: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityRecord {
    pub site: Option<String>,
    pub zone: String,
    pub ac_pct: Option<f64>,
    pub dc_pct: Option<f64>,
}

/// One line of a tenant report, in the consumer's column order.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct ReportRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Zone")]
    #[tabled(rename = "Zone")]
    pub zone: String,
    #[serde(rename = "Site Count")]
    #[tabled(rename = "Site Count")]
    pub site_count: usize,
    #[serde(rename = "Duration (hours)")]
    #[tabled(rename = "Duration (hours)")]
    pub duration_hours: f64,
    #[serde(rename = "Event Count")]
    #[tabled(rename = "Event Count")]
    pub event_count: usize,
    #[serde(rename = "Total Redeem Hours")]
    #[tabled(rename = "Total Redeem Hours")]
    pub total_redeem_hours: f64,
    /// Sites the tenant has in this zone per the inventory, outage or not.
    #[serde(skip)]
    #[tabled(skip)]
    pub total_site_count: usize,
    #[serde(rename = "Avg AC Availability")]
    #[tabled(rename = "Avg AC Availability", display_with = "display_pct")]
    pub avg_ac_pct: Option<f64>,
    #[serde(rename = "Avg DC Availability")]
    #[tabled(rename = "Avg DC Availability", display_with = "display_pct")]
    pub avg_dc_pct: Option<f64>,
}

fn display_pct(v: &Option<f64>) -> String {
    v.map(|p| format!("{p:.2}")).unwrap_or_default()
}

/// Report for one tenant: canonical-zone body rows plus a Total row.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub tenant: TenantKey,
    pub rows: Vec<ReportRow>,
    /// Absent only when the body is empty.
    pub total: Option<ReportRow>,
}

impl ReportTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Body rows followed by the Total row, as written to a sheet.
    pub fn all_rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().chain(self.total.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum UnmatchReason {
    /// Site alias names no tenant.
    Unattributable,
    /// Tenant has no sites in the inventory.
    UnknownTenant,
    /// Tenant is known but has no inventory sites in this (region, zone).
    ZoneNotInInventory,
}

/// An event (per tenant) left out of the canonical-zone report.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct UnmatchedEvent {
    #[serde(rename = "Site")]
    #[tabled(rename = "Site")]
    pub site: String,
    #[serde(rename = "Tenant")]
    #[tabled(rename = "Tenant", display_with = "display_tenant")]
    pub tenant: Option<TenantKey>,
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Zone")]
    #[tabled(rename = "Zone")]
    pub zone: String,
    #[serde(rename = "Duration (hours)")]
    #[tabled(rename = "Duration (hours)")]
    pub duration_hours: f64,
    #[serde(rename = "Reason")]
    #[tabled(rename = "Reason", display_with = "display_reason")]
    pub reason: UnmatchReason,
}

fn display_tenant(v: &Option<TenantKey>) -> String {
    v.as_ref().map(|t| t.to_string()).unwrap_or_default()
}

fn display_reason(v: &UnmatchReason) -> String {
    format!("{v:?}")
}
