use crate::alias::{parse_site_alias, TenantNormalizer};
use crate::duration::{hours_between, parse_elapsed_hours};
use crate::error::LoadError;
use crate::inventory::SiteInventoryIndex;
use crate::types::{
    AvailabilityRecord, Event, RawAvailabilityRow, RawEventRow, RawRedeemRow, RawSiteRow,
    RedeemRecord, SiteRecord,
};
use crate::util::{parse_f64_safe, squash_whitespace};
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

pub const EVENT_COLUMNS: &[&str] = &["Site Alias", "Start Time", "End Time", "Cluster", "Zone"];
pub const INVENTORY_COLUMNS: &[&str] = &["Site Alias", "Cluster", "Zone"];
pub const REDEEM_COLUMNS: &[&str] = &["Tenant", "Zone", "Elapsed Time"];
pub const AVAILABILITY_COLUMNS: &[&str] = &["Zone", "AC Availability (%)", "DC Availability (%)"];

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LoadReport {
    pub table: &'static str,
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub skipped_rows: usize,
    /// Events kept with a zero duration because their timestamps were unusable.
    pub invalid_durations: usize,
    /// Events whose Cluster/Zone came from the inventory.
    pub backfilled_zones: usize,
}

impl LoadReport {
    fn new(table: &'static str) -> Self {
        Self {
            table,
            ..Self::default()
        }
    }

    fn log(&self) {
        info!(
            table = self.table,
            total = self.total_rows,
            loaded = self.loaded_rows,
            skipped = self.skipped_rows,
            "loaded table"
        );
        if self.skipped_rows > 0 {
            warn!(
                table = self.table,
                skipped = self.skipped_rows,
                "rows skipped due to decode/validation errors"
            );
        }
    }
}

fn read_table(table: &'static str, path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io { table, source })
}

/// Decode every row of `content` after checking that `required` columns exist.
///
/// `header_row` is 1-based; lines above it are discarded. Rows that fail to
/// decode are returned as `None` so callers can count them.
fn decode_rows<T: DeserializeOwned>(
    table: &'static str,
    content: &str,
    header_row: usize,
    required: &[&'static str],
) -> Result<Vec<Option<T>>, LoadError> {
    let content = content.trim_start_matches('\u{feff}');
    let body = match header_row.saturating_sub(1) {
        0 => content,
        skip => match content.match_indices('\n').nth(skip - 1) {
            Some((idx, _)) => &content[idx + 1..],
            None => "",
        },
    };

    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(body.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|source| LoadError::Csv { table, source })?
        .clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(LoadError::EmptyTable { table });
    }
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(LoadError::MissingColumn { table, column });
        }
    }

    let rows = rdr
        .deserialize::<T>()
        .enumerate()
        .map(|(idx, result)| match result {
            Ok(row) => Some(row),
            Err(e) => {
                debug!(table, row = idx + 1, error = %e, "skipping undecodable row");
                None
            }
        })
        .collect();
    Ok(rows)
}

fn clean_cell(cell: Option<String>) -> Option<String> {
    cell.map(|c| squash_whitespace(&c)).filter(|c| !c.is_empty())
}

pub fn load_inventory(
    path: &Path,
    normalizer: &TenantNormalizer,
) -> Result<(Vec<SiteRecord>, LoadReport), LoadError> {
    parse_inventory(&read_table("inventory", path)?, normalizer)
}

pub fn parse_inventory(
    content: &str,
    normalizer: &TenantNormalizer,
) -> Result<(Vec<SiteRecord>, LoadReport), LoadError> {
    let mut report = LoadReport::new("inventory");
    let mut sites = Vec::new();
    for row in decode_rows::<RawSiteRow>(report.table, content, 1, INVENTORY_COLUMNS)? {
        report.total_rows += 1;
        let Some(row) = row else {
            report.skipped_rows += 1;
            continue;
        };
        let (Some(alias), Some(region), Some(zone)) = (
            clean_cell(row.site_alias),
            clean_cell(row.cluster),
            clean_cell(row.zone),
        ) else {
            report.skipped_rows += 1;
            continue;
        };
        let parsed = parse_site_alias(&alias);
        if parsed.tenants.is_empty() {
            debug!(alias = %alias, "inventory site names no tenant");
        }
        sites.push(SiteRecord {
            tenants: normalizer.normalize_all(&parsed.tenants),
            site: parsed.site,
            alias,
            region,
            zone,
        });
    }
    report.loaded_rows = sites.len();
    report.log();
    Ok((sites, report))
}

/// Load the alarm log. Blank Cluster/Zone cells are filled from `inventory`
/// when the site can be located there.
pub fn load_events(
    path: &Path,
    normalizer: &TenantNormalizer,
    inventory: Option<&SiteInventoryIndex>,
) -> Result<(Vec<Event>, LoadReport), LoadError> {
    parse_events(&read_table("events", path)?, normalizer, inventory)
}

pub fn parse_events(
    content: &str,
    normalizer: &TenantNormalizer,
    inventory: Option<&SiteInventoryIndex>,
) -> Result<(Vec<Event>, LoadReport), LoadError> {
    let mut report = LoadReport::new("events");
    let mut events = Vec::new();
    for row in decode_rows::<RawEventRow>(report.table, content, 1, EVENT_COLUMNS)? {
        report.total_rows += 1;
        let Some(row) = row else {
            report.skipped_rows += 1;
            continue;
        };
        // A blank alias still counts as an outage; it surfaces as unattributable.
        let alias = clean_cell(row.site_alias).unwrap_or_default();
        let parsed = parse_site_alias(&alias);

        let mut region = clean_cell(row.cluster);
        let mut zone = clean_cell(row.zone);
        if (region.is_none() || zone.is_none()) && !parsed.site.is_empty() {
            if let Some((r, z)) = inventory.and_then(|inv| inv.locate(&parsed.site)) {
                region = region.or_else(|| Some(r.clone()));
                zone = zone.or_else(|| Some(z.clone()));
                report.backfilled_zones += 1;
            }
        }

        let duration = hours_between(row.start_time.as_deref(), row.end_time.as_deref());
        if !duration.valid {
            report.invalid_durations += 1;
            debug!(site = %parsed.site, "unusable timestamps, duration set to 0");
        }

        events.push(Event {
            tenants: normalizer.normalize_all(&parsed.tenants),
            site: parsed.site,
            region: region.unwrap_or_default(),
            zone: zone.unwrap_or_default(),
            start: duration.start,
            end: duration.end,
            duration_hours: duration.hours,
            valid: duration.valid,
        });
    }
    report.loaded_rows = events.len();
    report.log();
    if report.invalid_durations > 0 {
        warn!(
            count = report.invalid_durations,
            "events with unusable timestamps counted with zero duration"
        );
    }
    Ok((events, report))
}

/// Load the prior-period summary. `header_row` is the 1-based line holding
/// the column names.
pub fn load_redeem(
    path: &Path,
    normalizer: &TenantNormalizer,
    header_row: usize,
) -> Result<(Vec<RedeemRecord>, LoadReport), LoadError> {
    parse_redeem(&read_table("redeem", path)?, normalizer, header_row)
}

pub fn parse_redeem(
    content: &str,
    normalizer: &TenantNormalizer,
    header_row: usize,
) -> Result<(Vec<RedeemRecord>, LoadReport), LoadError> {
    let mut report = LoadReport::new("redeem");
    let mut records = Vec::new();
    for row in decode_rows::<RawRedeemRow>(report.table, content, header_row, REDEEM_COLUMNS)? {
        report.total_rows += 1;
        let Some(row) = row else {
            report.skipped_rows += 1;
            continue;
        };
        let tenant = row.tenant.as_deref().and_then(|t| normalizer.normalize(t));
        let (Some(tenant), Some(zone)) = (tenant, clean_cell(row.zone)) else {
            report.skipped_rows += 1;
            continue;
        };
        records.push(RedeemRecord {
            tenant,
            zone,
            elapsed_hours: parse_elapsed_hours(row.elapsed_time.as_deref().unwrap_or("")),
        });
    }
    report.loaded_rows = records.len();
    report.log();
    Ok((records, report))
}

pub fn load_availability(path: &Path) -> Result<(Vec<AvailabilityRecord>, LoadReport), LoadError> {
    parse_availability(&read_table("availability", path)?)
}

pub fn parse_availability(
    content: &str,
) -> Result<(Vec<AvailabilityRecord>, LoadReport), LoadError> {
    let mut report = LoadReport::new("availability");
    let mut records = Vec::new();
    for row in
        decode_rows::<RawAvailabilityRow>(report.table, content, 1, AVAILABILITY_COLUMNS)?
    {
        report.total_rows += 1;
        let Some(row) = row else {
            report.skipped_rows += 1;
            continue;
        };
        let Some(zone) = clean_cell(row.zone) else {
            report.skipped_rows += 1;
            continue;
        };
        records.push(AvailabilityRecord {
            site: clean_cell(row.site),
            zone,
            ac_pct: parse_f64_safe(row.ac_availability.as_deref()),
            dc_pct: parse_f64_safe(row.dc_availability.as_deref()),
        });
    }
    report.loaded_rows = records.len();
    report.log();
    Ok((records, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_trimmed_before_matching() {
        let csv = " Site Alias ,Cluster, Zone\nDHK-1 (GP),North,Z1\n";
        let (sites, report) = parse_inventory(csv, &TenantNormalizer::default()).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].site, "DHK-1");
        assert_eq!(sites[0].tenants[0].as_str(), "GP");
        assert_eq!(report.loaded_rows, 1);
    }

    #[test]
    fn missing_column_is_a_schema_error() {
        let csv = "Site Alias,Cluster\nDHK-1 (GP),North\n";
        let err = parse_inventory(csv, &TenantNormalizer::default()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingColumn {
                table: "inventory",
                column: "Zone"
            }
        ));
    }

    #[test]
    fn empty_input_is_reported() {
        let err = parse_availability("").unwrap_err();
        assert!(matches!(err, LoadError::EmptyTable { .. }));
    }

    #[test]
    fn incomplete_inventory_rows_are_skipped() {
        let csv = "Site Alias,Cluster,Zone\nDHK-1 (GP),North,\n,North,Z1\nDHK-2 (GP),North,Z1\n";
        let (sites, report) = parse_inventory(csv, &TenantNormalizer::default()).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.skipped_rows, 2);
    }

    #[test]
    fn events_keep_bad_timestamps_with_zero_duration() {
        let csv = "Site Alias,Start Time,End Time,Cluster,Zone\n\
                   DHK-1 (GP),2024-01-01 10:00:00,2024-01-01 12:30:00,North,Z1\n\
                   DHK-1 (GP),garbage,2024-01-01 12:30:00,North,Z1\n\
                   DHK-1 (GP),2024-01-01 12:30:00,2024-01-01 10:00:00,North,Z1\n";
        let (events, report) = parse_events(csv, &TenantNormalizer::default(), None).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].duration_hours, 2.5);
        assert!(events[1..].iter().all(|e| e.duration_hours == 0.0 && !e.valid));
        assert_eq!(report.invalid_durations, 2);
    }

    #[test]
    fn blank_event_alias_is_kept_without_tenants() {
        let csv = "Site Alias,Start Time,End Time,Cluster,Zone\n\
                   ,2024-01-01 10:00:00,2024-01-01 11:00:00,North,Z1\n";
        let (events, report) = parse_events(csv, &TenantNormalizer::default(), None).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].site, "");
        assert!(events[0].tenants.is_empty());
        assert_eq!(events[0].duration_hours, 1.0);
        assert_eq!(report.skipped_rows, 0);
    }

    #[test]
    fn blank_event_zone_is_backfilled_from_inventory() {
        let normalizer = TenantNormalizer::default();
        let (sites, _) =
            parse_inventory("Site Alias,Cluster,Zone\nDHK-1 (GP),North,Z1\n", &normalizer).unwrap();
        let inventory = SiteInventoryIndex::build(&sites);
        let csv = "Site Alias,Start Time,End Time,Cluster,Zone\n\
                   DHK-1_X (GP),2024-01-01 10:00,2024-01-01 11:00,,\n\
                   SYL-7 (GP),2024-01-01 10:00,2024-01-01 11:00,,\n";
        let (events, report) = parse_events(csv, &normalizer, Some(&inventory)).unwrap();
        assert_eq!(events[0].region, "North");
        assert_eq!(events[0].zone, "Z1");
        assert_eq!(events[1].zone, "");
        assert_eq!(report.backfilled_zones, 1);
    }

    #[test]
    fn redeem_header_can_sit_below_title_rows() {
        let csv = "Report Summary\nPeriod: March\nTenant,Zone,Elapsed Time\n\
                   Grameenphone,Z1,02:30:00\nGP,Z1,N/A\n,Z2,01:00:00\n";
        let (records, report) = parse_redeem(csv, &TenantNormalizer::default(), 3).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tenant.as_str(), "GP");
        assert_eq!(records[0].elapsed_hours, 2.5);
        assert_eq!(records[1].elapsed_hours, 0.0);
        assert_eq!(report.skipped_rows, 1);
    }

    #[test]
    fn availability_site_column_is_optional() {
        let csv = "Zone,AC Availability (%),DC Availability (%)\nZ1,99.5%,n/a\n";
        let (records, _) = parse_availability(csv).unwrap();
        assert_eq!(records[0].site, None);
        assert_eq!(records[0].ac_pct, Some(99.5));
        assert_eq!(records[0].dc_pct, None);
    }
}
