//! Per-tenant event aggregation.
use crate::inventory::ZoneKey;
use crate::types::{Event, TenantKey};
use crate::util::round2;
use std::collections::{BTreeMap, BTreeSet};

/// Outage totals for one (tenant, region, zone) group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneOutage {
    pub site_count: usize,
    pub event_count: usize,
    pub duration_hours: f64,
}

/// One row per tenant named at the event's site.
pub fn explode(events: &[Event]) -> impl Iterator<Item = (&TenantKey, &Event)> {
    events
        .iter()
        .flat_map(|event| event.tenants.iter().map(move |tenant| (tenant, event)))
}

/// Grouped outage totals, keyed tenant -> (region, zone).
///
/// Zones without events are absent; backfilling them is the reconciler's job.
#[derive(Debug, Clone, Default)]
pub struct EventAggregator {
    groups: BTreeMap<TenantKey, BTreeMap<ZoneKey, ZoneOutage>>,
}

impl EventAggregator {
    pub fn aggregate(events: &[Event]) -> Self {
        #[derive(Default)]
        struct Acc<'a> {
            sites: BTreeSet<&'a str>,
            events: usize,
            hours: f64,
        }

        let mut map: BTreeMap<(&TenantKey, ZoneKey), Acc> = BTreeMap::new();
        for (tenant, event) in explode(events) {
            let key = (tenant, (event.region.clone(), event.zone.clone()));
            let acc = map.entry(key).or_default();
            acc.sites.insert(event.site.as_str());
            acc.events += 1;
            acc.hours += event.duration_hours;
        }

        let mut groups: BTreeMap<TenantKey, BTreeMap<ZoneKey, ZoneOutage>> = BTreeMap::new();
        for ((tenant, zone), acc) in map {
            groups.entry(tenant.clone()).or_default().insert(
                zone,
                ZoneOutage {
                    site_count: acc.sites.len(),
                    event_count: acc.events,
                    duration_hours: round2(acc.hours),
                },
            );
        }
        Self { groups }
    }

    pub fn for_tenant(&self, tenant: &TenantKey) -> Option<&BTreeMap<ZoneKey, ZoneOutage>> {
        self.groups.get(tenant)
    }

    pub fn tenants(&self) -> impl Iterator<Item = &TenantKey> {
        self.groups.keys()
    }
}
