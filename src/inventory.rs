//! Canonical site inventory: which (region, zone) pairs each tenant covers.
use crate::alias::clean_site_code;
use crate::types::{SiteRecord, TenantKey};
use std::collections::{BTreeMap, BTreeSet};

/// (region, zone)
pub type ZoneKey = (String, String);

#[derive(Debug, Clone, Default)]
pub struct SiteInventoryIndex {
    /// tenant -> (region, zone) -> distinct site names
    coverage: BTreeMap<TenantKey, BTreeMap<ZoneKey, BTreeSet<String>>>,
    /// cleaned site code -> (region, zone); first listing wins
    locations: BTreeMap<String, ZoneKey>,
    site_count: usize,
}

impl SiteInventoryIndex {
    pub fn build(sites: &[SiteRecord]) -> Self {
        let mut index = Self::default();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for record in sites {
            let zone_key = (record.region.clone(), record.zone.clone());
            index
                .locations
                .entry(clean_site_code(&record.site))
                .or_insert_with(|| zone_key.clone());
            seen.insert(record.site.as_str());
            // A site shared by several tenants counts once for each of them.
            for tenant in &record.tenants {
                index
                    .coverage
                    .entry(tenant.clone())
                    .or_default()
                    .entry(zone_key.clone())
                    .or_default()
                    .insert(record.site.clone());
            }
        }
        index.site_count = seen.len();
        index
    }

    /// Every (region, zone) where `tenant` has at least one site.
    pub fn zones_for(&self, tenant: &TenantKey) -> BTreeSet<ZoneKey> {
        self.coverage
            .get(tenant)
            .map(|zones| zones.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn tenants(&self) -> BTreeSet<TenantKey> {
        self.coverage.keys().cloned().collect()
    }

    pub fn knows_tenant(&self, tenant: &TenantKey) -> bool {
        self.coverage.contains_key(tenant)
    }

    pub fn covers(&self, tenant: &TenantKey, zone: &ZoneKey) -> bool {
        self.coverage
            .get(tenant)
            .is_some_and(|zones| zones.contains_key(zone))
    }

    /// Number of distinct inventory sites `tenant` has in `zone`.
    pub fn site_count(&self, tenant: &TenantKey, zone: &ZoneKey) -> usize {
        self.coverage
            .get(tenant)
            .and_then(|zones| zones.get(zone))
            .map_or(0, BTreeSet::len)
    }

    /// Where a site sits, looked up by its cleaned code.
    pub fn locate(&self, site: &str) -> Option<&ZoneKey> {
        self.locations.get(&clean_site_code(site))
    }

    pub fn total_sites(&self) -> usize {
        self.site_count
    }
}
