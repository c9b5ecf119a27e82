//! Hours carried over from the previous period's summary.
use crate::types::{RedeemRecord, TenantKey};
use crate::util::round2;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct HistoricalRedeemIndex {
    hours: BTreeMap<(TenantKey, String), f64>,
}

impl HistoricalRedeemIndex {
    /// Sum elapsed hours by (tenant, zone). Tenants are already normalized.
    pub fn build(records: &[RedeemRecord]) -> Self {
        let mut hours: BTreeMap<(TenantKey, String), f64> = BTreeMap::new();
        for r in records {
            *hours.entry((r.tenant.clone(), r.zone.clone())).or_insert(0.0) += r.elapsed_hours;
        }
        for v in hours.values_mut() {
            *v = round2(*v);
        }
        Self { hours }
    }

    /// Carried-over hours; 0 when nothing matches.
    pub fn hours_for(&self, tenant: &TenantKey, zone: &str) -> f64 {
        self.hours
            .get(&(tenant.clone(), zone.to_string()))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }
}
