//! Per-zone average AC/DC power availability.
use crate::types::AvailabilityRecord;
use crate::util::{average, round2};
use std::collections::BTreeMap;

/// Zone means, each column over the rows that had a usable value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneAvailability {
    pub avg_ac: Option<f64>,
    pub avg_dc: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct AvailabilityIndex {
    zones: BTreeMap<String, ZoneAvailability>,
}

impl AvailabilityIndex {
    /// Rows whose site code starts with one of `excluded_prefixes` are ignored.
    pub fn build(records: &[AvailabilityRecord], excluded_prefixes: &[String]) -> Self {
        let mut by_zone: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
        for r in records {
            if let Some(site) = &r.site {
                let site = site.trim().to_uppercase();
                if excluded_prefixes
                    .iter()
                    .any(|p| site.starts_with(&p.trim().to_uppercase()))
                {
                    continue;
                }
            }
            let (ac, dc) = by_zone.entry(r.zone.as_str()).or_default();
            ac.extend(r.ac_pct);
            dc.extend(r.dc_pct);
        }

        let mean = |v: &[f64]| (!v.is_empty()).then(|| round2(average(v)));
        let zones = by_zone
            .into_iter()
            .filter(|(_, (ac, dc))| !ac.is_empty() || !dc.is_empty())
            .map(|(zone, (ac, dc))| {
                (
                    zone.to_string(),
                    ZoneAvailability {
                        avg_ac: mean(ac.as_slice()),
                        avg_dc: mean(dc.as_slice()),
                    },
                )
            })
            .collect();
        Self { zones }
    }

    /// Absent when the extract had no usable data for the zone; never zero-filled.
    pub fn availability_for(&self, zone: &str) -> Option<ZoneAvailability> {
        self.zones.get(zone).copied()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(site: Option<&str>, zone: &str, ac: Option<f64>, dc: Option<f64>) -> AvailabilityRecord {
        AvailabilityRecord {
            site: site.map(str::to_string),
            zone: zone.to_string(),
            ac_pct: ac,
            dc_pct: dc,
        }
    }

    #[test]
    fn averages_per_zone() {
        let index = AvailabilityIndex::build(
            &[
                rec(Some("DHK-1"), "Z1", Some(99.0), Some(100.0)),
                rec(Some("DHK-2"), "Z1", Some(96.34), Some(97.0)),
                rec(None, "Z2", Some(50.0), None),
            ],
            &[],
        );
        assert_eq!(
            index.availability_for("Z1"),
            Some(ZoneAvailability {
                avg_ac: Some(97.67),
                avg_dc: Some(98.5)
            })
        );
        assert_eq!(
            index.availability_for("Z2"),
            Some(ZoneAvailability {
                avg_ac: Some(50.0),
                avg_dc: None
            })
        );
        assert_eq!(index.availability_for("Z3"), None);
    }

    #[test]
    fn excluded_prefixes_are_dropped() {
        let index = AvailabilityIndex::build(
            &[
                rec(Some("DHK-1"), "Z1", Some(90.0), Some(90.0)),
                rec(Some("tmp-DHK-9"), "Z1", Some(10.0), Some(10.0)),
                rec(Some("TMP-CTG-1"), "Z4", Some(10.0), Some(10.0)),
            ],
            &["TMP".to_string()],
        );
        assert_eq!(index.availability_for("Z1").unwrap().avg_ac, Some(90.0));
        assert_eq!(index.availability_for("Z4"), None);
    }

    #[test]
    fn zone_without_values_is_absent() {
        let index = AvailabilityIndex::build(&[rec(None, "Z1", None, None)], &[]);
        assert!(index.is_empty());
    }
}
