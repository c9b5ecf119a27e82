use crate::types::ReportTable;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_rows(file, rows.iter()).with_context(|| format!("writing {}", path.display()))
}

fn write_rows<'a, W, T, I>(writer: W, rows: I) -> Result<()>
where
    W: Write,
    T: Serialize + 'a,
    I: Iterator<Item = &'a T>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render one tenant's sheet: body rows then the Total row.
pub fn report_to_csv(table: &ReportTable) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    if table.is_empty() {
        // Header only, so consumers still see the column layout.
        buf.extend_from_slice(REPORT_HEADER.as_bytes());
        buf.push(b'\n');
        return Ok(buf);
    }
    write_rows(&mut buf, table.all_rows())?;
    Ok(buf)
}

pub const REPORT_HEADER: &str = "Region,Zone,Site Count,Duration (hours),Event Count,\
Total Redeem Hours,Avg AC Availability,Avg DC Availability";

/// Write `<TENANT>.csv` into `dir` and return its path.
pub fn write_report(dir: &Path, table: &ReportTable) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("{}.csv", file_stem(table.tenant.as_str())));
    let bytes = report_to_csv(table)?;
    std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

fn file_stem(tenant: &str) -> String {
    tenant
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn preview_table_rows<'a, T, I>(rows: I, max_rows: usize)
where
    T: Tabled + Clone + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let slice: Vec<T> = rows.into_iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::TenantNormalizer;
    use crate::reports::total_row;
    use crate::types::ReportRow;

    fn row(zone: &str, hours: f64, ac: Option<f64>) -> ReportRow {
        ReportRow {
            region: "North".to_string(),
            zone: zone.to_string(),
            site_count: 1,
            duration_hours: hours,
            event_count: 2,
            total_redeem_hours: 0.5,
            total_site_count: 3,
            avg_ac_pct: ac,
            avg_dc_pct: None,
        }
    }

    #[test]
    fn sheet_layout_matches_consumer_contract() {
        let rows = vec![row("Z1", 2.5, Some(99.1))];
        let table = ReportTable {
            tenant: TenantNormalizer::default().normalize("GP").unwrap(),
            total: Some(total_row(&rows)),
            rows,
        };
        let text = String::from_utf8(report_to_csv(&table).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], REPORT_HEADER);
        assert_eq!(lines[1], "North,Z1,1,2.5,2,0.5,99.1,");
        assert_eq!(lines[2], "Total,,1,2.5,2,0.5,,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn empty_report_keeps_header() {
        let table = ReportTable {
            tenant: TenantNormalizer::default().normalize("TT").unwrap(),
            rows: vec![],
            total: None,
        };
        let text = String::from_utf8(report_to_csv(&table).unwrap()).unwrap();
        assert_eq!(text.trim_end(), REPORT_HEADER);
    }

    #[test]
    fn tenant_names_become_safe_file_stems() {
        assert_eq!(file_stem("UNKNOWN CARRIER/2"), "UNKNOWN_CARRIER_2");
        assert_eq!(file_stem("GP"), "GP");
    }
}
