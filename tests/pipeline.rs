mod common;

use common::{init_tracing, tenant, Fixture};
use outage_sla_report::error::ReportError;
use outage_sla_report::output::report_to_csv;
use outage_sla_report::reports::ReportReconciler;
use outage_sla_report::types::UnmatchReason;
use std::collections::BTreeSet;

const INVENTORY: &str = "\
Site Alias,Cluster,Zone
A-1 (GP),North,Z1
A-2 (Grameenphone),North,Z2
Dhaka-12 (GP, Robi),North,Z1
CTG-5 (Robi),South,Z9
";

const EVENTS: &str = "\
Site Alias,Start Time,End Time,Cluster,Zone
A-1 (GP),2024-03-01 10:00:00,2024-03-01 12:30:00,North,Z1
";

#[test]
fn worked_example_with_carryover() {
    init_tracing();
    let fixture = Fixture::new(EVENTS, INVENTORY).with_redeem(
        "Tenant,Zone,Elapsed Time\nGrameenphone,Z2,01:00:00\nGP,Z2,N/A\n",
    );
    let ctx = fixture.context();
    let table = ReportReconciler::new(&ctx).reconcile(&tenant("GP")).unwrap();

    let body: Vec<_> = table
        .rows
        .iter()
        .map(|r| {
            (
                r.zone.as_str(),
                r.site_count,
                r.duration_hours,
                r.event_count,
                r.total_redeem_hours,
            )
        })
        .collect();
    assert_eq!(
        body,
        vec![("Z1", 1, 2.5, 1, 0.0), ("Z2", 0, 0.0, 0, 1.0)]
    );

    let total = table.total.unwrap();
    assert_eq!(total.region, "Total");
    assert_eq!(
        (total.site_count, total.duration_hours, total.event_count, total.total_redeem_hours),
        (1, 2.5, 1, 1.0)
    );
}

#[test]
fn shared_site_counts_fully_for_each_tenant() {
    init_tracing();
    let events = "\
Site Alias,Start Time,End Time,Cluster,Zone
Dhaka-12 (GP, Robi),2024-03-01 10:00:00,2024-03-01 14:00:00,North,Z1
";
    let ctx = Fixture::new(events, INVENTORY).context();
    let reconciler = ReportReconciler::new(&ctx);

    for name in ["GP", "Robi"] {
        let table = reconciler.reconcile(&tenant(name)).unwrap();
        let z1 = table.rows.iter().find(|r| r.zone == "Z1").unwrap();
        assert_eq!(z1.site_count, 1, "{name}");
        assert_eq!(z1.event_count, 1, "{name}");
        assert_eq!(z1.duration_hours, 4.0, "{name}");
    }
}

#[test]
fn body_zones_match_inventory_coverage_exactly() {
    init_tracing();
    let events = "\
Site Alias,Start Time,End Time,Cluster,Zone
A-1 (GP),2024-03-01 10:00:00,2024-03-01 11:00:00,North,Z1
A-1 (GP),2024-03-01 10:00:00,2024-03-01 11:00:00,West,Z404
CTG-5 (Robi),2024-03-01 10:00:00,bogus,South,Z9
";
    let ctx = Fixture::new(events, INVENTORY).context();
    let reconciler = ReportReconciler::new(&ctx);
    let inventory = ctx.inventory.as_ref().unwrap();

    for t in inventory.tenants() {
        let table = reconciler.reconcile(&t).unwrap();
        let zones: BTreeSet<(String, String)> = table
            .rows
            .iter()
            .map(|r| (r.region.clone(), r.zone.clone()))
            .collect();
        assert_eq!(zones, inventory.zones_for(&t), "{t}");

        let total = table.total.as_ref().unwrap();
        let duration: f64 = table.rows.iter().map(|r| r.duration_hours).sum();
        let redeem: f64 = table.rows.iter().map(|r| r.total_redeem_hours).sum();
        assert_eq!(
            total.site_count,
            table.rows.iter().map(|r| r.site_count).sum::<usize>()
        );
        assert_eq!(
            total.event_count,
            table.rows.iter().map(|r| r.event_count).sum::<usize>()
        );
        assert!((total.duration_hours - duration).abs() < 1e-9);
        assert!((total.total_redeem_hours - redeem).abs() < 1e-9);
        assert!(total.avg_ac_pct.is_none() && total.avg_dc_pct.is_none());
        assert!(table.rows.iter().all(|r| r.duration_hours >= 0.0));
    }

    let robi = reconciler.reconcile(&tenant("Robi")).unwrap();
    let z9 = robi.rows.iter().find(|r| r.zone == "Z9").unwrap();
    assert_eq!((z9.event_count, z9.duration_hours), (1, 0.0));

    let unmatched = reconciler.unmatched_events();
    assert_eq!(unmatched.len(), 1);
    assert_eq!(unmatched[0].zone, "Z404");
    assert_eq!(unmatched[0].reason, UnmatchReason::ZoneNotInInventory);
}

#[test]
fn availability_join_excludes_totals() {
    init_tracing();
    let ctx = Fixture::new(EVENTS, INVENTORY)
        .with_availability(
            "Site,Zone,AC Availability (%),DC Availability (%)\n\
             A-1,Z1,99.00%,98.00\n\
             A-9,Z1,97.00,96.00\n",
        )
        .context();
    let table = ReportReconciler::new(&ctx).reconcile(&tenant("GP")).unwrap();
    assert_eq!(table.rows[0].avg_ac_pct, Some(98.0));
    assert_eq!(table.rows[0].avg_dc_pct, Some(97.0));
    assert_eq!(table.rows[1].avg_ac_pct, None);
    assert_eq!(table.total.unwrap().avg_ac_pct, None);
}

#[test]
fn repeated_runs_are_byte_identical() {
    init_tracing();
    let fixture = Fixture::new(EVENTS, INVENTORY)
        .with_redeem("Tenant,Zone,Elapsed Time\nGP,Z1,00:45:00\n");

    let render = || {
        let ctx = fixture.context();
        let reconciler = ReportReconciler::new(&ctx);
        let tenants = reconciler.default_tenants();
        let run = reconciler.run(&tenants);
        run.tables()
            .map(|t| report_to_csv(t).unwrap())
            .collect::<Vec<_>>()
    };
    let first = render();
    assert!(!first.is_empty());
    assert_eq!(first, render());
}

#[test]
fn schema_error_only_fails_dependent_tenants() {
    init_tracing();
    let broken_inventory = "Site Alias,Cluster\nA-1 (GP),North\n";
    let ctx = Fixture::new(EVENTS, broken_inventory).context();
    assert!(ctx.inventory.is_none());
    assert!(ctx.events.is_some());

    let reconciler = ReportReconciler::new(&ctx);
    let tenants = reconciler.default_tenants();
    let run = reconciler.run(&tenants);
    assert_eq!(run.reports[&tenant("GP")], Err(ReportError::MissingInventory));
    assert_eq!(run.failures().count(), 1);
}

#[test]
fn broken_redeem_table_defaults_to_zero_hours() {
    init_tracing();
    let ctx = Fixture::new(EVENTS, INVENTORY)
        .with_redeem("Client,Zone,Hours\nGP,Z2,1\n")
        .context();
    assert!(ctx.redeem.is_none());
    let table = ReportReconciler::new(&ctx).reconcile(&tenant("GP")).unwrap();
    assert!(table.rows.iter().all(|r| r.total_redeem_hours == 0.0));
}

#[test]
fn blank_alias_events_are_listed_as_unattributable() {
    init_tracing();
    let events = "\
Site Alias,Start Time,End Time,Cluster,Zone
,2024-03-01 10:00:00,2024-03-01 11:00:00,North,Z1
A-1 (GP),2024-03-01 10:00:00,2024-03-01 11:00:00,North,Z1
";
    let ctx = Fixture::new(events, INVENTORY).context();
    let reconciler = ReportReconciler::new(&ctx);

    let unmatched = reconciler.unmatched_events();
    assert_eq!(unmatched.len(), 1);
    assert_eq!(unmatched[0].reason, UnmatchReason::Unattributable);
    assert_eq!(unmatched[0].tenant, None);
    assert_eq!(unmatched[0].duration_hours, 1.0);

    let table = reconciler.reconcile(&tenant("GP")).unwrap();
    assert_eq!(table.total.unwrap().event_count, 1);
}
