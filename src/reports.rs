// One builder per dashboard section. Builders only combine the generic
// aggregation/comparison primitives; none of them reach back into raw
// cells.

use crate::agg::{group_count, group_count2, group_mean, largest, top_n, Pct};
use crate::compare::{count_delta, ratio_delta, split_current_previous};
use crate::pipeline::{closed_cases, distinct_week_count, open_cases};
use crate::types::{
    AdditionalAnalysis, CarrierDeepDive, CarrierSection, CaseRecord, CategorySection,
    CategorySummary, CustomerDeepDive, CustomerSection, DailyPoint, MainKpis, OpenSemsSection,
    OpenSummary, PairCountRow, PartnerSection, PartnerSummary, PrioritySection, PrioritySummary,
    QuarterlyMarkers, RegionSection, RegionSummary, TrendPoint, WeeklyMarkers,
};
use crate::util::natural_cmp;
use std::collections::{BTreeMap, BTreeSet};

/// Customers averaging more than this many action days get their own
/// "longest waiting" table regardless of rank.
const AVG_ACTION_AGE_FLOOR: f64 = 10.0;

fn count_open(rows: &[CaseRecord]) -> usize {
    rows.iter().filter(|r| r.status.is_open()).count()
}

fn count_p1(rows: &[CaseRecord]) -> usize {
    rows.iter().filter(|r| r.priority.is_p1()).count()
}

fn count_open_p1(rows: &[CaseRecord]) -> usize {
    rows.iter()
        .filter(|r| r.status.is_open() && r.priority.is_p1())
        .count()
}

fn pct_open(rows: &[CaseRecord]) -> Pct {
    Pct::of(count_open(rows) as f64, rows.len() as f64)
}

/// Cases per fiscal week, in chart-axis (natural) order.
fn weekly_series(rows: &[CaseRecord]) -> Vec<TrendPoint> {
    let mut pts: Vec<TrendPoint> = group_count(rows, |r| r.period_code.clone())
        .into_iter()
        .map(|c| TrendPoint {
            period: c.name,
            count: c.count,
        })
        .collect();
    pts.sort_by(|a, b| natural_cmp(&a.period, &b.period));
    pts
}

/// Natural-order a weekly two-dimension breakdown for charting.
fn sort_for_axis(mut pairs: Vec<PairCountRow>) -> Vec<PairCountRow> {
    pairs.sort_by(|a, b| natural_cmp(&a.name, &b.name).then_with(|| a.series.cmp(&b.series)));
    pairs
}

/// Cases per creation day, ascending; the per-entity trend line.
fn daily_series(rows: &[CaseRecord]) -> Vec<DailyPoint> {
    let mut days: BTreeMap<chrono::NaiveDate, usize> = BTreeMap::new();
    for r in rows {
        *days.entry(r.created_on).or_insert(0) += 1;
    }
    days.into_iter()
        .map(|(date, count)| DailyPoint { date, count })
        .collect()
}

pub fn main_kpis(data: &[CaseRecord]) -> MainKpis {
    let open = open_cases(data);
    let open_count = open.len();
    let open_p1 = count_p1(&open);

    MainKpis {
        total_cases: data.len(),
        open_cases: open_count,
        open_p1,
        pct_open: Pct::of(open_count as f64, data.len() as f64),
        busiest_open_team: largest(&group_count(&open, |r| r.assigned_team.clone()))
            .map(|c| c.name.clone()),
        most_common_open_issue: largest(&group_count(&open, |r| r.issue_type.clone()))
            .map(|c| c.name.clone()),
        pct_open_p1: Pct::of(open_p1 as f64, open_count as f64),
        total_p1: count_p1(data),
        weekly: weekly_markers(data),
        quarterly: quarterly_markers(data),
    }
}

/// Week-over-week markers; absent when the window covers fewer than two
/// distinct weeks.
fn weekly_markers(data: &[CaseRecord]) -> Option<WeeklyMarkers> {
    let cp = split_current_previous(data, |r| r.period_code.clone())?;
    Some(WeeklyMarkers {
        total: count_delta(&cp, |rows| rows.len()),
        open: count_delta(&cp, count_open),
        pct_open: ratio_delta(pct_open(&cp.current), pct_open(&cp.previous)),
        p1: count_delta(&cp, count_p1),
        open_p1: count_delta(&cp, count_open_p1),
    })
}

/// Quarter-over-quarter markers; requires the table to be
/// quarter-tagged and to span at least two quarters.
fn quarterly_markers(data: &[CaseRecord]) -> Option<QuarterlyMarkers> {
    let cp = split_current_previous(data, |r| r.quarter.clone())?;
    let pct_p1 = |rows: &[CaseRecord]| Pct::of(count_p1(rows) as f64, rows.len() as f64);
    Some(QuarterlyMarkers {
        total: count_delta(&cp, |rows| rows.len()),
        p1: count_delta(&cp, count_p1),
        pct_p1: ratio_delta(pct_p1(&cp.current), pct_p1(&cp.previous)),
    })
}

pub fn open_sems_section(data: &[CaseRecord]) -> OpenSemsSection {
    let open = open_cases(data);
    let weeks = distinct_week_count(data);

    let open_by_team = group_count(&open, |r| r.assigned_team.clone());
    let open_by_region = group_count(&open, |r| r.region.clone());
    let open_by_category = group_count(&open, |r| r.category.clone());
    let open_by_partner = group_count(&open, |r| r.customer_id.clone());

    let summary = OpenSummary {
        busiest_team: largest(&open_by_team).map(|c| c.name.clone()),
        busiest_region: largest(&open_by_region).map(|c| c.name.clone()),
        busiest_category: largest(&open_by_category).map(|c| c.name.clone()),
        busiest_partner: largest(&open_by_partner).map(|c| c.name.clone()),
    };

    OpenSemsSection {
        status_counts: group_count(data, |r| r.status.to_string()),
        open_by_region,
        open_by_category,
        top_open_partners: top_n(open_by_partner, 10),
        top_open_teams: top_n(open_by_team, 10),
        top_open_issues: top_n(group_count(&open, |r| r.issue_type.clone()), 10),
        weekly_trend: (weeks >= 3).then(|| weekly_series(data)),
        weekly_status: (weeks >= 2).then(|| {
            // Only settled statuses chart cleanly week by week.
            let mut settled = open_cases(data);
            settled.extend(closed_cases(data));
            sort_for_axis(group_count2(&settled, |r| {
                (r.period_code.clone(), r.status.to_string())
            }))
        }),
        summary,
    }
}

pub fn priority_section(data: &[CaseRecord]) -> PrioritySection {
    let open = open_cases(data);
    let open_count = open.len();
    let open_p1 = count_p1(&open);
    let open_p2 = open.iter().filter(|r| r.priority.is_p2()).count();

    PrioritySection {
        weekly_by_priority: sort_for_axis(group_count2(data, |r| {
            (r.period_code.clone(), r.priority.to_string())
        })),
        open_weekly_by_priority: sort_for_axis(group_count2(&open, |r| {
            (r.period_code.clone(), r.priority.to_string())
        })),
        open_region_by_priority: group_count2(&open, |r| {
            (r.region.clone(), r.priority.to_string())
        }),
        open_category_by_priority: group_count2(&open, |r| {
            (r.category.clone(), r.priority.to_string())
        }),
        open_priority_counts: group_count(&open, |r| r.priority.to_string()),
        summary: PrioritySummary {
            open_p1,
            open_p2,
            pct_open_p1: Pct::of(open_p1 as f64, open_count as f64),
            pct_open_p2: Pct::of(open_p2 as f64, open_count as f64),
            total_p1: count_p1(data),
        },
    }
}

/// All (week, category) cells for the open subset, zero-filled so trend
/// lines do not skip weeks a category had no cases in.
fn zero_filled_category_series(open: &[CaseRecord]) -> Vec<PairCountRow> {
    let mut periods: Vec<String> = open
        .iter()
        .map(|r| r.period_code.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    periods.sort_by(|a, b| natural_cmp(a, b));
    let categories: BTreeSet<String> = open.iter().map(|r| r.category.clone()).collect();

    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for r in open {
        *counts
            .entry((r.period_code.clone(), r.category.clone()))
            .or_insert(0) += 1;
    }

    let mut out = Vec::with_capacity(periods.len() * categories.len());
    for p in &periods {
        for c in &categories {
            out.push(PairCountRow {
                name: p.clone(),
                series: c.clone(),
                count: counts.get(&(p.clone(), c.clone())).copied().unwrap_or(0),
            });
        }
    }
    out
}

pub fn category_section(data: &[CaseRecord]) -> CategorySection {
    let open = open_cases(data);
    let weeks = distinct_week_count(data);
    let category_counts = group_count(data, |r| r.category.clone());
    let open_by_category = group_count(&open, |r| r.category.clone());

    let total: usize = category_counts.iter().map(|c| c.count).sum();
    let largest_row = largest(&category_counts).cloned();
    let largest_name = largest_row.as_ref().map(|c| c.name.clone());
    let largest_count = largest_row.as_ref().map(|c| c.count).unwrap_or(0);
    let open_p1_in_largest = match &largest_name {
        Some(name) => open
            .iter()
            .filter(|r| &r.category == name && r.priority.is_p1())
            .count(),
        None => 0,
    };

    CategorySection {
        total_trend: (weeks > 2).then(|| {
            sort_for_axis(group_count2(data, |r| {
                (r.period_code.clone(), r.category.clone())
            }))
        }),
        open_trend: (weeks > 2).then(|| zero_filled_category_series(&open)),
        summary: CategorySummary {
            largest: largest_name,
            largest_share: Pct::of(largest_count as f64, total as f64),
            largest_count,
            largest_open_count: largest(&open_by_category).map(|c| c.count).unwrap_or(0),
            open_p1_in_largest,
        },
        category_counts,
    }
}

pub fn partner_section(data: &[CaseRecord]) -> PartnerSection {
    let open = open_cases(data);
    let top_partners = top_n(group_count(data, |r| r.customer_id.clone()), 10);
    let top_open_partners = top_n(group_count(&open, |r| r.customer_id.clone()), 10);
    let top_open_names: BTreeSet<&str> =
        top_open_partners.iter().map(|c| c.name.as_str()).collect();

    let restrict = |pairs: Vec<PairCountRow>| -> Vec<PairCountRow> {
        pairs
            .into_iter()
            .filter(|p| top_open_names.contains(p.name.as_str()))
            .collect()
    };
    let priority_by_partner = restrict(group_count2(data, |r| {
        (r.customer_id.clone(), r.priority.to_string())
    }));
    let open_priority_by_partner = restrict(group_count2(&open, |r| {
        (r.customer_id.clone(), r.priority.to_string())
    }));

    let cases_in_top: usize = top_partners.iter().map(|c| c.count).sum();
    let open_cases_in_top: usize = open_priority_by_partner.iter().map(|p| p.count).sum();

    PartnerSection {
        summary: PartnerSummary {
            cases_in_top,
            open_cases_in_top,
            share_of_total: Pct::of(cases_in_top as f64, data.len() as f64),
            share_open: Pct::of(open_cases_in_top as f64, cases_in_top as f64),
            largest_partner: largest(&top_partners).map(|c| c.name.clone()),
        },
        top_partners,
        top_open_partners,
        priority_by_partner,
        open_priority_by_partner,
    }
}

pub fn region_section(data: &[CaseRecord]) -> RegionSection {
    let open = open_cases(data);
    let region_counts = group_count(data, |r| r.region.clone());
    let open_by_region = group_count(&open, |r| r.region.clone());

    let busiest_total = largest(&region_counts).map(|c| c.count).unwrap_or(0);
    let busiest_open = largest(&open_by_region).map(|c| c.count).unwrap_or(0);

    RegionSection {
        summary: RegionSummary {
            busiest_region: largest(&region_counts).map(|c| c.name.clone()),
            busiest_total,
            busiest_open,
            pct_open: Pct::of(busiest_open as f64, busiest_total as f64),
        },
        open_priority_by_region: group_count2(&open, |r| {
            (r.region.clone(), r.priority.to_string())
        }),
        category_by_region: group_count2(data, |r| (r.region.clone(), r.category.clone())),
        region_counts,
    }
}

pub fn additional_analysis(data: &[CaseRecord]) -> AdditionalAnalysis {
    let weeks = distinct_week_count(data);
    AdditionalAnalysis {
        weekly_trend: (weeks > 2).then(|| weekly_series(data)),
        top_issues: top_n(group_count(data, |r| r.issue_type.clone()), 10),
        top_root_causes: top_n(group_count(data, |r| r.root_cause.clone()), 10),
    }
}

/// Scope the table down to one entity by containment on the identifier
/// (missing cells never match), the same selection the deep-dive charts
/// use in every view.
fn scoped_by<F>(data: &[CaseRecord], field: F, needle: &str) -> Vec<CaseRecord>
where
    F: Fn(&CaseRecord) -> &str,
{
    data.iter()
        .filter(|r| field(r).contains(needle))
        .cloned()
        .collect()
}

fn carrier_deep_dive(data: &[CaseRecord], name: &str) -> CarrierDeepDive {
    let scoped = scoped_by(data, |r| r.carrier.as_str(), name);
    CarrierDeepDive {
        carrier: name.to_string(),
        top_sub_issues: top_n(group_count(&scoped, |r| r.sub_issue_type.clone()), 10),
        customers_affected: top_n(group_count(&scoped, |r| r.customer_id.clone()), 10),
        daily_trend: daily_series(&scoped),
    }
}

pub fn carrier_section(data: &[CaseRecord], extra: &[String]) -> CarrierSection {
    let open = open_cases(data);
    let by_total = group_count(data, |r| r.carrier.clone());

    let top5: Vec<String> = by_total.iter().take(5).map(|c| c.name.clone()).collect();
    let deep_dives = top5
        .iter()
        .map(|name| carrier_deep_dive(data, name))
        .collect();

    let mut extra_deep_dives = Vec::new();
    let mut already_covered = Vec::new();
    for name in extra {
        if top5.contains(name) {
            already_covered.push(name.clone());
        } else {
            extra_deep_dives.push(carrier_deep_dive(data, name));
        }
    }

    CarrierSection {
        top_carriers: top_n(by_total, 10),
        top_open_carriers: top_n(group_count(&open, |r| r.carrier.clone()), 10),
        top_by_action_age: top_n(
            group_mean(data, |r| r.carrier.clone(), |r| r.action_age_days),
            10,
        ),
        deep_dives,
        extra_deep_dives,
        already_covered,
    }
}

fn customer_deep_dive(data: &[CaseRecord], name: &str) -> CustomerDeepDive {
    let scoped = scoped_by(data, |r| r.customer_id.as_str(), name);
    CustomerDeepDive {
        customer: name.to_string(),
        top_sub_issues: top_n(group_count(&scoped, |r| r.sub_issue_type.clone()), 8),
        carriers_affecting: top_n(group_count(&scoped, |r| r.carrier.clone()), 5),
        top_issues: top_n(group_count(&scoped, |r| r.issue_type.clone()), 3),
        daily_trend: daily_series(&scoped),
    }
}

pub fn customer_section(data: &[CaseRecord], extra: &[String]) -> CustomerSection {
    let open = open_cases(data);
    let by_total = group_count(data, |r| r.customer_id.clone());
    let by_action_age = group_mean(data, |r| r.customer_id.clone(), |r| r.action_age_days);

    let top5: Vec<String> = by_total.iter().take(5).map(|c| c.name.clone()).collect();
    let deep_dives = top5
        .iter()
        .map(|name| customer_deep_dive(data, name))
        .collect();

    let mut extra_deep_dives = Vec::new();
    let mut already_covered = Vec::new();
    for name in extra {
        if top5.contains(name) {
            already_covered.push(name.clone());
        } else {
            extra_deep_dives.push(customer_deep_dive(data, name));
        }
    }

    CustomerSection {
        top_customers: top_n(by_total, 15),
        top_open_customers: top_n(group_count(&open, |r| r.customer_id.clone()), 10),
        longest_waiting: top_n(by_action_age.clone(), 10),
        over_threshold: by_action_age
            .into_iter()
            .filter(|m| m.mean > AVG_ACTION_AGE_FLOOR)
            .collect(),
        deep_dives,
        extra_deep_dives,
        already_covered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Priority, Status};

    fn case(carrier: &str, customer: &str, week: &str) -> CaseRecord {
        let mut r = CaseRecord::sample();
        r.carrier = carrier.to_string();
        r.customer_id = customer.to_string();
        r.period_code = week.to_string();
        r
    }

    #[test]
    fn deep_dive_covers_only_the_carriers_present() {
        // Three distinct carriers; the "top 5" is all of them, no padding.
        let data = vec![
            case("UPS", "100001", "2023W05"),
            case("UPS", "100002", "2023W05"),
            case("DHL", "100001", "2023W05"),
            case("TNT", "100003", "2023W05"),
        ];
        let section = carrier_section(&data, &[]);
        assert_eq!(section.deep_dives.len(), 3);
        assert_eq!(section.deep_dives[0].carrier, "UPS");
    }

    #[test]
    fn requested_extras_already_in_the_top_five_are_skipped() {
        let data = vec![
            case("UPS", "100001", "2023W05"),
            case("DHL", "100002", "2023W05"),
        ];
        let extras = vec!["UPS".to_string(), "GLS".to_string()];
        let section = carrier_section(&data, &extras);
        assert_eq!(section.already_covered, vec!["UPS".to_string()]);
        assert_eq!(section.extra_deep_dives.len(), 1);
        assert_eq!(section.extra_deep_dives[0].carrier, "GLS");
        assert!(section.extra_deep_dives[0].top_sub_issues.is_empty());
    }

    #[test]
    fn deep_dive_scoping_is_substring_containment() {
        let data = vec![
            case("UPS Express", "100001", "2023W05"),
            case("UPS Standard", "100002", "2023W05"),
            case("DHL", "100003", "2023W05"),
        ];
        let dive = carrier_deep_dive(&data, "UPS");
        assert_eq!(dive.customers_affected.len(), 2);
        assert_eq!(dive.daily_trend.iter().map(|p| p.count).sum::<usize>(), 2);
    }

    #[test]
    fn weekly_markers_need_two_distinct_weeks() {
        let one_week = vec![case("UPS", "1", "2023W05"), case("DHL", "2", "2023W05")];
        assert!(main_kpis(&one_week).weekly.is_none());

        let two_weeks = vec![
            case("UPS", "1", "2023W04"),
            case("UPS", "1", "2023W05"),
            case("DHL", "2", "2023W05"),
        ];
        let markers = main_kpis(&two_weeks).weekly.unwrap();
        assert_eq!(markers.total.current, 2);
        assert_eq!(markers.total.previous, 1);
        assert_eq!(markers.total.delta.to_string(), "100.0%");
    }

    #[test]
    fn quarterly_markers_compare_tagged_quarters() {
        let mut rows = vec![
            case("UPS", "1", "2022W51"),
            case("UPS", "1", "2023W01"),
            case("UPS", "1", "2023W02"),
        ];
        rows[1].priority = Priority::P1;
        let tagged = crate::pipeline::tag_quarters(&rows);
        let markers = main_kpis(&tagged).quarterly.unwrap();
        assert_eq!(markers.total.current, 2);
        assert_eq!(markers.total.previous, 1);
        assert_eq!(markers.p1.current, 1);
    }

    #[test]
    fn open_category_trend_is_zero_filled() {
        let mut data = vec![
            case("UPS", "1", "2023W01"),
            case("UPS", "1", "2023W02"),
            case("UPS", "1", "2023W03"),
        ];
        data[0].category = "RO".to_string();
        data[1].category = "TEL".to_string();
        data[2].category = "RO".to_string();

        let section = category_section(&data);
        let trend = section.open_trend.unwrap();
        // 3 weeks x 2 categories, absent cells present with a zero.
        assert_eq!(trend.len(), 6);
        let zeros = trend.iter().filter(|p| p.count == 0).count();
        assert_eq!(zeros, 3);
        assert_eq!(trend[0].name, "2023W01");
    }

    #[test]
    fn partner_breakdowns_are_restricted_to_top_open_partners() {
        let mut data = Vec::new();
        for i in 0..12 {
            let mut r = case("UPS", &format!("C{:02}", i), "2023W05");
            // Two partners have only closed cases.
            if i >= 10 {
                r.status = Status::Closed;
            }
            data.push(r);
        }
        let section = partner_section(&data);
        assert_eq!(section.top_open_partners.len(), 10);
        for pair in &section.open_priority_by_partner {
            assert!(section
                .top_open_partners
                .iter()
                .any(|p| p.name == pair.name));
        }
        assert_eq!(section.summary.cases_in_top, 10);
    }

    #[test]
    fn empty_input_produces_empty_sections() {
        let kpis = main_kpis(&[]);
        assert_eq!(kpis.total_cases, 0);
        assert!(kpis.busiest_open_team.is_none());
        assert!(kpis.weekly.is_none());

        let open = open_sems_section(&[]);
        assert!(open.status_counts.is_empty());
        assert!(open.summary.busiest_team.is_none());

        let customers = customer_section(&[], &[]);
        assert!(customers.top_customers.is_empty());
        assert!(customers.deep_dives.is_empty());
    }
}
