// Follow-up triage: open cases that have waited too many business days
// since their last action, plus the name of the export artifact the
// presentation layer writes for download.

use crate::types::{CaseRecord, FollowUpRow, FollowUpSection};
use chrono::{Datelike, NaiveDate, Weekday};

pub const DEFAULT_MIN_ACTION_DAYS: u32 = 10;
pub const MAX_MIN_ACTION_DAYS: u32 = 30;

/// Weekdays in the half-open range `[from, to)`; Saturdays and Sundays
/// are skipped. A reversed range counts backwards and comes out
/// negative, matching `numpy.busday_count`.
pub fn business_days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    if to < from {
        return -business_days_between(to, from);
    }
    let mut days = 0i64;
    let mut d = from;
    while d < to {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            days += 1;
        }
        match d.succ_opt() {
            Some(next) => d = next,
            None => break,
        }
    }
    days
}

/// Open cases whose last action is at least `min_action_days` business
/// days old. A case exactly at the threshold is included.
pub fn follow_up_rows(
    rows: &[CaseRecord],
    min_action_days: u32,
    today: NaiveDate,
) -> Vec<FollowUpRow> {
    rows.iter()
        .filter(|r| r.status.is_open())
        .filter_map(|r| {
            let waited = business_days_between(r.modified_on, today);
            if waited < min_action_days as i64 {
                return None;
            }
            Some(FollowUpRow {
                case_id: r.case_id.clone(),
                created_on: r.created_on,
                modified_on: r.modified_on,
                status: r.status.to_string(),
                priority: r.priority.to_string(),
                region: r.region.clone(),
                category: r.category.clone(),
                carrier: r.carrier.clone(),
                customer_id: r.customer_id.clone(),
                assigned_team: r.assigned_team.clone(),
                issue_type: r.issue_type.clone(),
                sub_issue_type: r.sub_issue_type.clone(),
                root_cause: r.root_cause.clone(),
                period_code: r.period_code.clone(),
                action_age_days: r
                    .action_age_days
                    .map(|v| format!("{}", v.round() as i64))
                    .unwrap_or_default(),
                business_days_since_action: waited,
            })
        })
        .collect()
}

/// Download name of the export workbook.
pub fn export_filename(today: NaiveDate) -> String {
    format!("SEM-Follow-Up-{}.xlsx", today.format("%d/%m/%Y"))
}

pub fn follow_up_section(
    rows: &[CaseRecord],
    min_action_days: u32,
    today: NaiveDate,
) -> FollowUpSection {
    FollowUpSection {
        rows: follow_up_rows(rows, min_action_days, today),
        export_name: export_filename(today),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn business_days_skip_weekends() {
        // Friday 2023-02-03 to Monday 2023-02-06: only the Friday counts.
        assert_eq!(business_days_between(date(2023, 2, 3), date(2023, 2, 6)), 1);
        // A full calendar week is five business days.
        assert_eq!(business_days_between(date(2023, 2, 6), date(2023, 2, 13)), 5);
        // Same day: empty half-open range.
        assert_eq!(business_days_between(date(2023, 2, 6), date(2023, 2, 6)), 0);
        // Reversed range counts backwards.
        assert_eq!(business_days_between(date(2023, 2, 13), date(2023, 2, 6)), -5);
    }

    #[test]
    fn under_threshold_cases_yield_an_empty_export() {
        let today = date(2023, 2, 24);
        let mut r = CaseRecord::sample();
        // 5 business days before `today`.
        r.modified_on = date(2023, 2, 17);
        assert_eq!(business_days_between(r.modified_on, today), 5);

        let rows = vec![r.clone(), r];
        assert!(follow_up_rows(&rows, 10, today).is_empty());
    }

    #[test]
    fn open_cases_at_or_past_threshold_are_exported() {
        let today = date(2023, 2, 24);
        let mut stale = CaseRecord::sample();
        stale.modified_on = date(2023, 2, 10); // 10 business days
        let mut closed = CaseRecord::sample();
        closed.modified_on = date(2023, 1, 2);
        closed.status = Status::Closed;

        let out = follow_up_rows(&[stale, closed], 10, today);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].business_days_since_action, 10);
        assert_eq!(out[0].status, "Open");
    }

    #[test]
    fn action_age_is_rounded_to_whole_days() {
        let today = date(2023, 3, 1);
        let mut r = CaseRecord::sample();
        r.modified_on = date(2023, 1, 2);
        r.action_age_days = Some(12.6);
        let out = follow_up_rows(&[r], 10, today);
        assert_eq!(out[0].action_age_days, "13");
    }

    #[test]
    fn export_name_carries_the_day_month_year() {
        assert_eq!(export_filename(date(2023, 2, 5)), "SEM-Follow-Up-05/02/2023.xlsx");
    }
}
