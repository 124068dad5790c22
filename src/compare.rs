// Period comparison: pick the two most recent period values present in
// the data and compute current/previous metrics with a percentage delta.

use crate::agg::Pct;
use crate::types::CaseRecord;
use serde::Serialize;
use std::collections::BTreeSet;

/// Distinct period tokens, most recent first.
///
/// Ordering is a plain descending string sort. That is correct for
/// zero-padded week tokens ("2023W05" < "2023W12") and is kept as-is for
/// mixed quarter-only/week tokens, where lexicographic order is the
/// observed behavior. Chart axes use `util::natural_cmp` instead; the two
/// orderings are deliberately separate.
pub fn distinct_periods<K>(rows: &[CaseRecord], key: K) -> Vec<String>
where
    K: Fn(&CaseRecord) -> String,
{
    let set: BTreeSet<String> = rows.iter().map(|r| key(r)).collect();
    set.into_iter().rev().collect()
}

/// The rows of the two most recent periods, split. `None` when fewer
/// than two distinct periods exist; comparisons are skipped entirely in
/// that case rather than reported against a missing baseline.
pub struct CurrentPrevious {
    pub current_label: String,
    pub previous_label: String,
    pub current: Vec<CaseRecord>,
    pub previous: Vec<CaseRecord>,
}

pub fn split_current_previous<K>(rows: &[CaseRecord], key: K) -> Option<CurrentPrevious>
where
    K: Fn(&CaseRecord) -> String,
{
    let periods = distinct_periods(rows, &key);
    if periods.len() < 2 {
        return None;
    }
    let current_label = periods[0].clone();
    let previous_label = periods[1].clone();
    let current = rows.iter().filter(|r| key(r) == current_label).cloned().collect();
    let previous = rows.iter().filter(|r| key(r) == previous_label).cloned().collect();
    Some(CurrentPrevious {
        current_label,
        previous_label,
        current,
        previous,
    })
}

/// A counted metric in the current and previous period, with
/// `delta = percentage(current - previous, previous)`.
#[derive(Debug, Serialize)]
pub struct PeriodDelta {
    pub current: usize,
    pub previous: usize,
    pub delta: Pct,
}

pub fn count_delta<F>(cp: &CurrentPrevious, metric: F) -> PeriodDelta
where
    F: Fn(&[CaseRecord]) -> usize,
{
    let current = metric(&cp.current);
    let previous = metric(&cp.previous);
    PeriodDelta {
        current,
        previous,
        delta: Pct::of(current as f64 - previous as f64, previous as f64),
    }
}

/// A percentage-valued metric in both periods; its delta is the plain
/// difference in percentage points.
#[derive(Debug, Serialize)]
pub struct RatioDelta {
    pub current: Pct,
    pub previous: Pct,
    pub delta: Pct,
}

pub fn ratio_delta(current: Pct, previous: Pct) -> RatioDelta {
    RatioDelta {
        current,
        previous,
        delta: current.diff(previous),
    }
}
