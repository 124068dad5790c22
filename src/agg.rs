// Generic ranked group-by primitives. Every "Top N by X" view in the
// dashboard goes through these instead of repeating the
// accumulate/sort/head dance per dimension.

use crate::types::{CaseRecord, CountRow, MeanRow, PairCountRow};
use crate::util::{average, round2};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Percentage of `part` in `whole`, or the bare magnitude when the whole
/// rounds to zero (the division-by-zero branch). Keeping the two shapes
/// as variants lets callers read `value()` instead of re-parsing a
/// formatted string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Pct {
    Ratio(f64),
    Magnitude(f64),
}

impl Pct {
    pub fn of(part: f64, whole: f64) -> Pct {
        if whole.round() == 0.0 {
            Pct::Magnitude(round2(100.0 * part))
        } else {
            Pct::Ratio(round2(100.0 * part / whole))
        }
    }

    pub fn value(self) -> f64 {
        match self {
            Pct::Ratio(v) | Pct::Magnitude(v) => v,
        }
    }

    /// Difference of two percentages, itself a percentage. Used for
    /// markers whose delta is "percentage points", not a ratio of ratios.
    pub fn diff(self, other: Pct) -> Pct {
        Pct::Ratio(round2(self.value() - other.value()))
    }
}

fn fmt_pct_value(v: f64) -> String {
    // At least one decimal place, two when the value needs them
    // ("25.0", "33.33").
    let tenths = v * 10.0;
    if (tenths.round() - tenths).abs() < 1e-9 {
        format!("{:.1}", v)
    } else {
        format!("{:.2}", v)
    }
}

impl fmt::Display for Pct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Pct::Ratio(v) => write!(f, "{}%", fmt_pct_value(v)),
            Pct::Magnitude(v) => {
                if v.fract() == 0.0 {
                    write!(f, "{}", v as i64)
                } else {
                    write!(f, "{}", fmt_pct_value(v))
                }
            }
        }
    }
}

/// Count rows per group, ranked descending. Grouping goes through a
/// `BTreeMap`, so equal counts keep ascending key order after the stable
/// sort.
pub fn group_count<K>(rows: &[CaseRecord], key: K) -> Vec<CountRow>
where
    K: Fn(&CaseRecord) -> String,
{
    let mut groups: BTreeMap<String, usize> = BTreeMap::new();
    for r in rows {
        *groups.entry(key(r)).or_insert(0) += 1;
    }
    let mut out: Vec<CountRow> = groups
        .into_iter()
        .map(|(name, count)| CountRow { name, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

/// Two-dimension breakdown (e.g. region by priority), ranked descending.
pub fn group_count2<K>(rows: &[CaseRecord], key: K) -> Vec<PairCountRow>
where
    K: Fn(&CaseRecord) -> (String, String),
{
    let mut groups: BTreeMap<(String, String), usize> = BTreeMap::new();
    for r in rows {
        *groups.entry(key(r)).or_insert(0) += 1;
    }
    let mut out: Vec<PairCountRow> = groups
        .into_iter()
        .map(|((name, series), count)| PairCountRow { name, series, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

/// Average a numeric column per group, rounded to 2 decimal places and
/// ranked descending. Missing values are skipped; a group with no
/// samples at all produces no row.
pub fn group_mean<K, V>(rows: &[CaseRecord], key: K, value: V) -> Vec<MeanRow>
where
    K: Fn(&CaseRecord) -> String,
    V: Fn(&CaseRecord) -> Option<f64>,
{
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in rows {
        if let Some(v) = value(r) {
            groups.entry(key(r)).or_default().push(v);
        }
    }
    let mut out: Vec<MeanRow> = groups
        .into_iter()
        .map(|(name, samples)| MeanRow {
            name,
            mean: round2(average(&samples)),
        })
        .collect();
    out.sort_by(|a, b| b.mean.partial_cmp(&a.mean).unwrap_or(Ordering::Equal));
    out
}

/// Head of size `n`; fewer groups than `n` just returns them all.
pub fn top_n<T>(mut rows: Vec<T>, n: usize) -> Vec<T> {
    rows.truncate(n);
    rows
}

/// Groups with strictly more than `floor` rows. Feeds the carrier and
/// customer allow-lists offered for extra deep-dives.
pub fn above(rows: Vec<CountRow>, floor: usize) -> Vec<CountRow> {
    rows.into_iter().filter(|r| r.count > floor).collect()
}

/// The highest-ranked group, if any. Empty input is a "no data" answer,
/// never a panic.
pub fn largest(rows: &[CountRow]) -> Option<&CountRow> {
    rows.first()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CaseRecord;

    fn with_region(region: &str) -> CaseRecord {
        let mut r = CaseRecord::sample();
        r.region = region.to_string();
        r
    }

    #[test]
    fn group_count_partitions_all_rows() {
        let rows = vec![
            with_region("DACH"),
            with_region("DACH"),
            with_region("UK&I"),
            with_region("North Europe"),
        ];
        let counts = group_count(&rows, |r| r.region.clone());
        let total: usize = counts.iter().map(|c| c.count).sum();
        assert_eq!(total, rows.len());
        assert_eq!(counts[0].name, "DACH");
        assert_eq!(counts[0].count, 2);
    }

    #[test]
    fn group_count_breaks_ties_by_ascending_key() {
        let rows = vec![with_region("UK&I"), with_region("DACH")];
        let counts = group_count(&rows, |r| r.region.clone());
        assert_eq!(counts[0].name, "DACH");
        assert_eq!(counts[1].name, "UK&I");
    }

    #[test]
    fn top_n_returns_all_when_fewer_groups_exist() {
        let rows = vec![with_region("DACH"), with_region("UK&I")];
        let top = top_n(group_count(&rows, |r| r.region.clone()), 5);
        assert_eq!(top.len(), 2);
        assert!(top_n(Vec::<CountRow>::new(), 3).is_empty());
    }

    #[test]
    fn above_keeps_strictly_greater_counts() {
        let counts = vec![
            CountRow { name: "a".into(), count: 80 },
            CountRow { name: "b".into(), count: 75 },
            CountRow { name: "c".into(), count: 10 },
        ];
        let kept = above(counts, 75);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "a");
    }

    #[test]
    fn group_mean_rounds_and_skips_missing() {
        let mut a = CaseRecord::sample();
        a.carrier = "UPS".into();
        a.action_age_days = Some(1.0);
        let mut b = CaseRecord::sample();
        b.carrier = "UPS".into();
        b.action_age_days = Some(2.0);
        let mut c = CaseRecord::sample();
        c.carrier = "UPS".into();
        c.action_age_days = None;
        let mut d = CaseRecord::sample();
        d.carrier = "DHL".into();
        d.action_age_days = None;

        let means = group_mean(&[a, b, c, d], |r| r.carrier.clone(), |r| r.action_age_days);
        assert_eq!(means.len(), 1);
        assert_eq!(means[0].name, "UPS");
        assert_eq!(means[0].mean, 1.5);
    }

    #[test]
    fn pct_formats_ratio_and_bare_magnitude() {
        assert_eq!(Pct::of(50.0, 200.0).to_string(), "25.0%");
        assert_eq!(Pct::of(0.0, 0.0).to_string(), "0");
        assert_eq!(Pct::of(1.0, 3.0).to_string(), "33.33%");
        // Whole rounds to zero: the part comes back scaled, unlabelled.
        assert_eq!(Pct::of(3.0, 0.2), Pct::Magnitude(300.0));
    }

    #[test]
    fn pct_diff_is_percentage_points() {
        let cur = Pct::of(30.0, 100.0);
        let prev = Pct::of(25.0, 100.0);
        assert_eq!(cur.diff(prev), Pct::Ratio(5.0));
        assert_eq!(cur.diff(prev).to_string(), "5.0%");
    }

    #[test]
    fn empty_input_gives_empty_rankings() {
        assert!(group_count(&[], |r| r.region.clone()).is_empty());
        assert!(group_mean(&[], |r| r.region.clone(), |r| r.action_age_days).is_empty());
        assert!(largest(&[]).is_none());
    }
}
