// Pipeline entry point: explicit parameters in, derived section tables
// out. The shell calls `recompute` whenever any input changes; nothing
// in here keeps state between runs.

use crate::agg::{above, group_count};
use crate::followup::{DEFAULT_MIN_ACTION_DAYS, MAX_MIN_ACTION_DAYS};
use crate::types::{CaseRecord, Dashboard};
use crate::{followup, reports};
use chrono::{Duration, NaiveDate};
use log::warn;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    MainKpis,
    OpenSems,
    Priority,
    Category,
    Partner,
    Region,
    AdditionalAnalysis,
    Carrier,
    Customer,
    FollowUp,
}

impl Section {
    pub const ALL: [Section; 10] = [
        Section::MainKpis,
        Section::OpenSems,
        Section::Priority,
        Section::Category,
        Section::Partner,
        Section::Region,
        Section::AdditionalAnalysis,
        Section::Carrier,
        Section::Customer,
        Section::FollowUp,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Section::MainKpis => "Main KPIs",
            Section::OpenSems => "Open SEMS",
            Section::Priority => "Priority",
            Section::Category => "Category",
            Section::Partner => "Partner",
            Section::Region => "Region",
            Section::AdditionalAnalysis => "Additional Analysis",
            Section::Carrier => "Carrier",
            Section::Customer => "Customer",
            Section::FollowUp => "Action Day Follow Up",
        }
    }
}

/// Everything the dashboard run depends on, passed in explicitly.
#[derive(Debug, Clone)]
pub struct Params {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sections: Vec<Section>,
    pub min_action_days: u32,
    /// Extra carriers/customers to deep-dive beyond the automatic top 5.
    pub extra_carriers: Vec<String>,
    pub extra_customers: Vec<String>,
}

impl Params {
    /// The defaults the sidebar starts from: last 30 days, main KPIs
    /// only, follow-up threshold of 10 business days.
    pub fn default_for(today: NaiveDate) -> Params {
        Params {
            start_date: today - Duration::days(30),
            end_date: today,
            sections: vec![Section::MainKpis],
            min_action_days: DEFAULT_MIN_ACTION_DAYS,
            extra_carriers: Vec::new(),
            extra_customers: Vec::new(),
        }
    }

    pub fn clamped_action_days(&self) -> u32 {
        self.min_action_days.min(MAX_MIN_ACTION_DAYS)
    }

    fn wants(&self, section: Section) -> bool {
        self.sections.contains(&section)
    }
}

/// Inclusive calendar-date window on `created_on`. A reversed range is
/// not validated and simply selects nothing.
pub fn select_range(rows: &[CaseRecord], start: NaiveDate, end: NaiveDate) -> Vec<CaseRecord> {
    rows.iter()
        .filter(|r| r.created_on >= start && r.created_on <= end)
        .cloned()
        .collect()
}

/// The quarter token of a period code: everything before the week
/// marker, or the code itself when there is none.
pub fn quarter_of(period_code: &str) -> String {
    match period_code.split_once('W') {
        Some((q, _)) => q.to_string(),
        None => period_code.to_string(),
    }
}

/// Tag every row with its quarter. Reads only `period_code`, so applying
/// it twice changes nothing.
pub fn tag_quarters(rows: &[CaseRecord]) -> Vec<CaseRecord> {
    rows.iter()
        .map(|r| {
            let mut r = r.clone();
            r.quarter = quarter_of(&r.period_code);
            r
        })
        .collect()
}

pub fn open_cases(rows: &[CaseRecord]) -> Vec<CaseRecord> {
    rows.iter().filter(|r| r.status.is_open()).cloned().collect()
}

pub fn closed_cases(rows: &[CaseRecord]) -> Vec<CaseRecord> {
    rows.iter().filter(|r| r.status.is_closed()).cloned().collect()
}

/// Distinct quarters present, most recent first.
pub fn sorted_quarters(rows: &[CaseRecord]) -> Vec<String> {
    let set: BTreeSet<String> = rows.iter().map(|r| quarter_of(&r.period_code)).collect();
    set.into_iter().rev().collect()
}

/// Number of distinct fiscal weeks in the table; gates the weekly trend
/// and comparison views.
pub fn distinct_week_count(rows: &[CaseRecord]) -> usize {
    rows.iter()
        .map(|r| r.period_code.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Carriers with enough volume to be worth a manual deep-dive pick.
/// The floor is arbitrary, chosen for usability of the picker.
pub fn carrier_allowlist(rows: &[CaseRecord]) -> Vec<String> {
    above(group_count(rows, |r| r.carrier.clone()), 40)
        .into_iter()
        .map(|c| c.name)
        .collect()
}

/// Customers with enough volume to be worth a manual deep-dive pick.
pub fn customer_allowlist(rows: &[CaseRecord]) -> Vec<String> {
    above(group_count(rows, |r| r.customer_id.clone()), 75)
        .into_iter()
        .map(|c| c.name)
        .collect()
}

/// Run the whole pipeline: date window, quarter tagging, then one
/// builder per requested section. Pure; the same inputs always produce
/// the same dashboard.
pub fn recompute(params: &Params, rows: &[CaseRecord], today: NaiveDate) -> Dashboard {
    let ranged = select_range(rows, params.start_date, params.end_date);
    if ranged.is_empty() {
        warn!(
            "no case data between {} and {}",
            params.start_date, params.end_date
        );
    }
    let data = tag_quarters(&ranged);

    Dashboard {
        total_in_range: data.len(),
        main_kpis: params
            .wants(Section::MainKpis)
            .then(|| reports::main_kpis(&data)),
        open_sems: params
            .wants(Section::OpenSems)
            .then(|| reports::open_sems_section(&data)),
        priority: params
            .wants(Section::Priority)
            .then(|| reports::priority_section(&data)),
        category: params
            .wants(Section::Category)
            .then(|| reports::category_section(&data)),
        partner: params
            .wants(Section::Partner)
            .then(|| reports::partner_section(&data)),
        region: params
            .wants(Section::Region)
            .then(|| reports::region_section(&data)),
        additional: params
            .wants(Section::AdditionalAnalysis)
            .then(|| reports::additional_analysis(&data)),
        carrier: params
            .wants(Section::Carrier)
            .then(|| reports::carrier_section(&data, &params.extra_carriers)),
        customer: params
            .wants(Section::Customer)
            .then(|| reports::customer_section(&data, &params.extra_customers)),
        follow_up: params
            .wants(Section::FollowUp)
            .then(|| followup::follow_up_section(&data, params.clamped_action_days(), today)),
    }
}
