use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

use crate::agg::Pct;
use crate::compare::{PeriodDelta, RatioDelta};

#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "SEM ID")]
    pub sem_id: Option<String>,
    #[serde(rename = "Created On")]
    pub created_on: Option<String>,
    #[serde(rename = "Modified Date Time")]
    pub modified_date_time: Option<String>,
    #[serde(rename = "SEM Status")]
    pub sem_status: Option<String>,
    #[serde(rename = "Priority")]
    pub priority: Option<String>,
    #[serde(rename = "Sales Region")]
    pub sales_region: Option<String>,
    #[serde(rename = "CAT")]
    pub cat: Option<String>,
    #[serde(rename = "Carrier")]
    pub carrier: Option<String>,
    #[serde(rename = "Sold-To ID")]
    pub sold_to_id: Option<String>,
    #[serde(rename = "Assigned To Team")]
    pub assigned_to_team: Option<String>,
    #[serde(rename = "Created by Team Name")]
    pub created_by_team_name: Option<String>,
    #[serde(rename = "SEM Issue Type")]
    pub sem_issue_type: Option<String>,
    #[serde(rename = "SEM Sub issue Type")]
    pub sem_sub_issue_type: Option<String>,
    #[serde(rename = "Root Cause")]
    pub root_cause: Option<String>,
    #[serde(rename = "FW")]
    pub fw: Option<String>,
    #[serde(rename = "Action Age [Days]")]
    pub action_age_days: Option<String>,
}

/// Case status. Source cells occasionally carry qualifiers
/// ("Open - In Progress"), so parsing is by containment and the raw
/// value survives in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Open,
    Closed,
    Other(String),
}

impl Status {
    pub fn parse(s: &str) -> Status {
        if s.contains("Open") {
            Status::Open
        } else if s.contains("Closed") {
            Status::Closed
        } else {
            Status::Other(s.to_string())
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Status::Open)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Status::Closed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Open => write!(f, "Open"),
            Status::Closed => write!(f, "Closed"),
            Status::Other(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Priority {
    P1,
    P2,
    Other(String),
}

impl Priority {
    pub fn parse(s: &str) -> Priority {
        if s.contains("P1") {
            Priority::P1
        } else if s.contains("P2") {
            Priority::P2
        } else {
            Priority::Other(s.to_string())
        }
    }

    pub fn is_p1(&self) -> bool {
        matches!(self, Priority::P1)
    }

    pub fn is_p2(&self) -> bool {
        matches!(self, Priority::P2)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::P1 => write!(f, "P1"),
            Priority::P2 => write!(f, "P2"),
            Priority::Other(s) => write!(f, "{}", s),
        }
    }
}

/// One in-scope escalation case. Immutable once loaded; every pipeline
/// stage copies rather than mutating a shared table.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRecord {
    pub case_id: String,
    pub created_on: NaiveDate,
    pub modified_on: NaiveDate,
    pub status: Status,
    pub priority: Priority,
    pub region: String,
    pub category: String,
    pub carrier: String,
    pub customer_id: String,
    pub assigned_team: String,
    pub created_by_team: String,
    pub issue_type: String,
    pub sub_issue_type: String,
    pub root_cause: String,
    pub period_code: String,
    pub action_age_days: Option<f64>,
    /// Derived by the period tagger; empty until tagged.
    pub quarter: String,
}

#[cfg(test)]
impl CaseRecord {
    /// A minimal in-scope case for tests; tweak fields as needed.
    pub fn sample() -> CaseRecord {
        CaseRecord {
            case_id: "SEM-1".to_string(),
            created_on: NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
            modified_on: NaiveDate::from_ymd_opt(2023, 2, 3).unwrap(),
            status: Status::Open,
            priority: Priority::P2,
            region: "DACH".to_string(),
            category: "RO".to_string(),
            carrier: "UPS".to_string(),
            customer_id: "100001".to_string(),
            assigned_team: "Logistics EU".to_string(),
            created_by_team: "Service Desk".to_string(),
            issue_type: "Delivery".to_string(),
            sub_issue_type: "Late delivery".to_string(),
            root_cause: "Carrier delay".to_string(),
            period_code: "2023W05".to_string(),
            action_age_days: Some(4.0),
            quarter: String::new(),
        }
    }
}

// Ranked result rows handed to the presentation layer. One generic shape
// per aggregation kind instead of one struct per chart.

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct CountRow {
    #[serde(rename = "Name")]
    #[tabled(rename = "Name")]
    pub name: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct PairCountRow {
    #[serde(rename = "Name")]
    #[tabled(rename = "Name")]
    pub name: String,
    #[serde(rename = "Series")]
    #[tabled(rename = "Series")]
    pub series: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct MeanRow {
    #[serde(rename = "Name")]
    #[tabled(rename = "Name")]
    pub name: String,
    #[serde(rename = "Mean")]
    #[tabled(rename = "Mean")]
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct TrendPoint {
    #[serde(rename = "FW")]
    #[tabled(rename = "FW")]
    pub period: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct DailyPoint {
    #[serde(rename = "Date")]
    #[tabled(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
}

/// Follow-up export row: an open case awaiting action, with `Created On`
/// coerced to a calendar date and the action age rounded to whole days.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct FollowUpRow {
    #[serde(rename = "SEM ID")]
    #[tabled(rename = "SEM ID")]
    pub case_id: String,
    #[serde(rename = "Created On")]
    #[tabled(rename = "Created On")]
    pub created_on: NaiveDate,
    #[serde(rename = "Modified Date Time")]
    #[tabled(rename = "Modified Date Time")]
    pub modified_on: NaiveDate,
    #[serde(rename = "SEM Status")]
    #[tabled(rename = "SEM Status")]
    pub status: String,
    #[serde(rename = "Priority")]
    #[tabled(rename = "Priority")]
    pub priority: String,
    #[serde(rename = "Sales Region")]
    #[tabled(rename = "Sales Region")]
    pub region: String,
    #[serde(rename = "CAT")]
    #[tabled(rename = "CAT")]
    pub category: String,
    #[serde(rename = "Carrier")]
    #[tabled(rename = "Carrier")]
    pub carrier: String,
    #[serde(rename = "Sold-To ID")]
    #[tabled(rename = "Sold-To ID")]
    pub customer_id: String,
    #[serde(rename = "Assigned To Team")]
    #[tabled(rename = "Assigned To Team")]
    pub assigned_team: String,
    #[serde(rename = "SEM Issue Type")]
    #[tabled(rename = "SEM Issue Type")]
    pub issue_type: String,
    #[serde(rename = "SEM Sub issue Type")]
    #[tabled(rename = "SEM Sub issue Type")]
    pub sub_issue_type: String,
    #[serde(rename = "Root Cause")]
    #[tabled(rename = "Root Cause")]
    pub root_cause: String,
    #[serde(rename = "FW")]
    #[tabled(rename = "FW")]
    pub period_code: String,
    #[serde(rename = "Action Age [Days]")]
    #[tabled(rename = "Action Age [Days]")]
    pub action_age_days: String,
    #[serde(rename = "Business Days Since Action")]
    #[tabled(rename = "Business Days Since Action")]
    pub business_days_since_action: i64,
}

// Per-section dashboard results. The shell serializes the whole thing to
// JSON and previews/exports the tables it cares about.

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub total_in_range: usize,
    pub main_kpis: Option<MainKpis>,
    pub open_sems: Option<OpenSemsSection>,
    pub priority: Option<PrioritySection>,
    pub category: Option<CategorySection>,
    pub partner: Option<PartnerSection>,
    pub region: Option<RegionSection>,
    pub additional: Option<AdditionalAnalysis>,
    pub carrier: Option<CarrierSection>,
    pub customer: Option<CustomerSection>,
    pub follow_up: Option<FollowUpSection>,
}

#[derive(Debug, Serialize)]
pub struct MainKpis {
    pub total_cases: usize,
    pub open_cases: usize,
    pub open_p1: usize,
    pub pct_open: Pct,
    pub busiest_open_team: Option<String>,
    pub most_common_open_issue: Option<String>,
    pub pct_open_p1: Pct,
    pub total_p1: usize,
    pub weekly: Option<WeeklyMarkers>,
    pub quarterly: Option<QuarterlyMarkers>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyMarkers {
    pub total: PeriodDelta,
    pub open: PeriodDelta,
    pub pct_open: RatioDelta,
    pub p1: PeriodDelta,
    pub open_p1: PeriodDelta,
}

#[derive(Debug, Serialize)]
pub struct QuarterlyMarkers {
    pub total: PeriodDelta,
    pub p1: PeriodDelta,
    pub pct_p1: RatioDelta,
}

#[derive(Debug, Serialize)]
pub struct OpenSemsSection {
    pub status_counts: Vec<CountRow>,
    pub open_by_region: Vec<CountRow>,
    pub open_by_category: Vec<CountRow>,
    pub top_open_partners: Vec<CountRow>,
    pub top_open_teams: Vec<CountRow>,
    pub top_open_issues: Vec<CountRow>,
    pub weekly_trend: Option<Vec<TrendPoint>>,
    pub weekly_status: Option<Vec<PairCountRow>>,
    pub summary: OpenSummary,
}

#[derive(Debug, Serialize)]
pub struct OpenSummary {
    pub busiest_team: Option<String>,
    pub busiest_region: Option<String>,
    pub busiest_category: Option<String>,
    pub busiest_partner: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PrioritySection {
    pub weekly_by_priority: Vec<PairCountRow>,
    pub open_weekly_by_priority: Vec<PairCountRow>,
    pub open_region_by_priority: Vec<PairCountRow>,
    pub open_category_by_priority: Vec<PairCountRow>,
    pub open_priority_counts: Vec<CountRow>,
    pub summary: PrioritySummary,
}

#[derive(Debug, Serialize)]
pub struct PrioritySummary {
    pub open_p1: usize,
    pub open_p2: usize,
    pub pct_open_p1: Pct,
    pub pct_open_p2: Pct,
    pub total_p1: usize,
}

#[derive(Debug, Serialize)]
pub struct CategorySection {
    pub category_counts: Vec<CountRow>,
    pub total_trend: Option<Vec<PairCountRow>>,
    pub open_trend: Option<Vec<PairCountRow>>,
    pub summary: CategorySummary,
}

#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub largest: Option<String>,
    pub largest_share: Pct,
    pub largest_count: usize,
    pub largest_open_count: usize,
    pub open_p1_in_largest: usize,
}

#[derive(Debug, Serialize)]
pub struct PartnerSection {
    pub top_partners: Vec<CountRow>,
    pub top_open_partners: Vec<CountRow>,
    pub priority_by_partner: Vec<PairCountRow>,
    pub open_priority_by_partner: Vec<PairCountRow>,
    pub summary: PartnerSummary,
}

#[derive(Debug, Serialize)]
pub struct PartnerSummary {
    pub cases_in_top: usize,
    pub open_cases_in_top: usize,
    pub share_of_total: Pct,
    pub share_open: Pct,
    pub largest_partner: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegionSection {
    pub region_counts: Vec<CountRow>,
    pub open_priority_by_region: Vec<PairCountRow>,
    pub category_by_region: Vec<PairCountRow>,
    pub summary: RegionSummary,
}

#[derive(Debug, Serialize)]
pub struct RegionSummary {
    pub busiest_region: Option<String>,
    pub busiest_total: usize,
    pub busiest_open: usize,
    pub pct_open: Pct,
}

#[derive(Debug, Serialize)]
pub struct AdditionalAnalysis {
    pub weekly_trend: Option<Vec<TrendPoint>>,
    pub top_issues: Vec<CountRow>,
    pub top_root_causes: Vec<CountRow>,
}

#[derive(Debug, Serialize)]
pub struct CarrierSection {
    pub top_carriers: Vec<CountRow>,
    pub top_open_carriers: Vec<CountRow>,
    pub top_by_action_age: Vec<MeanRow>,
    pub deep_dives: Vec<CarrierDeepDive>,
    pub extra_deep_dives: Vec<CarrierDeepDive>,
    pub already_covered: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CarrierDeepDive {
    pub carrier: String,
    pub top_sub_issues: Vec<CountRow>,
    pub customers_affected: Vec<CountRow>,
    pub daily_trend: Vec<DailyPoint>,
}

#[derive(Debug, Serialize)]
pub struct CustomerSection {
    pub top_customers: Vec<CountRow>,
    pub top_open_customers: Vec<CountRow>,
    pub longest_waiting: Vec<MeanRow>,
    pub over_threshold: Vec<MeanRow>,
    pub deep_dives: Vec<CustomerDeepDive>,
    pub extra_deep_dives: Vec<CustomerDeepDive>,
    pub already_covered: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CustomerDeepDive {
    pub customer: String,
    pub top_sub_issues: Vec<CountRow>,
    pub carriers_affecting: Vec<CountRow>,
    pub top_issues: Vec<CountRow>,
    pub daily_trend: Vec<DailyPoint>,
}

#[derive(Debug, Serialize)]
pub struct FollowUpSection {
    pub rows: Vec<FollowUpRow>,
    pub export_name: String,
}
