use crate::error::{LoadError, SchemaError};
use crate::types::{CaseRecord, Priority, RawRow, Status};
use crate::util::{parse_date_safe, parse_f64_safe};
use csv::ReaderBuilder;
use log::{debug, info};
use std::io::Read;

/// Columns the pipeline actually consumes. Any of these missing from the
/// header row fails the run before a single row is parsed.
pub const REQUIRED_COLUMNS: [&str; 16] = [
    "Sales Region",
    "Created by Team Name",
    "Carrier",
    "CAT",
    "Assigned To Team",
    "Created On",
    "Modified Date Time",
    "SEM Status",
    "Priority",
    "Sold-To ID",
    "FW",
    "SEM Issue Type",
    "SEM Sub issue Type",
    "Root Cause",
    "SEM ID",
    "Action Age [Days]",
];

/// Columns the export carries that the dashboard never reads. Listed so
/// the drop is a documented decision; they are simply not mapped.
pub const DROPPED_COLUMNS: [&str; 5] = [
    "RMA Nr",
    "Assigned To User Name",
    "Resolution",
    "Wk 12/13",
    "Sales District",
];

/// The four regions the dashboard reports on.
pub const REGIONS_IN_SCOPE: [&str; 4] = ["South Europe", "DACH", "UK&I", "North Europe"];

/// Cases created by these teams are return/refurbishment flows handled
/// elsewhere, never escalation work.
const EXCLUDED_TEAM_MARKERS: [&str; 3] = ["RMA", "CSS CRU", "C2C"];

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub parse_errors: usize,
    /// Rows excluded by the region/team/category scope rules.
    pub filtered_rows: usize,
}

pub fn load_cases(path: &str) -> Result<(Vec<CaseRecord>, LoadReport), LoadError> {
    let file = std::fs::File::open(path)?;
    load_cases_from_reader(file)
}

/// Reads the CSV export of the case sheet, validates the schema, parses
/// rows (skip-and-count on bad cells) and applies the in-scope filter.
pub fn load_cases_from_reader<R: Read>(
    input: R,
) -> Result<(Vec<CaseRecord>, LoadReport), LoadError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(input);
    check_required_columns(rdr.headers()?)?;

    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut parsed: Vec<CaseRecord> = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                parse_errors += 1;
                continue;
            }
        };
        match clean_row(row) {
            Some(rec) => parsed.push(rec),
            None => parse_errors += 1,
        }
    }

    let parsed_rows = parsed.len();
    let kept = filter_in_scope(parsed);
    let report = LoadReport {
        total_rows,
        kept_rows: kept.len(),
        parse_errors,
        filtered_rows: parsed_rows - kept.len(),
    };
    info!(
        "loaded {} rows: {} in scope, {} filtered, {} parse errors",
        report.total_rows, report.kept_rows, report.filtered_rows, report.parse_errors
    );
    Ok((kept, report))
}

/// Every required column must be present, with its exact header.
/// Checked up front so a renamed column fails loudly instead of
/// producing a dashboard full of empty dimensions.
pub fn check_required_columns(headers: &csv::StringRecord) -> Result<(), SchemaError> {
    for col in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == col) {
            return Err(SchemaError {
                column: col.to_string(),
            });
        }
    }
    debug!("schema ok; ignoring drop-list columns {:?}", DROPPED_COLUMNS);
    Ok(())
}

/// One raw row into a typed record. Rows whose dates cannot be parsed
/// are unusable for any time-based view and are skipped.
fn clean_row(row: RawRow) -> Option<CaseRecord> {
    let created_on = parse_date_safe(row.created_on.as_deref())?;
    let modified_on = parse_date_safe(row.modified_date_time.as_deref())?;

    let text = |v: Option<String>| v.unwrap_or_default().trim().to_string();

    Some(CaseRecord {
        case_id: text(row.sem_id),
        created_on,
        modified_on,
        status: Status::parse(row.sem_status.as_deref().unwrap_or("")),
        priority: Priority::parse(row.priority.as_deref().unwrap_or("")),
        region: text(row.sales_region),
        category: text(row.cat),
        carrier: text(row.carrier),
        customer_id: text(row.sold_to_id),
        assigned_team: text(row.assigned_to_team),
        created_by_team: text(row.created_by_team_name),
        issue_type: text(row.sem_issue_type),
        sub_issue_type: text(row.sem_sub_issue_type),
        root_cause: text(row.root_cause),
        period_code: text(row.fw),
        action_age_days: parse_f64_safe(row.action_age_days.as_deref()),
        quarter: String::new(),
    })
}

/// Restrict the table to dashboard scope:
/// - only the four in-scope regions,
/// - no cases created by RMA / CSS CRU / C2C teams,
/// - no RMA carriers, no AOU category, no C2C assignee teams.
///
/// All containment checks are case-sensitive; a missing cell (empty
/// string after cleaning) never matches, so it never causes a drop on
/// the exclusion rules. Pure and idempotent.
pub fn filter_in_scope(rows: Vec<CaseRecord>) -> Vec<CaseRecord> {
    rows.into_iter()
        .filter(|r| REGIONS_IN_SCOPE.contains(&r.region.as_str()))
        .filter(|r| !EXCLUDED_TEAM_MARKERS.iter().any(|m| r.created_by_team.contains(m)))
        .filter(|r| !r.carrier.contains("RMA"))
        .filter(|r| !r.category.contains("AOU"))
        .filter(|r| !r.assigned_team.contains("C2C"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "SEM ID,Created On,Modified Date Time,SEM Status,Priority,Sales Region,CAT,Carrier,Sold-To ID,Assigned To Team,Created by Team Name,SEM Issue Type,SEM Sub issue Type,Root Cause,FW,Action Age [Days]";

    fn csv_of(rows: &[&str]) -> String {
        let mut s = String::from(HEADER);
        for r in rows {
            s.push('\n');
            s.push_str(r);
        }
        s
    }

    #[test]
    fn missing_required_column_is_a_schema_error() {
        // No `Sales Region` column at all.
        let input = "SEM ID,Created On\nSEM-1,2023-02-01";
        let err = load_cases_from_reader(Cursor::new(input)).unwrap_err();
        match err {
            LoadError::Schema(e) => assert_eq!(e.column, "Sales Region"),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn loads_and_keeps_an_in_scope_row() {
        let data = csv_of(&[
            "SEM-1,2023-02-01,2023-02-03 09:30:00,Open,P1,DACH,RO,UPS,100001,Logistics EU,Service Desk,Delivery,Late delivery,Carrier delay,2023W05,4",
        ]);
        let (rows, report) = load_cases_from_reader(Cursor::new(data)).unwrap();
        assert_eq!(report.total_rows, 1);
        assert_eq!(report.kept_rows, 1);
        let r = &rows[0];
        assert_eq!(r.case_id, "SEM-1");
        assert!(r.status.is_open());
        assert!(r.priority.is_p1());
        assert_eq!(r.action_age_days, Some(4.0));
        assert_eq!(r.modified_on, chrono::NaiveDate::from_ymd_opt(2023, 2, 3).unwrap());
    }

    #[test]
    fn out_of_scope_rows_are_filtered_not_errors() {
        let data = csv_of(&[
            // Wrong region.
            "SEM-1,2023-02-01,2023-02-03,Open,P1,APAC,RO,UPS,100001,Logistics EU,Service Desk,Delivery,Late,Carrier,2023W05,4",
            // Created by an excluded team.
            "SEM-2,2023-02-01,2023-02-03,Open,P1,DACH,RO,UPS,100001,Logistics EU,CSS CRU Desk,Delivery,Late,Carrier,2023W05,4",
            // RMA carrier.
            "SEM-3,2023-02-01,2023-02-03,Open,P1,DACH,RO,RMA Express,100001,Logistics EU,Service Desk,Delivery,Late,Carrier,2023W05,4",
            // AOU category.
            "SEM-4,2023-02-01,2023-02-03,Open,P1,DACH,AOU,UPS,100001,Logistics EU,Service Desk,Delivery,Late,Carrier,2023W05,4",
            // C2C assignee team.
            "SEM-5,2023-02-01,2023-02-03,Open,P1,DACH,RO,UPS,100001,C2C Team,Service Desk,Delivery,Late,Carrier,2023W05,4",
            // In scope.
            "SEM-6,2023-02-01,2023-02-03,Open,P1,UK&I,TEL,DHL,100002,Logistics EU,Service Desk,Delivery,Late,Carrier,2023W05,4",
        ]);
        let (rows, report) = load_cases_from_reader(Cursor::new(data)).unwrap();
        assert_eq!(report.kept_rows, 1);
        assert_eq!(report.filtered_rows, 5);
        assert_eq!(rows[0].case_id, "SEM-6");
    }

    #[test]
    fn missing_cells_do_not_match_exclusion_rules() {
        // Empty carrier and empty assignee team must not trip the
        // containment checks.
        let data = csv_of(&[
            "SEM-1,2023-02-01,2023-02-03,Open,P2,DACH,RO,,100001,,Service Desk,Delivery,Late,Carrier,2023W05,",
        ]);
        let (rows, report) = load_cases_from_reader(Cursor::new(data)).unwrap();
        assert_eq!(report.kept_rows, 1);
        assert_eq!(rows[0].action_age_days, None);
    }

    #[test]
    fn unparseable_dates_are_counted_not_fatal() {
        let data = csv_of(&[
            "SEM-1,not-a-date,2023-02-03,Open,P1,DACH,RO,UPS,100001,Logistics EU,Service Desk,Delivery,Late,Carrier,2023W05,4",
            "SEM-2,2023-02-01,2023-02-03,Open,P1,DACH,RO,UPS,100001,Logistics EU,Service Desk,Delivery,Late,Carrier,2023W05,4",
        ]);
        let (rows, report) = load_cases_from_reader(Cursor::new(data)).unwrap();
        assert_eq!(report.parse_errors, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].case_id, "SEM-2");
    }

    #[test]
    fn filter_is_idempotent_and_scope_holds() {
        let data = csv_of(&[
            "SEM-1,2023-02-01,2023-02-03,Open,P1,DACH,RO,UPS,100001,Logistics EU,Service Desk,Delivery,Late,Carrier,2023W05,4",
            "SEM-2,2023-02-01,2023-02-03,Closed,P2,South Europe,TEL,DHL,100002,Logistics EU,Service Desk,Delivery,Late,Carrier,2023W05,2",
            "SEM-3,2023-02-01,2023-02-03,Open,P1,LATAM,RO,UPS,100003,Logistics EU,Service Desk,Delivery,Late,Carrier,2023W05,1",
        ]);
        let (rows, _) = load_cases_from_reader(Cursor::new(data)).unwrap();
        let twice = filter_in_scope(rows.clone());
        assert_eq!(twice, rows);
        for r in &rows {
            assert!(REGIONS_IN_SCOPE.contains(&r.region.as_str()));
            assert!(!r.category.contains("AOU"));
        }
    }
}
