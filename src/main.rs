// Entry point and high-level CLI flow.
//
// The binary is a thin shell around the pipeline:
// - Option [1] loads and cleans the case export, printing diagnostics.
// - Option [2] re-runs the dashboard pipeline over the loaded table and
//   writes the report artifacts.
// - After generating reports, the user can choose to go back to the
//   selection menu or exit.
mod agg;
mod compare;
mod error;
mod followup;
mod loader;
mod output;
mod pipeline;
mod reports;
mod types;
mod util;

use chrono::Local;
use once_cell::sync::Lazy;
use pipeline::{Params, Section};
use std::io::{self, Write};
use std::sync::Mutex;
use types::CaseRecord;

// Simple in-memory app state so we only load/clean the export once but
// can regenerate the dashboard multiple times in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<Vec<CaseRecord>>,
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the selection menu after
/// generating the dashboard.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        let resp = buf.trim().to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: load and clean the case export.
///
/// On success, we store the in-scope records in `APP_STATE` and print
/// a short textual summary of what happened.
fn handle_load() {
    let path = "sems_cases.csv";
    match loader::load_cases(path) {
        Ok((data, report)) => {
            println!(
                "Processing dataset... ({} rows loaded, {} in dashboard scope)",
                util::format_int(report.total_rows as i64),
                util::format_int(report.kept_rows as i64)
            );
            println!(
                "Note: {} rows skipped due to parse/validation errors.",
                util::format_int(report.parse_errors as i64)
            );
            println!(
                "Note: {} rows excluded by region/team/category rules.",
                util::format_int(report.filtered_rows as i64)
            );
            let carriers = pipeline::carrier_allowlist(&data);
            let customers = pipeline::customer_allowlist(&data);
            println!(
                "Deep-dive picks available: {} carriers, {} customers.",
                carriers.len(),
                customers.len()
            );
            let quarters = pipeline::sorted_quarters(&data);
            println!("Quarters present: {}", quarters.join(", "));
            println!();
            let mut state = APP_STATE.lock().unwrap();
            state.data = Some(data);
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

/// Handle option [2]: run the pipeline over the loaded table and write
/// the dashboard artifacts.
///
/// This function is intentionally side-effectful:
/// - writes report CSV files and the follow-up export,
/// - writes the full dashboard JSON,
/// - and prints markdown previews of the headline tables.
fn handle_generate_dashboard() {
    let data = {
        let state = APP_STATE.lock().unwrap();
        state.data.clone()
    };
    let Some(data) = data else {
        println!("Error: No data loaded. Please load the case export first (option 1).\n");
        return;
    };

    let today = Local::now().date_naive();
    let mut params = Params::default_for(today);
    params.sections = Section::ALL.to_vec();

    println!("Generating dashboard for {}..{} ...", params.start_date, params.end_date);
    let dash = pipeline::recompute(&params, &data, today);
    if dash.total_in_range == 0 {
        println!("No SEMS data to analyse in the selected date range.\n");
        return;
    }
    println!("Outputs saved to individual files...\n");

    if let Some(kpis) = &dash.main_kpis {
        println!("Main KPIs");
        println!("  Number of SEMS:     {}", kpis.total_cases);
        println!("  Open cases:         {} ({})", kpis.open_cases, kpis.pct_open);
        println!("  Open Priority 1:    {} ({})", kpis.open_p1, kpis.pct_open_p1);
        println!("  Total Priority 1:   {}", kpis.total_p1);
        if let Some(team) = &kpis.busiest_open_team {
            println!("  Team most cases:    {}", team);
        }
        if let Some(issue) = &kpis.most_common_open_issue {
            println!("  Most common issue:  {}", issue);
        }
        if let Some(w) = &kpis.weekly {
            println!("  Week on week:");
            println!(
                "    No. SEMS {} (prev {}, {})",
                w.total.current, w.total.previous, w.total.delta
            );
            println!(
                "    No. Open {} (prev {}, {})",
                w.open.current, w.open.previous, w.open.delta
            );
            println!(
                "    % Open {} (prev {}, {})",
                w.pct_open.current, w.pct_open.previous, w.pct_open.delta
            );
            println!(
                "    No. P1 {} (prev {}, {})",
                w.p1.current, w.p1.previous, w.p1.delta
            );
            println!(
                "    No. Open P1 {} (prev {}, {})",
                w.open_p1.current, w.open_p1.previous, w.open_p1.delta
            );
        }
        if let Some(q) = &kpis.quarterly {
            println!("  Quarter on quarter:");
            println!(
                "    No. SEMS {} (prev {}, {})",
                q.total.current, q.total.previous, q.total.delta
            );
            println!(
                "    No. P1 {} (prev {}, {})",
                q.p1.current, q.p1.previous, q.p1.delta
            );
            println!(
                "    % P1 {} (prev {}, {})",
                q.pct_p1.current, q.pct_p1.previous, q.pct_p1.delta
            );
        }
        println!();
    }

    if let Some(open) = &dash.open_sems {
        output::preview_table("Open SEMS by Region", None, &open.open_by_region, 4);
        output::preview_table(
            "Top 10 Partners by Open Orders",
            None,
            &open.top_open_partners,
            3,
        );
    }

    if let Some(region) = &dash.region {
        let file = "report_region_counts.csv";
        if let Err(e) = output::write_csv(file, &region.region_counts) {
            eprintln!("Write error: {}", e);
        }
        output::preview_table(
            "Total SEMS by Region",
            Some("Full table exported to report_region_counts.csv"),
            &region.region_counts,
            4,
        );
    }

    if let Some(carrier) = &dash.carrier {
        let file = "report_top_carriers.csv";
        if let Err(e) = output::write_csv(file, &carrier.top_carriers) {
            eprintln!("Write error: {}", e);
        }
        output::preview_table(
            "Top 10 Carriers by SEMS created",
            Some("Full table exported to report_top_carriers.csv"),
            &carrier.top_carriers,
            3,
        );
        if let Some(slowest) = carrier.top_by_action_age.first() {
            println!(
                "Longest average action age: {} ({} days)",
                slowest.name,
                util::format_number(slowest.mean, 2)
            );
        }
        for dive in &carrier.deep_dives {
            println!(
                "Carrier deep dive: {} ({} sub-issues, {} customers affected)",
                dive.carrier,
                dive.top_sub_issues.len(),
                dive.customers_affected.len()
            );
        }
        println!();
    }

    if let Some(customer) = &dash.customer {
        let file = "report_top_customers.csv";
        if let Err(e) = output::write_csv(file, &customer.top_customers) {
            eprintln!("Write error: {}", e);
        }
        output::preview_table(
            "Top 15 Customers by Total SEMS",
            Some("Full table exported to report_top_customers.csv"),
            &customer.top_customers,
            3,
        );
        output::preview_table(
            "Longest waiting Customers (by Average Action Day)",
            None,
            &customer.longest_waiting,
            3,
        );
    }

    if let Some(follow_up) = &dash.follow_up {
        let file = "report_follow_up.csv";
        if let Err(e) = output::write_csv(file, &follow_up.rows) {
            eprintln!("Write error: {}", e);
        }
        println!(
            "Action Day Follow Up: {} open cases past {} business days.",
            follow_up.rows.len(),
            params.clamped_action_days()
        );
        println!(
            "(Rows exported to {}; download artifact name: {})\n",
            file, follow_up.export_name
        );
    }

    if let Err(e) = output::write_json("dashboard.json", &dash) {
        eprintln!("Write error: {}", e);
    }
    println!("Full dashboard written to dashboard.json\n");
}

fn main() {
    env_logger::init();
    loop {
        println!("SEMS Dashboard");
        println!("[1] Load the case export");
        println!("[2] Generate dashboard reports\n");
        match read_choice().as_str() {
            "1" => {
                handle_load();
            }
            "2" => {
                println!();
                handle_generate_dashboard();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}
