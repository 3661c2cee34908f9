//! compliance-runner: headless runner for the FuelEU compliance desk.
//!
//! Usage:
//!   compliance-runner --data-dir ./data --year 2024
//!   compliance-runner --db desk.db --ipc-mode
//!
//! In IPC mode every stdin line is a JSON command, e.g.
//!   {"cmd":"bank","vessel_id":"R002","year":2024,"amount":1000000}
//! and every stdout line is one JSON response.

use anyhow::Result;
use fueleu_core::{
    command::DeskCommand,
    config::ComplianceConfig,
    desk::ComplianceDesk,
    error::ComplianceError,
    route::{load_routes, RouteFilter},
    store::ComplianceStore,
    types::Year,
};
use std::env;
use std::io::{self, BufRead, Write};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let year: Year = parse_arg(&args, "--year", 2024);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");

    if !ipc_mode {
        println!("FuelEU compliance desk: compliance-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  year:      {year}");
        println!();
    }

    let config = ComplianceConfig::load(data_dir)?;
    let store = ComplianceStore::open(db)?;
    store.migrate()?;
    let desk = ComplianceDesk::new(config, store);

    // A fresh database gets the seed routes; an existing one keeps its own.
    if desk.routes(&RouteFilter::default())?.is_empty() {
        match load_routes(data_dir) {
            Ok(routes) => {
                desk.seed_routes(&routes)?;
            }
            Err(e) => log::warn!("No seed routes loaded: {e}"),
        }
    }

    if ipc_mode {
        run_ipc_loop(&desk)?;
    } else {
        print_summary(&desk, year)?;
    }
    Ok(())
}

fn run_ipc_loop(desk: &ComplianceDesk) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: DeskCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": "bad_request", "message": e.to_string() });
                writeln!(stdout, "{err_json}")?;
                stdout.flush()?;
                continue;
            }
        };
        if cmd == DeskCommand::Quit {
            break;
        }

        let response = match desk.execute(cmd) {
            Ok(value) => value,
            Err(e) => error_response(&e)?,
        };
        writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
        stdout.flush()?;
    }
    Ok(())
}

/// Caller errors become `{"error": kind, "message": ...}` responses.
/// Infrastructure faults end the loop.
fn error_response(e: &ComplianceError) -> Result<serde_json::Value> {
    if !e.is_caller_error() {
        anyhow::bail!("desk failure: {e}");
    }
    log::warn!("command rejected: {e}");
    Ok(serde_json::json!({ "error": e.kind(), "message": e.to_string() }))
}

fn print_summary(desk: &ComplianceDesk, year: Year) -> Result<()> {
    let routes = desk.routes(&RouteFilter { year: Some(year), ..Default::default() })?;

    println!("=== ROUTES {year} ===");
    for r in &routes {
        println!(
            "  {} | {:<12} | {:<4} | {:>8.4} gCO2e/MJ | {:>8.1} t{}",
            r.route_id,
            r.vessel_type,
            r.fuel_type,
            r.ghg_intensity,
            r.fuel_consumption,
            if r.is_baseline { " | baseline" } else { "" }
        );
    }

    println!();
    println!("=== COMPARISON (target {:.4}) ===", desk.config.target_intensity);
    match desk.comparison(year) {
        Ok(report) => {
            println!("  baseline: {} ({:.4})", report.baseline, report.baseline_intensity);
            for c in &report.comparisons {
                println!(
                    "  {} | {:>+8.3}% | {}",
                    c.route_id,
                    c.percent_diff,
                    if c.compliant { "compliant" } else { "non-compliant" }
                );
            }
        }
        Err(ComplianceError::NotFound { .. }) => println!("  (No baseline set for {year})"),
        Err(e) => return Err(e.into()),
    }

    println!();
    println!("=== COMPLIANCE BALANCE ===");
    for r in &routes {
        let cb = desk.compute_cb(&r.route_id, year)?;
        let adjusted = desk.adjusted_cb(&r.route_id, year)?;
        println!(
            "  {} | CB {:>16.0} gCO2e | banked {:>14.0} | adjusted {:>16.0}",
            cb.vessel_id, cb.cb, adjusted.bank_balance, adjusted.cb_after
        );
    }

    let events = desk.events()?;
    if let Some(last) = events.last() {
        println!();
        println!(
            "  {} events logged, last at {}",
            events.len(),
            last.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
