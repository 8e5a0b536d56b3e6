use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cadence_core::pomodoro::{DEFAULT_FOCUS_SECS, FocusTimer};
use cadence_core::service::CadenceService;

use super::helpers::progress_bar;

/// Run one focus countdown in the foreground.
///
/// The interval task is the session's only scheduled resource; Ctrl-C tears
/// it down and abandons the session without contributing stats. Stats are
/// contributed exactly once, when the countdown reaches zero on its own.
pub(crate) async fn cmd_focus_start(
    svc: &CadenceService,
    minutes: Option<u32>,
    json: bool,
) -> Result<()> {
    let total_secs = minutes.map_or(DEFAULT_FOCUS_SECS, |m| m * 60);
    let mut timer = FocusTimer::new(total_secs);
    timer.start();

    if !json {
        let display = timer.display();
        eprintln!("Focus session started ({display}). Ctrl-C to abandon.");
    }

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.tick().await; // first tick fires immediately

    let completion = loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Some(delta) = timer.tick() {
                    break Some(delta);
                }
                if !json {
                    let display = timer.display();
                    let bar = progress_bar(1.0 - timer.progress(), 20);
                    eprint!("\r  {display} {bar}");
                    let _ = std::io::stderr().flush();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                timer.reset();
                break None;
            }
        }
    };

    if !json {
        eprintln!();
    }

    match completion {
        Some(delta) => {
            let stats = svc.record_focus_session(delta, svc.today())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                let minutes = delta.focus_minutes;
                let cycles = stats.cycles;
                println!("Session complete: +{minutes} focus minutes ({cycles} cycle(s) today)");
            }
        }
        None => {
            if json {
                println!("{}", serde_json::json!({ "completed": false }));
            } else {
                println!("Session abandoned — nothing recorded");
            }
        }
    }
    Ok(())
}

pub(crate) fn cmd_focus_stats(svc: &CadenceService, days: u32, json: bool) -> Result<()> {
    let series = svc.day_series(days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
        return Ok(());
    }

    if series.iter().all(|p| p.focus_minutes == 0 && p.cycles == 0) {
        eprintln!("No focus sessions in the last {days} days");
        return Ok(());
    }

    #[derive(Tabled)]
    struct FocusRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Focus")]
        focus: String,
        #[tabled(rename = "Cycles")]
        cycles: i64,
    }

    let rows: Vec<FocusRow> = series
        .iter()
        .map(|p| FocusRow {
            date: p.date.format("%Y-%m-%d").to_string(),
            focus: format!("{} min", p.focus_minutes),
            cycles: p.cycles,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let total_minutes: i64 = series.iter().map(|p| p.focus_minutes).sum();
    let total_cycles: i64 = series.iter().map(|p| p.cycles).sum();
    println!("  TOTAL: {total_minutes} min across {total_cycles} cycle(s)");

    Ok(())
}
