use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cadence_core::service::CadenceService;

use super::helpers::{format_amount, parse_date, progress_bar};

pub(crate) fn cmd_summary(svc: &CadenceService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let summary = svc.day_summary(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let day = summary.date.format("%Y-%m-%d");
    println!("=== {day} ===\n");

    let tasks_done = summary.tasks_done;
    let tasks_total = summary.tasks_total;
    println!("  TASKS:  {tasks_done}/{tasks_total} done");

    let habits_done = summary.habits_done;
    let habits_total = summary.habits_total;
    println!("  HABITS: {habits_done}/{habits_total} done today");

    let water = summary.water_ml;
    let goal = summary.water_goal_ml;
    let bar = progress_bar(water as f64 / goal as f64, 10);
    println!("  WATER:  {bar} {water}/{goal} ml");

    let focus = summary.focus_minutes;
    let cycles = summary.cycles;
    println!("  FOCUS:  {focus} min, {cycles} cycle(s)");

    let net = format_amount(summary.net_balance);
    println!("  BALANCE: {net}");

    let events = summary.events_today;
    if events > 0 {
        println!("  EVENTS: {events} today");
    }

    Ok(())
}

pub(crate) fn cmd_history(svc: &CadenceService, days: u32, json: bool) -> Result<()> {
    let series = svc.day_series(days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
        return Ok(());
    }

    if series
        .iter()
        .all(|p| p.water_ml == 0 && p.focus_minutes == 0)
    {
        eprintln!("No activity in the last {days} days");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Water")]
        water: String,
        #[tabled(rename = "Focus")]
        focus: String,
        #[tabled(rename = "Cycles")]
        cycles: i64,
    }

    let rows: Vec<HistoryRow> = series
        .iter()
        .map(|p| HistoryRow {
            date: p.date.format("%Y-%m-%d").to_string(),
            water: format!("{} ml", p.water_ml),
            focus: format!("{} min", p.focus_minutes),
            cycles: p.cycles,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_weekly(svc: &CadenceService, weeks: u32, json: bool) -> Result<()> {
    let series = svc.week_series(weeks)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct WeekRow {
        #[tabled(rename = "Week")]
        week: String,
        #[tabled(rename = "Water")]
        water: String,
        #[tabled(rename = "Focus")]
        focus: String,
        #[tabled(rename = "Cycles")]
        cycles: i64,
    }

    let rows: Vec<WeekRow> = series
        .iter()
        .map(|w| WeekRow {
            week: w.week.clone(),
            water: format!("{} ml", w.water_ml),
            focus: format!("{} min", w.focus_minutes),
            cycles: w.cycles,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}
