use anyhow::Result;

use cadence_core::models::DailyStats;
use cadence_core::service::CadenceService;

use super::helpers::{parse_date, progress_bar};

pub(crate) fn cmd_water_log(
    svc: &CadenceService,
    ml: i64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let stats = svc.log_water(ml, date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("+{ml}ml logged");
        print_water_progress(svc, &stats)?;
    }
    Ok(())
}

pub(crate) fn cmd_water_show(svc: &CadenceService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let stats = svc
        .daily_stats(date)?
        .unwrap_or_else(|| DailyStats::zero(date));

    if json {
        let settings = svc.settings()?;
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "date": stats.date,
                "water_ml": stats.water_ml,
                "water_goal_ml": settings.water_goal_ml,
            }))?
        );
    } else {
        print_water_progress(svc, &stats)?;
    }
    Ok(())
}

pub(crate) fn cmd_water_set_weight(svc: &CadenceService, weight_kg: f64, json: bool) -> Result<()> {
    let settings = svc.set_weight(weight_kg)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        let goal_l = settings.water_goal_ml as f64 / 1000.0;
        println!("Weight set to {weight_kg:.1} kg — daily water goal is now {goal_l:.1}L");
    }
    Ok(())
}

fn print_water_progress(svc: &CadenceService, stats: &DailyStats) -> Result<()> {
    let settings = svc.settings()?;
    let goal = settings.water_goal_ml;
    let fraction = stats.water_ml as f64 / goal as f64;
    let bar = progress_bar(fraction, 20);
    let water = stats.water_ml;
    let date = stats.date.format("%Y-%m-%d");
    println!("{date}  {bar} {water}/{goal} ml");
    if stats.water_ml >= goal {
        println!("Daily water goal reached!");
    }
    Ok(())
}
