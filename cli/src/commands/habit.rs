use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cadence_core::service::CadenceService;

use super::helpers::{check_mark, parse_date, truncate};

pub(crate) fn cmd_habit_add(svc: &CadenceService, name: &str, json: bool) -> Result<()> {
    let habit = svc.add_habit(name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&habit)?);
    } else {
        let id = habit.id;
        println!("Added habit [{id}]: {}", habit.name);
    }
    Ok(())
}

pub(crate) fn cmd_habit_list(svc: &CadenceService, json: bool) -> Result<()> {
    let habits = svc.habits()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&habits)?);
        return Ok(());
    }

    if habits.is_empty() {
        eprintln!("No habits yet. Use `cadence habit add` to create one.");
        return Ok(());
    }

    let today = svc.today();

    #[derive(Tabled)]
    struct HabitRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Today")]
        today: &'static str,
        #[tabled(rename = "Habit")]
        name: String,
        #[tabled(rename = "Streak")]
        streak: String,
        #[tabled(rename = "Total days")]
        total: usize,
    }

    let rows: Vec<HabitRow> = habits
        .iter()
        .map(|h| HabitRow {
            id: h.id,
            today: check_mark(h.completed_dates.contains(&today)),
            name: truncate(&h.name, 30),
            streak: if h.streak > 0 {
                format!("{} day(s)", h.streak)
            } else {
                "-".to_string()
            },
            total: h.completed_dates.len(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_habit_toggle(
    svc: &CadenceService,
    id: i64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let habit = match date {
        Some(_) => svc.toggle_habit_on(id, parse_date(date)?)?,
        None => svc.toggle_habit_today(id)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&habit)?);
    } else {
        let streak = habit.streak;
        let marked = habit
            .last_checked
            .is_some_and(|d| habit.completed_dates.contains(&d));
        if marked {
            println!("Marked '{}' done — streak: {streak} day(s)", habit.name);
        } else {
            println!("Unmarked '{}' — streak: {streak} day(s)", habit.name);
        }
    }
    Ok(())
}

pub(crate) fn cmd_habit_delete(svc: &CadenceService, id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_habit(id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else if deleted {
        println!("Deleted habit {id}");
    } else {
        eprintln!("Habit {id} not found");
    }
    Ok(())
}
