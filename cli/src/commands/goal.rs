use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cadence_core::service::CadenceService;

use super::helpers::{progress_bar, truncate};

pub(crate) fn cmd_goal_add(
    svc: &CadenceService,
    title: &str,
    description: &str,
    period: &str,
    json: bool,
) -> Result<()> {
    let goal = svc.add_goal(title, description, period)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&goal)?);
    } else {
        let id = goal.id;
        let period = &goal.period;
        println!("Added {period} goal [{id}]: {}", goal.title);
    }
    Ok(())
}

pub(crate) fn cmd_goal_list(svc: &CadenceService, json: bool) -> Result<()> {
    let goals = svc.goals()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&goals)?);
        return Ok(());
    }

    if goals.is_empty() {
        eprintln!("No goals yet. Use `cadence goal add` to create one.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct GoalRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Goal")]
        title: String,
        #[tabled(rename = "Period")]
        period: String,
        #[tabled(rename = "Progress")]
        progress: String,
    }

    let rows: Vec<GoalRow> = goals
        .iter()
        .map(|g| GoalRow {
            id: g.id,
            title: truncate(&g.title, 35),
            period: g.period.clone(),
            progress: {
                let bar = progress_bar(g.progress as f64 / 100.0, 10);
                let pct = g.progress;
                if g.completed {
                    format!("{bar} done")
                } else {
                    format!("{bar} {pct}%")
                }
            },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(0..1)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_goal_progress(
    svc: &CadenceService,
    id: i64,
    progress: i64,
    json: bool,
) -> Result<()> {
    let goal = svc.set_goal_progress(id, progress)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&goal)?);
    } else if goal.completed {
        println!("Goal [{id}] '{}' completed!", goal.title);
    } else {
        let pct = goal.progress;
        println!("Goal [{id}] '{}' at {pct}%", goal.title);
    }
    Ok(())
}

pub(crate) fn cmd_goal_delete(svc: &CadenceService, id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_goal(id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else if deleted {
        println!("Deleted goal {id}");
    } else {
        eprintln!("Goal {id} not found");
    }
    Ok(())
}
