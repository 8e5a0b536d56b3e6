use std::path::Path;

use anyhow::{Context, Result};

use cadence_core::models::ExportData;
use cadence_core::service::CadenceService;

pub(crate) fn cmd_export(svc: &CadenceService, file: Option<&Path>, json: bool) -> Result<()> {
    let data = svc.export_all()?;
    let serialized = serde_json::to_string_pretty(&data)?;

    match file {
        Some(path) => {
            std::fs::write(path, &serialized)
                .with_context(|| format!("Failed to write export to {}", path.display()))?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "exported_to": path.display().to_string() })
                );
            } else {
                let tasks = data.tasks.len();
                let habits = data.habits.len();
                println!(
                    "Exported to {} ({tasks} tasks, {habits} habits, ...)",
                    path.display()
                );
            }
        }
        // No file: the export itself goes to stdout.
        None => println!("{serialized}"),
    }
    Ok(())
}

pub(crate) fn cmd_import(svc: &CadenceService, file: &Path, json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read import file {}", file.display()))?;
    let data: ExportData = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid export file {}", file.display()))?;

    let summary = svc.import_all(&data)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Imported:");
        let n = summary.tasks_imported;
        println!("  {n} task(s)");
        let n = summary.subtasks_imported;
        println!("  {n} subtask(s)");
        let n = summary.shopping_imported;
        println!("  {n} shopping item(s)");
        let n = summary.transactions_imported;
        println!("  {n} transaction(s)");
        let n = summary.notes_imported;
        println!("  {n} note(s)");
        let n = summary.habits_imported;
        println!("  {n} habit(s)");
        let n = summary.goals_imported;
        println!("  {n} goal(s)");
        let n = summary.events_imported;
        println!("  {n} event(s)");
        let n = summary.daily_stats_merged;
        println!("  {n} daily stats record(s) merged");
    }
    Ok(())
}
