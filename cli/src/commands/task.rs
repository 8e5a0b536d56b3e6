use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cadence_core::service::CadenceService;

use super::helpers::{check_mark, json_error, truncate};

pub(crate) fn cmd_task_add(
    svc: &CadenceService,
    text: &str,
    priority: &str,
    json: bool,
) -> Result<()> {
    let task = svc.add_task(text, priority)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        let id = task.id;
        let priority = &task.priority;
        println!("Added task [{id}] ({priority}): {}", task.text);
    }
    Ok(())
}

pub(crate) fn cmd_task_list(svc: &CadenceService, json: bool) -> Result<()> {
    let tasks = svc.tasks()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    if tasks.is_empty() {
        eprintln!("No tasks yet. Use `cadence task add` to create one.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct TaskRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Done")]
        done: &'static str,
        #[tabled(rename = "Task")]
        text: String,
        #[tabled(rename = "Priority")]
        priority: String,
    }

    let rows: Vec<TaskRow> = tasks
        .iter()
        .map(|t| TaskRow {
            id: t.id,
            done: check_mark(t.completed),
            text: truncate(&t.text, 50),
            priority: t.priority.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(0..1)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_task_show(svc: &CadenceService, id: i64, json: bool) -> Result<()> {
    let tasks = svc.tasks()?;
    let Some(task) = tasks.iter().find(|t| t.id == id) else {
        if json {
            println!("{}", json_error(&format!("Task {id} not found")));
            return Ok(());
        }
        anyhow::bail!("Task {id} not found");
    };
    let subtasks = svc.subtasks(id)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "task": task,
                "subtasks": subtasks,
            }))?
        );
        return Ok(());
    }

    let mark = check_mark(task.completed);
    let priority = &task.priority;
    println!("{mark} [{id}] {} ({priority})", task.text);
    for sub in &subtasks {
        let mark = check_mark(sub.completed);
        let sub_id = sub.id;
        println!("    {mark} [{sub_id}] {}", sub.text);
    }
    if subtasks.is_empty() {
        println!("    (no subtasks)");
    }
    Ok(())
}

pub(crate) fn cmd_task_toggle(svc: &CadenceService, id: i64, json: bool) -> Result<()> {
    let task = svc.toggle_task(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else if task.completed {
        println!("Completed task [{id}]: {}", task.text);
    } else {
        println!("Reopened task [{id}]: {}", task.text);
    }
    Ok(())
}

pub(crate) fn cmd_task_delete(svc: &CadenceService, id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_task(id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else if deleted {
        println!("Deleted task {id}");
    } else {
        eprintln!("Task {id} not found");
    }
    Ok(())
}

pub(crate) fn cmd_subtask_add(
    svc: &CadenceService,
    task_id: i64,
    text: &str,
    json: bool,
) -> Result<()> {
    let subtask = svc.add_subtask(task_id, text)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&subtask)?);
    } else {
        let id = subtask.id;
        println!("Added subtask [{id}] to task {task_id}: {}", subtask.text);
    }
    Ok(())
}

pub(crate) fn cmd_subtask_toggle(svc: &CadenceService, id: i64, json: bool) -> Result<()> {
    let subtask = svc.toggle_subtask(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&subtask)?);
    } else if subtask.completed {
        println!("Completed subtask [{id}]: {}", subtask.text);
    } else {
        println!("Reopened subtask [{id}]: {}", subtask.text);
    }
    Ok(())
}

pub(crate) fn cmd_subtask_delete(svc: &CadenceService, id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_subtask(id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else if deleted {
        println!("Deleted subtask {id}");
    } else {
        eprintln!("Subtask {id} not found");
    }
    Ok(())
}
