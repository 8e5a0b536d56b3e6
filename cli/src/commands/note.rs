use anyhow::Result;

use cadence_core::service::CadenceService;

use super::helpers::{json_error, truncate};

pub(crate) fn cmd_note_add(svc: &CadenceService, content: &str, json: bool) -> Result<()> {
    let note = svc.add_note(content)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        let id = note.id;
        println!("Saved note [{id}]");
    }
    Ok(())
}

pub(crate) fn cmd_note_list(svc: &CadenceService, json: bool) -> Result<()> {
    let notes = svc.notes()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
        return Ok(());
    }

    if notes.is_empty() {
        eprintln!("No notes yet.");
        return Ok(());
    }

    for note in &notes {
        let id = note.id;
        println!("[{id}] {}", truncate(&note.content, 70));
    }
    Ok(())
}

pub(crate) fn cmd_note_show(svc: &CadenceService, id: i64, json: bool) -> Result<()> {
    let notes = svc.notes()?;
    let Some(note) = notes.iter().find(|n| n.id == id) else {
        if json {
            println!("{}", json_error(&format!("Note {id} not found")));
            return Ok(());
        }
        anyhow::bail!("Note {id} not found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        println!("{}", note.content);
    }
    Ok(())
}

pub(crate) fn cmd_note_delete(svc: &CadenceService, id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_note(id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else if deleted {
        println!("Deleted note {id}");
    } else {
        eprintln!("Note {id} not found");
    }
    Ok(())
}
