use anyhow::Result;

use cadence_core::service::CadenceService;

use super::helpers::check_mark;

pub(crate) fn cmd_shop_add(svc: &CadenceService, name: &str, json: bool) -> Result<()> {
    let item = svc.add_shopping_item(name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        let id = item.id;
        println!("Added [{id}] {}", item.name);
    }
    Ok(())
}

pub(crate) fn cmd_shop_list(svc: &CadenceService, json: bool) -> Result<()> {
    let items = svc.shopping_items()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        eprintln!("Shopping list is empty.");
        return Ok(());
    }

    for item in &items {
        let mark = check_mark(item.bought);
        let id = item.id;
        println!("{mark} [{id}] {}", item.name);
    }
    Ok(())
}

pub(crate) fn cmd_shop_toggle(svc: &CadenceService, id: i64, json: bool) -> Result<()> {
    let item = svc.toggle_shopping_item(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else if item.bought {
        println!("Bought [{id}] {}", item.name);
    } else {
        println!("Unmarked [{id}] {}", item.name);
    }
    Ok(())
}

pub(crate) fn cmd_shop_delete(svc: &CadenceService, id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_shopping_item(id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else if deleted {
        println!("Deleted item {id}");
    } else {
        eprintln!("Item {id} not found");
    }
    Ok(())
}

pub(crate) fn cmd_shop_clear(svc: &CadenceService, json: bool) -> Result<()> {
    let cleared = svc.clear_bought_items()?;

    if json {
        println!("{}", serde_json::json!({ "cleared": cleared }));
    } else if cleared > 0 {
        println!("Cleared {cleared} bought item(s)");
    } else {
        println!("Nothing to clear");
    }
    Ok(())
}
