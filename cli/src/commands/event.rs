use std::collections::BTreeSet;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local, NaiveDate};

use cadence_core::service::CadenceService;

use super::helpers::parse_date;

pub(crate) fn cmd_event_add(
    svc: &CadenceService,
    title: &str,
    date: String,
    time: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(Some(date))?;
    let event = svc.add_event(title, date, time.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&event)?);
    } else {
        let id = event.id;
        let when = match &event.time {
            Some(t) => format!("{} {t}", event.date.format("%Y-%m-%d")),
            None => event.date.format("%Y-%m-%d").to_string(),
        };
        println!("Added event [{id}] {when}: {}", event.title);
    }
    Ok(())
}

pub(crate) fn cmd_event_list(
    svc: &CadenceService,
    month: Option<String>,
    json: bool,
) -> Result<()> {
    let events = match month {
        Some(m) => {
            let (start, end) = month_bounds(&parse_month(&m)?)?;
            svc.events_between(start, end)?
        }
        None => svc.events()?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        eprintln!("No events found.");
        return Ok(());
    }

    for event in &events {
        let id = event.id;
        let date = event.date.format("%Y-%m-%d");
        match &event.time {
            Some(t) => println!("[{id}] {date} {t}  {}", event.title),
            None => println!("[{id}] {date}        {}", event.title),
        }
    }
    Ok(())
}

pub(crate) fn cmd_event_upcoming(svc: &CadenceService, limit: i64, json: bool) -> Result<()> {
    let events = svc.upcoming_events(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        eprintln!("Nothing coming up.");
        return Ok(());
    }

    let today = svc.today();
    for event in &events {
        let days_away = (event.date - today).num_days();
        let when = match days_away {
            0 => "today".to_string(),
            1 => "tomorrow".to_string(),
            n => format!("in {n} days"),
        };
        let date = event.date.format("%Y-%m-%d");
        match &event.time {
            Some(t) => println!("{date} {t}  {} ({when})", event.title),
            None => println!("{date}        {} ({when})", event.title),
        }
    }
    Ok(())
}

pub(crate) fn cmd_event_calendar(svc: &CadenceService, month: Option<String>) -> Result<()> {
    let first = match month {
        Some(m) => parse_month(&m)?,
        None => {
            let today = Local::now().date_naive();
            today.with_day(1).context("invalid date")?
        }
    };
    let (start, end) = month_bounds(&first)?;
    let events = svc.events_between(start, end)?;
    let event_days: BTreeSet<u32> = events.iter().map(|e| e.date.day()).collect();
    let today = Local::now().date_naive();

    println!("     {}", first.format("%B %Y"));
    println!(" Mo  Tu  We  Th  Fr  Sa  Su");

    // Leading blanks up to the month's first weekday.
    let mut line = String::new();
    for _ in 0..first.weekday().num_days_from_monday() {
        line.push_str("    ");
    }

    let mut cursor = first;
    while cursor <= end {
        let day = cursor.day();
        // Event days get a star, today gets brackets.
        let cell = if cursor == today {
            format!("[{day:2}]")
        } else if event_days.contains(&day) {
            format!("{day:3}*")
        } else {
            format!("{day:3} ")
        };
        line.push_str(&cell);

        if cursor.weekday().num_days_from_monday() == 6 {
            println!("{}", line.trim_end());
            line.clear();
        }
        cursor = cursor.succ_opt().context("date overflow")?;
    }
    if !line.is_empty() {
        println!("{}", line.trim_end());
    }

    if !events.is_empty() {
        println!();
        for event in &events {
            let date = event.date.format("%d");
            match &event.time {
                Some(t) => println!("  {date} {t}  {}", event.title),
                None => println!("  {date}        {}", event.title),
            }
        }
    }
    Ok(())
}

pub(crate) fn cmd_event_delete(svc: &CadenceService, id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_event(id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else if deleted {
        println!("Deleted event {id}");
    } else {
        eprintln!("Event {id} not found");
    }
    Ok(())
}

/// Parse "YYYY-MM" into the first day of that month.
fn parse_month(s: &str) -> Result<NaiveDate> {
    let parts: Vec<&str> = s.splitn(2, '-').collect();
    if parts.len() != 2 {
        bail!("Invalid month '{s}'. Use YYYY-MM");
    }
    let year: i32 = parts[0]
        .parse()
        .with_context(|| format!("Invalid year in '{s}'"))?;
    let month: u32 = parts[1]
        .parse()
        .with_context(|| format!("Invalid month in '{s}'"))?;
    NaiveDate::from_ymd_opt(year, month, 1).with_context(|| format!("Invalid month '{s}'"))
}

fn month_bounds(first: &NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_month
        .and_then(|d| d.pred_opt())
        .context("date overflow")?;
    Ok((*first, last))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month() {
        assert_eq!(
            parse_month("2024-06").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert!(parse_month("2024").is_err());
        assert!(parse_month("2024-13").is_err());
    }

    #[test]
    fn test_month_bounds() {
        let first = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let (start, end) = month_bounds(&first).unwrap();
        assert_eq!(start, first);
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
    }

    #[test]
    fn test_month_bounds_december() {
        let first = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        let (_, end) = month_bounds(&first).unwrap();
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn test_month_bounds_february_leap() {
        let first = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let (_, end) = month_bounds(&first).unwrap();
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }
}
