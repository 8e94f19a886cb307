use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use bidou_core::error::ServiceError;
use bidou_core::stats::TimeWindow;

use super::Tracker;
use super::helpers::{PositionedEntry, describe_entry, json_error, today, truncate};

pub(crate) fn cmd_history(tracker: &Tracker<'_>, window: TimeWindow, json: bool) -> Result<()> {
    let today = today();
    // positions count over the full history so `delete` can address them
    let rows: Vec<PositionedEntry> = tracker
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, e)| window.contains(e.date, today))
        .map(|(i, entry)| PositionedEntry {
            position: i + 1,
            entry,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        eprintln!("No meals logged ({window})");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "#")]
        position: usize,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Pain")]
        pain: u8,
        #[tabled(rename = "Ingredients")]
        ingredients: String,
        #[tabled(rename = "Note")]
        note: String,
    }

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|r| Row {
            position: r.position,
            date: r.entry.date.format("%Y-%m-%d").to_string(),
            time: r.entry.time.to_string(),
            pain: r.entry.pain.get(),
            ingredients: truncate(&r.entry.ingredient_labels().join(", "), 40),
            note: truncate(r.entry.personal_note.as_deref().unwrap_or(""), 30),
        })
        .collect();

    println!("Meals ({window}):");
    println!(
        "{}",
        Table::new(&table_rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(0..1)).with(Alignment::right()))
            .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
    );
    Ok(())
}

/// Delete by the 1-based position shown in `history`.
pub(crate) fn cmd_delete(tracker: &mut Tracker<'_>, position: usize, json: bool) -> Result<()> {
    let index = position.checked_sub(1).unwrap_or(usize::MAX);
    match tracker.delete_entry(index) {
        Ok(removed) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "deleted": position, "entry": removed })
                );
            } else {
                println!("Deleted entry {position}: {}", describe_entry(&removed));
            }
            Ok(())
        }
        Err(ServiceError::NoSuchEntry(_)) => {
            if json {
                println!("{}", json_error(&format!("Entry {position} not found")));
            } else {
                eprintln!("Entry {position} not found");
            }
            process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}
