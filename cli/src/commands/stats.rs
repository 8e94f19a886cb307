use anyhow::{Result, bail};
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use bidou_core::stats::{GroupBy, Severity, TimeWindow};

use super::Tracker;
use super::helpers::{describe_entry, pain_bar, today, truncate};

pub(crate) fn cmd_stats(
    tracker: &Tracker<'_>,
    group_by: GroupBy,
    window: TimeWindow,
    json: bool,
) -> Result<()> {
    let stats = tracker.stats(group_by, window, today());

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    if stats.is_empty() {
        eprintln!("No meals logged ({window})");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "ID")]
        key: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Avg pain")]
        avg: String,
        #[tabled(rename = "")]
        bar: String,
        #[tabled(rename = "Meals")]
        count: u32,
        #[tabled(rename = "Severity")]
        severity: String,
    }

    let rows: Vec<Row> = stats
        .iter()
        .map(|s| Row {
            key: truncate(&s.key, 24),
            name: truncate(&s.name, 30),
            avg: format!("{:.1}", s.avg),
            bar: pain_bar(s.avg),
            count: s.count,
            severity: severity_cell(s.severity),
        })
        .collect();

    let heading = match group_by {
        GroupBy::Ingredient => "Pain by ingredient",
        GroupBy::Family => "Pain by family",
    };
    println!("{heading} ({window}):");
    println!(
        "{}",
        Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
            .with(Modify::new(Columns::new(4..5)).with(Alignment::right()))
    );
    Ok(())
}

fn severity_cell(severity: Severity) -> String {
    format!("{severity} ({})", severity.color())
}

/// Meals containing at least one ingredient of `family_id`.
pub(crate) fn cmd_family(
    tracker: &Tracker<'_>,
    family_id: &str,
    window: TimeWindow,
    json: bool,
) -> Result<()> {
    let Some(family) = tracker.catalog().get(family_id) else {
        let known: Vec<&str> = tracker
            .catalog()
            .families()
            .iter()
            .map(|f| f.id.as_str())
            .collect();
        bail!(
            "Unknown family '{family_id}'. Known families: {}",
            known.join(", ")
        );
    };

    let entries = tracker.family_detail(&family.id, window, today());

    if json {
        println!(
            "{}",
            serde_json::json!({
                "family": { "id": family.id, "label": family.label },
                "entries": entries,
            })
        );
        return Ok(());
    }

    println!("{} ({window}):", family.label);
    if entries.is_empty() {
        println!("  No meals");
        return Ok(());
    }
    for entry in entries {
        let matched: Vec<&str> = entry
            .ingredients
            .iter()
            .filter(|i| tracker.catalog().classify(&i.key).id == family.id)
            .map(|i| i.label.as_str())
            .collect();
        println!("  {}", describe_entry(entry));
        println!("      matched: {}", matched.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidou_core::family::FamilyCatalog;
    use bidou_core::models::{MealDraft, Pain};
    use bidou_core::service::TrackerService;
    use bidou_core::store::MemoryStore;

    fn tracker() -> Tracker<'static> {
        let mut t: Tracker<'static> =
            TrackerService::with_catalog(Box::new(MemoryStore::new()), FamilyCatalog::builtin());
        let mut d = MealDraft::new(today());
        d.add_ingredient("saumon");
        d.add_ingredient("riz");
        d.pain = Some(Pain::try_from(4).unwrap());
        t.save_meal(&mut d).unwrap();
        t
    }

    #[test]
    fn test_stats_table_renders() {
        let t = tracker();
        cmd_stats(&t, GroupBy::Family, TimeWindow::All, false).unwrap();
        cmd_stats(&t, GroupBy::Ingredient, TimeWindow::WEEK, true).unwrap();
    }

    #[test]
    fn test_severity_cell_shows_color() {
        assert_eq!(severity_cell(Severity::High), "high (red)");
        assert_eq!(severity_cell(Severity::Medium), "medium (orange)");
    }

    #[test]
    fn test_family_unknown_id_lists_known() {
        let t = tracker();
        let err = cmd_family(&t, "bonbons", TimeWindow::All, false).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bonbons"));
        assert!(msg.contains("poisson"));
        assert!(msg.contains("autres"));
    }

    #[test]
    fn test_family_known_id() {
        let t = tracker();
        cmd_family(&t, "poisson", TimeWindow::All, true).unwrap();
        cmd_family(&t, "fruits", TimeWindow::All, false).unwrap();
    }
}
