use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use bidou_core::normalize::normalize;

use super::Tracker;

pub(crate) fn cmd_families(tracker: &Tracker<'_>, json: bool) -> Result<()> {
    let families = tracker.catalog().families();

    if json {
        println!("{}", serde_json::to_string_pretty(families)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Keywords")]
        keywords: String,
    }

    let rows: Vec<Row> = families
        .iter()
        .map(|f| Row {
            id: f.id.clone(),
            name: f.label.clone(),
            keywords: if f.is_catch_all() {
                "(everything else)".to_string()
            } else {
                f.keywords.join(", ")
            },
        })
        .collect();

    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

/// Show the key and family an ingredient label resolves to.
pub(crate) fn cmd_classify(tracker: &Tracker<'_>, labels: &[String], json: bool) -> Result<()> {
    let results: Vec<serde_json::Value> = labels
        .iter()
        .map(|label| {
            let key = normalize(label);
            let family = tracker.catalog().classify(&key);
            serde_json::json!({
                "label": label,
                "key": key,
                "family": family.id,
                "familyLabel": family.label,
            })
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for r in &results {
            println!(
                "{} -> {} ({})",
                r["label"].as_str().unwrap_or_default(),
                r["familyLabel"].as_str().unwrap_or_default(),
                r["key"].as_str().unwrap_or_default(),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidou_core::family::FamilyCatalog;
    use bidou_core::service::TrackerService;
    use bidou_core::store::MemoryStore;

    #[test]
    fn test_families_and_classify_render() {
        let t: Tracker<'static> =
            TrackerService::with_catalog(Box::new(MemoryStore::new()), FamilyCatalog::builtin());
        cmd_families(&t, false).unwrap();
        cmd_families(&t, true).unwrap();
        cmd_classify(&t, &["Bœuf".to_string(), "chocolat".to_string()], false).unwrap();
    }
}
