use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use bidou_core::export::{ExportFormat, read_json_snapshot};

use super::Tracker;

/// Write the full history as `json` or `csv`. A path of `-` writes to stdout.
pub(crate) fn cmd_export(tracker: &Tracker<'_>, format: &str, output: &Path) -> Result<()> {
    // parse before touching the output so a bad format never truncates it
    let format = format.parse::<ExportFormat>()?;
    let to_stdout = output == Path::new("-");
    let writer: Box<dyn Write> = if to_stdout {
        Box::new(io::stdout().lock())
    } else {
        let file = File::create(output)
            .with_context(|| format!("Failed to create file: {}", output.display()))?;
        Box::new(BufWriter::new(file))
    };

    let entries = tracker.entries();
    format.write(entries, writer)?;

    if !to_stdout {
        eprintln!(
            "Exported {} meals as {format} to {}",
            entries.len(),
            output.display()
        );
    }
    Ok(())
}

/// Append the meals of a JSON snapshot to the history.
pub(crate) fn cmd_import(
    tracker: &mut Tracker<'_>,
    path: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let batch = read_json_snapshot(file)?;
    let found = batch.entries.len();
    let skipped = batch.skipped;

    let imported = if dry_run {
        0
    } else {
        tracker.append_entries(batch.entries)?
    };
    tracing::info!(found, skipped, imported, "imported snapshot");

    if json {
        println!(
            "{}",
            serde_json::json!({
                "dry_run": dry_run,
                "meals_found": found,
                "meals_skipped": skipped,
                "meals_imported": imported,
            })
        );
    } else {
        if dry_run {
            println!("Dry run, no changes made.\n");
        } else {
            println!("Import complete.\n");
        }
        println!("  Meals found:    {found}");
        println!("  Meals skipped:  {skipped}");
        println!("  Meals imported: {imported}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidou_core::family::FamilyCatalog;
    use bidou_core::service::TrackerService;
    use bidou_core::store::MemoryStore;

    const SNAPSHOT: &str = r#"[
        {"date":"2024-06-15","time":"midi","pain":2,"ingredients":[{"label":"Riz","key":"riz"}]},
        {"date":"2024-06-16","time":"noon","pain":9,"ingredients":[{"label":"Riz","key":"riz"}]},
        {"date":"2024-06-17","time":"evening","pain":4,"ingredients":[{"label":"Lentilles","key":"x"}],"mealType":""}
    ]"#;

    fn tracker() -> Tracker<'static> {
        TrackerService::with_catalog(Box::new(MemoryStore::new()), FamilyCatalog::builtin())
    }

    #[test]
    fn test_import_then_export() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        std::fs::write(&input, SNAPSHOT).unwrap();

        let mut t = tracker();
        cmd_import(&mut t, &input, true, true).unwrap();
        assert!(t.entries().is_empty());

        cmd_import(&mut t, &input, false, true).unwrap();
        assert_eq!(t.entries().len(), 2);
        assert_eq!(t.entries()[1].ingredients[0].key, "lentille");

        let csv_out = dir.path().join("out.csv");
        cmd_export(&t, "CSV", &csv_out).unwrap();
        let text = std::fs::read_to_string(&csv_out).unwrap();
        assert_eq!(text.lines().count(), 3);

        let json_out = dir.path().join("out.json");
        cmd_export(&t, "json", &json_out).unwrap();
        let mut again = tracker();
        cmd_import(&mut again, &json_out, false, true).unwrap();
        assert_eq!(again.entries(), t.entries());
    }

    #[test]
    fn test_export_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let t = tracker();
        assert!(cmd_export(&t, "xml", &dir.path().join("out.xml")).is_err());
        assert!(!dir.path().join("out.xml").exists());
    }

    #[test]
    fn test_bad_format_leaves_existing_file_intact() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("backup.json");
        std::fs::write(&out, "precious").unwrap();
        let t = tracker();
        assert!(cmd_export(&t, "xml", &out).is_err());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "precious");
    }

    #[test]
    fn test_import_missing_file() {
        let mut t = tracker();
        assert!(cmd_import(&mut t, Path::new("/nonexistent/in.json"), false, true).is_err());
    }
}
