use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use anyhow::{Context, Result, bail};

use crate::models::MealEntry;
use crate::store::{decode_values, encode_snapshot};

const CSV_HEADER: [&str; 7] = [
    "date",
    "time",
    "pain",
    "ingredients",
    "meal_type",
    "meal_feeling",
    "note",
];

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn write<W: Write>(self, entries: &[MealEntry], writer: W) -> Result<()> {
        match self {
            ExportFormat::Json => write_json(entries, writer),
            ExportFormat::Csv => write_csv(entries, writer),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => bail!("Invalid export format '{s}'. Must be one of: json, csv"),
        }
    }
}

/// Write the history as a flat CSV report, one row per meal.
///
/// Ingredient labels are joined with `"; "`. Optional columns are left blank.
pub fn write_csv<W: Write>(entries: &[MealEntry], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for entry in entries {
        let date = entry.date.format("%Y-%m-%d").to_string();
        let pain = entry.pain.to_string();
        let ingredients = entry.ingredient_labels().join("; ");
        wtr.write_record([
            date.as_str(),
            entry.time.as_str(),
            pain.as_str(),
            ingredients.as_str(),
            entry.meal_type.map_or("", |t| t.as_str()),
            entry.meal_feeling.map_or("", |f| f.as_str()),
            entry.personal_note.as_deref().unwrap_or(""),
        ])
        .with_context(|| format!("Failed to write CSV row for {date}"))?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

pub fn write_json<W: Write>(entries: &[MealEntry], mut writer: W) -> Result<()> {
    let json = encode_snapshot(entries)?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush().context("Failed to flush JSON output")?;
    Ok(())
}

/// What reading a snapshot for import found.
#[derive(Debug, Clone)]
pub struct ImportBatch {
    pub entries: Vec<MealEntry>,
    pub skipped: usize,
}

/// Parse a JSON snapshot for import. Unlike a store load, a document that is
/// not a JSON array is an error; individual invalid entries are counted and
/// skipped.
pub fn read_json_snapshot<R: Read>(mut reader: R) -> Result<ImportBatch> {
    let mut raw = String::new();
    reader
        .read_to_string(&mut raw)
        .context("Failed to read snapshot")?;
    let values = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
        Ok(values) => values,
        Err(e) => bail!("Snapshot must be a JSON array of meals: {e}"),
    };
    let total = values.len();
    let entries = decode_values(values);
    Ok(ImportBatch {
        skipped: total - entries.len(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::models::{MealDraft, MealType, Pain};

    fn entries() -> Vec<MealEntry> {
        let mut draft = MealDraft::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        draft.add_ingredient("Pâtes");
        draft.add_ingredient("Fromage");
        draft.pain = Some(Pain::try_from(4).unwrap());
        draft.meal_type = Some(MealType::Homemade);
        draft.personal_note = Some("stress, \"gros\" rhume".to_string());
        vec![draft.to_entry().unwrap()]
    }

    #[test]
    fn test_csv_report() {
        let mut out = Vec::new();
        write_csv(&entries(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,time,pain,ingredients,meal_type,meal_feeling,note"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-06-15,noon,4,Pâtes; Fromage,homemade,,\"stress, \"\"gros\"\" rhume\""
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_json_export_can_be_imported() {
        let mut out = Vec::new();
        write_json(&entries(), &mut out).unwrap();
        let batch = read_json_snapshot(out.as_slice()).unwrap();
        assert_eq!(batch.skipped, 0);
        assert_eq!(batch.entries, entries());
    }

    #[test]
    fn test_import_counts_skipped_entries() {
        let raw = r#"[
            {"date":"2024-06-15","time":"noon","pain":2,"ingredients":[{"label":"riz","key":"riz"}]},
            {"date":"2024-06-15","time":"noon","pain":0,"ingredients":[{"label":"riz","key":"riz"}]}
        ]"#;
        let batch = read_json_snapshot(raw.as_bytes()).unwrap();
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(" json ".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_import_rejects_non_array() {
        assert!(read_json_snapshot("{}".as_bytes()).is_err());
        assert!(read_json_snapshot("".as_bytes()).is_err());
    }
}
