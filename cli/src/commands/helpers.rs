use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;

use bidou_core::models::MealEntry;

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(today()),
        Some(s) => match s.as_str() {
            "today" => Ok(today()),
            "yesterday" => Ok(today() - chrono::Duration::days(1)),
            "tomorrow" => Ok(today() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Split repeated `-i` values on commas, so `-i "riz, poulet"` adds two.
pub(crate) fn split_ingredients(raw: &[String]) -> Vec<&str> {
    raw.iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Ten-cell bar for an average pain on the 1-5 scale.
#[allow(clippy::cast_sign_loss)]
pub(crate) fn pain_bar(avg: f64) -> String {
    let filled = ((avg / 5.0) * 10.0).round().clamp(0.0, 10.0) as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}

pub(crate) fn describe_entry(entry: &MealEntry) -> String {
    let date = entry.date.format("%Y-%m-%d");
    let time = entry.time;
    let pain = entry.pain;
    let ingredients = entry.ingredient_labels().join(", ");
    format!("{date} — {time} — pain {pain}/5 — {ingredients}")
}

/// A history entry with its 1-based position, for `--json` output.
#[derive(Serialize)]
pub(crate) struct PositionedEntry<'a> {
    pub position: usize,
    #[serde(flatten)]
    pub entry: &'a MealEntry,
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidou_core::models::{MealDraft, Pain};

    #[test]
    fn test_parse_date_none() {
        assert_eq!(parse_date(None).unwrap(), today());
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = today();
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            today + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_split_ingredients() {
        let raw = vec!["riz, poulet".to_string(), " ".to_string(), "tomate".to_string()];
        assert_eq!(split_ingredients(&raw), vec!["riz", "poulet", "tomate"]);
    }

    #[test]
    fn test_pain_bar() {
        assert_eq!(pain_bar(5.0), "██████████");
        assert_eq!(pain_bar(2.5), "█████░░░░░");
        assert_eq!(pain_bar(0.0), "░░░░░░░░░░");
    }

    #[test]
    fn test_describe_entry() {
        let mut draft = MealDraft::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        draft.add_ingredient("Riz");
        draft.add_ingredient("Poulet");
        draft.pain = Some(Pain::try_from(3).unwrap());
        let entry = draft.to_entry().unwrap();
        assert_eq!(
            describe_entry(&entry),
            "2024-06-15 — noon — pain 3/5 — Riz, Poulet"
        );
    }

    #[test]
    fn test_positioned_entry_flattens() {
        let mut draft = MealDraft::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        draft.add_ingredient("Riz");
        draft.pain = Some(Pain::try_from(2).unwrap());
        let entry = draft.to_entry().unwrap();
        let value = serde_json::to_value(PositionedEntry {
            position: 1,
            entry: &entry,
        })
        .unwrap();
        assert_eq!(value["position"], 1);
        assert_eq!(value["pain"], 2);
        assert_eq!(value["ingredients"][0]["key"], "riz");
    }

    #[test]
    fn test_json_error() {
        assert_eq!(json_error("nope"), r#"{"error":"nope"}"#);
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
    }
}
