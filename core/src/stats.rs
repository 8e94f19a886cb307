use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::NaiveDate;
use serde::Serialize;

use crate::family::FamilyCatalog;
use crate::models::MealEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Ingredient,
    #[default]
    Family,
}

impl FromStr for GroupBy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "ingredient" | "ingredients" | "food" => Ok(GroupBy::Ingredient),
            "family" | "families" => Ok(GroupBy::Family),
            _ => bail!("Invalid grouping '{s}'. Use 'family' or 'ingredient'"),
        }
    }
}

/// How far back statistics look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TimeWindow {
    /// Entries less than this many whole days old.
    Days(u32),
    #[default]
    All,
}

impl TimeWindow {
    pub const WEEK: TimeWindow = TimeWindow::Days(7);
    pub const MONTH: TimeWindow = TimeWindow::Days(30);

    /// Whether an entry dated `date` falls in the window as seen from `today`.
    /// Future-dated entries are always inside.
    #[must_use]
    pub fn contains(self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            TimeWindow::All => true,
            TimeWindow::Days(days) => (today - date).num_days() < i64::from(days),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeWindow::All => f.write_str("all time"),
            TimeWindow::Days(d) => write!(f, "last {d} days"),
        }
    }
}

impl FromStr for TimeWindow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(TimeWindow::All),
            "7" | "week" => Ok(TimeWindow::WEEK),
            "30" | "month" => Ok(TimeWindow::MONTH),
            other => match other.parse::<u32>() {
                Ok(0) | Err(_) => bail!("Invalid window '{s}'. Use 7, 30, all, or a number of days"),
                Ok(d) => Ok(TimeWindow::Days(d)),
            },
        }
    }
}

/// Entries inside `window`, in history order.
pub fn filter_entries(
    entries: &[MealEntry],
    window: TimeWindow,
    today: NaiveDate,
) -> Vec<&MealEntry> {
    entries
        .iter()
        .filter(|e| window.contains(e.date, today))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    #[must_use]
    pub fn from_avg(avg: f64) -> Self {
        if avg >= 4.0 {
            Severity::High
        } else if avg >= 2.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Severity::High => "red",
            Severity::Medium => "orange",
            Severity::Low => "green",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatBucket {
    pub total: u32,
    pub count: u32,
}

impl StatBucket {
    fn add(&mut self, pain: u8) {
        self.total += u32::from(pain);
        self.count += 1;
    }

    #[must_use]
    pub fn avg(&self) -> f64 {
        f64::from(self.total) / f64::from(self.count)
    }
}

/// Average pain for one ingredient or family.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PainStat {
    /// Ingredient key or family id.
    pub key: String,
    pub name: String,
    pub avg: f64,
    pub count: u32,
    pub severity: Severity,
}

/// Fold `entries` into per-group pain averages, highest average first.
///
/// Every ingredient of a meal receives the meal's full pain score. Groups with
/// equal averages stay in the order they were first seen.
pub fn compute_stats<'a, I>(entries: I, group_by: GroupBy, catalog: &FamilyCatalog) -> Vec<PainStat>
where
    I: IntoIterator<Item = &'a MealEntry>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, String, StatBucket)> = Vec::new();

    for entry in entries {
        for tag in &entry.ingredients {
            let (key, name) = match group_by {
                GroupBy::Ingredient => (tag.key.as_str(), tag.label.as_str()),
                GroupBy::Family => {
                    let family = catalog.classify(&tag.key);
                    (family.id.as_str(), family.label.as_str())
                }
            };
            let slot = *index.entry(key.to_string()).or_insert_with(|| {
                groups.push((key.to_string(), name.to_string(), StatBucket::default()));
                groups.len() - 1
            });
            groups[slot].2.add(entry.pain.get());
        }
    }

    let mut stats: Vec<PainStat> = groups
        .into_iter()
        .map(|(key, name, bucket)| {
            let avg = bucket.avg();
            PainStat {
                key,
                name,
                avg,
                count: bucket.count,
                severity: Severity::from_avg(avg),
            }
        })
        .collect();
    // stable sort keeps first-seen order for ties
    stats.sort_by(|a, b| b.avg.total_cmp(&a.avg));
    stats
}

/// Entries with at least one ingredient classified into `family_id`.
pub fn entries_in_family<'a, I>(
    entries: I,
    family_id: &str,
    catalog: &FamilyCatalog,
) -> Vec<&'a MealEntry>
where
    I: IntoIterator<Item = &'a MealEntry>,
{
    entries
        .into_iter()
        .filter(|e| {
            e.ingredients
                .iter()
                .any(|i| catalog.classify(&i.key).id == family_id)
        })
        .collect()
}
