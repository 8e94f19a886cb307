use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, params};

use crate::models::{IngredientTag, MealEntry, MealFeeling, MealTime, MealType, Pain};
use crate::store::MealStore;

/// SQLite-backed meal history. Every save rewrites the full snapshot inside
/// one transaction.
pub struct Database {
    conn: Connection,
}

/// A `meals` row before its ingredients are attached.
struct MealRow {
    id: i64,
    date: String,
    time: String,
    pain: i64,
    meal_type: Option<String>,
    meal_feeling: Option<String>,
    personal_note: Option<String>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS meals (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    position INTEGER NOT NULL,
                    date TEXT NOT NULL,
                    time TEXT NOT NULL,
                    pain INTEGER NOT NULL CHECK (pain BETWEEN 1 AND 5),
                    meal_type TEXT,
                    meal_feeling TEXT,
                    personal_note TEXT,
                    saved_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_ingredients (
                    meal_id INTEGER NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    label TEXT NOT NULL,
                    key TEXT NOT NULL,
                    PRIMARY KEY (meal_id, position)
                );

                CREATE INDEX IF NOT EXISTS idx_meals_position ON meals(position);
                CREATE INDEX IF NOT EXISTS idx_meals_date ON meals(date);
                CREATE INDEX IF NOT EXISTS idx_meal_ingredients_key ON meal_ingredients(key);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    fn meal_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealRow> {
        Ok(MealRow {
            id: row.get(0)?,
            date: row.get(1)?,
            time: row.get(2)?,
            pain: row.get(3)?,
            meal_type: row.get(4)?,
            meal_feeling: row.get(5)?,
            personal_note: row.get(6)?,
        })
    }

    fn read_meals(&self) -> Result<Vec<MealEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT meal_id, label, key FROM meal_ingredients ORDER BY meal_id, position",
        )?;
        let mut tags: HashMap<i64, Vec<IngredientTag>> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                IngredientTag {
                    label: row.get(1)?,
                    key: row.get(2)?,
                },
            ))
        })?;
        for row in rows {
            let (meal_id, tag) = row?;
            tags.entry(meal_id).or_default().push(tag);
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, date, time, pain, meal_type, meal_feeling, personal_note
             FROM meals
             ORDER BY position, id",
        )?;
        let meal_rows = stmt
            .query_map([], Self::meal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = Vec::with_capacity(meal_rows.len());
        for row in meal_rows {
            let id = row.id;
            let ingredients = tags.remove(&id).unwrap_or_default();
            match Self::entry_from_parts(row, ingredients) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(meal_id = id, error = %e, "skipping invalid meal row"),
            }
        }
        Ok(entries)
    }

    fn entry_from_parts(row: MealRow, ingredients: Vec<IngredientTag>) -> Result<MealEntry> {
        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}'", row.date))?;
        let entry = MealEntry {
            date,
            time: row.time.parse::<MealTime>()?,
            pain: Pain::try_from(row.pain)?,
            ingredients,
            meal_type: row
                .meal_type
                .as_deref()
                .map(str::parse::<MealType>)
                .transpose()?,
            meal_feeling: row
                .meal_feeling
                .as_deref()
                .map(str::parse::<MealFeeling>)
                .transpose()?,
            personal_note: row.personal_note,
        };
        Ok(entry.canonicalize()?)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn write_meals(&self, entries: &[MealEntry]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM meal_ingredients", [])?;
        tx.execute("DELETE FROM meals", [])?;

        let now = Local::now().to_rfc3339();
        {
            let mut insert_meal = tx.prepare(
                "INSERT INTO meals (position, date, time, pain, meal_type, meal_feeling, personal_note, saved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            let mut insert_tag = tx.prepare(
                "INSERT INTO meal_ingredients (meal_id, position, label, key)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, entry) in entries.iter().enumerate() {
                insert_meal.execute(params![
                    position as i64,
                    entry.date.format("%Y-%m-%d").to_string(),
                    entry.time.as_str(),
                    entry.pain.get(),
                    entry.meal_type.map(MealType::as_str),
                    entry.meal_feeling.map(MealFeeling::as_str),
                    entry.personal_note,
                    now,
                ])?;
                let meal_id = tx.last_insert_rowid();
                for (i, tag) in entry.ingredients.iter().enumerate() {
                    insert_tag.execute(params![meal_id, i as i64, tag.label, tag.key])?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }
}

impl MealStore for Database {
    fn load(&self) -> Vec<MealEntry> {
        self.read_meals().unwrap_or_else(|e| {
            tracing::warn!(error = %format!("{e:#}"), "could not read meal history");
            Vec::new()
        })
    }

    fn save_all(&self, entries: &[MealEntry]) -> Result<()> {
        self.write_meals(entries)
            .context("Failed to save meal history")?;
        tracing::debug!(entries = entries.len(), "saved meal history");
        Ok(())
    }
}
