use anyhow::{Context, Result};

use bidou_core::models::{MealDraft, MealFeeling, MealTime, MealType, Pain};

use super::Tracker;
use super::helpers::{describe_entry, parse_date, split_ingredients};

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_log(
    tracker: &mut Tracker<'_>,
    ingredients: &[String],
    pain: i64,
    time: &str,
    date: Option<String>,
    meal_type: Option<&str>,
    feeling: Option<&str>,
    note: Option<String>,
    json: bool,
) -> Result<()> {
    let mut draft = MealDraft::new(parse_date(date)?);
    draft.time = time.parse::<MealTime>()?;
    draft.pain = Some(Pain::try_from(pain)?);
    draft.meal_type = meal_type.map(str::parse::<MealType>).transpose()?;
    draft.meal_feeling = feeling.map(str::parse::<MealFeeling>).transpose()?;
    draft.personal_note = note;

    for label in split_ingredients(ingredients) {
        if !draft.add_ingredient(label) && !json {
            eprintln!("Skipping duplicate ingredient '{label}'");
        }
    }

    let entry = tracker
        .save_meal(&mut draft)
        .context("Meal not saved")?
        .clone();
    tracing::info!(date = %entry.date, pain = entry.pain.get(), "logged meal");

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!("Logged: {}", describe_entry(&entry));
        let families: Vec<&str> = entry
            .ingredients
            .iter()
            .map(|i| tracker.catalog().classify(&i.key).label.as_str())
            .collect();
        println!("Families: {}", families.join(", "));
    }
    Ok(())
}
