use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::normalize::{fold, normalize};

/// Subjective pain score, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Pain(u8);

impl Pain {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Pain {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(ValidationError::PainOutOfRange(value))
    }
}

impl From<Pain> for u8 {
    fn from(pain: Pain) -> Self {
        pain.0
    }
}

impl fmt::Display for Pain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MealTime {
    Morning,
    #[default]
    Noon,
    Evening,
}

impl MealTime {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MealTime::Morning => "morning",
            MealTime::Noon => "noon",
            MealTime::Evening => "evening",
        }
    }
}

impl fmt::Display for MealTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// reads go through `FromStr` so stored French or mixed-case values still load
impl<'de> Deserialize<'de> for MealTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl FromStr for MealTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match fold(s).as_str() {
            "morning" | "breakfast" | "matin" => Ok(MealTime::Morning),
            "noon" | "lunch" | "midi" => Ok(MealTime::Noon),
            "evening" | "dinner" | "soir" => Ok(MealTime::Evening),
            _ => bail!("Invalid meal time '{s}'. Must be one of: morning, noon, evening"),
        }
    }
}

/// Where the meal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Homemade,
    Processed,
    Restaurant,
}

impl MealType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Homemade => "homemade",
            MealType::Processed => "processed",
            MealType::Restaurant => "restaurant",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            MealType::Homemade => "Homemade",
            MealType::Processed => "Processed food",
            MealType::Restaurant => "Restaurant",
        }
    }
}

impl FromStr for MealType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match fold(s).as_str() {
            "homemade" | "cuisine maison" => Ok(MealType::Homemade),
            "processed" | "aliments transformes" => Ok(MealType::Processed),
            "restaurant" => Ok(MealType::Restaurant),
            _ => bail!("Invalid meal type '{s}'. Must be one of: homemade, processed, restaurant"),
        }
    }
}

/// How the user felt right after eating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MealFeeling {
    Overate,
    TooFatty,
}

impl MealFeeling {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MealFeeling::Overate => "overate",
            MealFeeling::TooFatty => "too_fatty",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            MealFeeling::Overate => "Ate too much",
            MealFeeling::TooFatty => "Ate too fatty",
        }
    }
}

impl FromStr for MealFeeling {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match fold(s).as_str() {
            "overate" | "avoir trop mange" => Ok(MealFeeling::Overate),
            "too_fatty" | "too-fatty" | "avoir mange trop gras" => Ok(MealFeeling::TooFatty),
            _ => bail!("Invalid meal feeling '{s}'. Must be one of: overate, too_fatty"),
        }
    }
}

/// Treats a missing field, `null`, or a blank string as `None`.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(de::Error::custom),
    }
}

/// One ingredient of a meal: the label as typed and its grouping key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientTag {
    pub label: String,
    pub key: String,
}

impl IngredientTag {
    /// Tag for a user-typed label, or `None` when nothing is left after trimming.
    #[must_use]
    pub fn new(label: &str) -> Option<Self> {
        let label = label.trim();
        let key = normalize(label);
        if key.is_empty() {
            return None;
        }
        Some(Self {
            label: label.to_string(),
            key,
        })
    }
}

/// A saved meal. Entries are only ever created or deleted, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealEntry {
    pub date: NaiveDate,
    pub time: MealTime,
    pub pain: Pain,
    pub ingredients: Vec<IngredientTag>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub meal_type: Option<MealType>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub meal_feeling: Option<MealFeeling>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub personal_note: Option<String>,
}

impl MealEntry {
    /// Re-derive every key from its label and drop tags that collapse onto an
    /// earlier one, then check the entry still has an ingredient.
    ///
    /// Stores call this on everything they read, so keys written under a
    /// different normalization policy are brought in line.
    pub fn canonicalize(mut self) -> Result<Self, ValidationError> {
        let mut tags: Vec<IngredientTag> = Vec::with_capacity(self.ingredients.len());
        for tag in self.ingredients.drain(..) {
            let Some(tag) = IngredientTag::new(&tag.label) else {
                continue;
            };
            if !tags.iter().any(|t| t.key == tag.key) {
                tags.push(tag);
            }
        }
        if tags.is_empty() {
            return Err(ValidationError::NoIngredients);
        }
        self.ingredients = tags;
        self.personal_note = self
            .personal_note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Ok(self)
    }

    #[must_use]
    pub fn ingredient_labels(&self) -> Vec<&str> {
        self.ingredients.iter().map(|i| i.label.as_str()).collect()
    }
}

/// The meal being composed, before it is saved.
#[derive(Debug, Clone)]
pub struct MealDraft {
    pub date: NaiveDate,
    pub time: MealTime,
    pub pain: Option<Pain>,
    pub meal_type: Option<MealType>,
    pub meal_feeling: Option<MealFeeling>,
    pub personal_note: Option<String>,
    ingredients: Vec<IngredientTag>,
}

impl MealDraft {
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            time: MealTime::default(),
            pain: None,
            meal_type: None,
            meal_feeling: None,
            personal_note: None,
            ingredients: Vec::new(),
        }
    }

    /// Add an ingredient by label. Returns `false` without changing the draft
    /// when the label is blank or its key is already present.
    pub fn add_ingredient(&mut self, label: &str) -> bool {
        let Some(tag) = IngredientTag::new(label) else {
            return false;
        };
        if self.ingredients.iter().any(|t| t.key == tag.key) {
            tracing::debug!(key = %tag.key, "ingredient already in meal");
            return false;
        }
        self.ingredients.push(tag);
        true
    }

    /// Remove the ingredient matching `label` once normalized.
    pub fn remove_ingredient(&mut self, label: &str) -> bool {
        let key = normalize(label);
        let before = self.ingredients.len();
        self.ingredients.retain(|t| t.key != key);
        self.ingredients.len() != before
    }

    pub fn remove_ingredient_at(&mut self, index: usize) -> Option<IngredientTag> {
        (index < self.ingredients.len()).then(|| self.ingredients.remove(index))
    }

    #[must_use]
    pub fn ingredients(&self) -> &[IngredientTag] {
        &self.ingredients
    }

    /// Build the entry this draft would save, leaving the draft untouched.
    pub fn to_entry(&self) -> Result<MealEntry, ValidationError> {
        if self.ingredients.is_empty() {
            return Err(ValidationError::NoIngredients);
        }
        let pain = self.pain.ok_or(ValidationError::MissingPain)?;
        Ok(MealEntry {
            date: self.date,
            time: self.time,
            pain,
            ingredients: self.ingredients.clone(),
            meal_type: self.meal_type,
            meal_feeling: self.meal_feeling,
            personal_note: self
                .personal_note
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        })
    }

    /// Clear everything but the date and time of day, ready for the next meal.
    pub fn reset(&mut self) {
        self.ingredients.clear();
        self.pain = None;
        self.meal_type = None;
        self.meal_feeling = None;
        self.personal_note = None;
    }
}
