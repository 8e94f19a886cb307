use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::normalize::normalize;

/// Id of the family every unmatched ingredient falls into.
pub const CATCH_ALL_ID: &str = "autres";
const CATCH_ALL_LABEL: &str = "Autres";

/// Built-in catalog, in match order. Order is the tie-break when two families
/// share a keyword fragment ("pomme de terre" must win over "pomme").
const BUILTIN_FAMILIES: &[(&str, &str, &[&str])] = &[
    ("feculents", "Féculents", &["riz", "pate", "pain", "pomme de terre"]),
    ("legumes", "Légumes", &["tomate", "courgette", "carotte", "brocoli"]),
    ("legumes_secs", "Légumineuses", &["lentille", "pois", "haricot"]),
    ("viande_rouge", "Viande rouge", &["boeuf", "bœuf", "steak", "agneau", "porc"]),
    ("volaille", "Volaille", &["poulet", "dinde"]),
    ("poisson", "Poisson", &["poisson", "saumon", "thon"]),
    ("produits_laitiers", "Produits laitiers", &["fromage", "lait", "yaourt"]),
    ("fruits", "Fruits", &["pomme", "banane", "poire"]),
    (CATCH_ALL_ID, CATCH_ALL_LABEL, &[]),
];

static BUILTIN: LazyLock<FamilyCatalog> = LazyLock::new(|| {
    let defs = BUILTIN_FAMILIES
        .iter()
        .map(|(id, label, keywords)| FamilyDef {
            id: (*id).to_string(),
            label: (*label).to_string(),
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        })
        .collect();
    FamilyCatalog::build(defs)
});

/// A family as declared in a catalog file, keywords as typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyDef {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A catalog family with its keywords already normalized.
#[derive(Debug, Clone, Serialize)]
pub struct FoodFamily {
    pub id: String,
    pub label: String,
    pub keywords: Vec<String>,
}

impl FoodFamily {
    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.id == CATCH_ALL_ID
    }

    fn matches(&self, key: &str) -> bool {
        self.keywords.iter().any(|k| key.contains(k.as_str()))
    }
}

/// Ordered, read-only table of food families.
#[derive(Debug, Clone)]
pub struct FamilyCatalog {
    families: Vec<FoodFamily>,
    catch_all: usize,
}

impl FamilyCatalog {
    /// The catalog shipped with the crate.
    #[must_use]
    pub fn builtin() -> &'static FamilyCatalog {
        &BUILTIN
    }

    /// Build a catalog from user definitions, validating ids.
    pub fn from_defs(defs: Vec<FamilyDef>) -> Result<Self> {
        let mut seen = HashSet::new();
        for def in &defs {
            let id = def.id.trim();
            if id.is_empty() {
                bail!("Family id must not be empty");
            }
            if def.label.trim().is_empty() {
                bail!("Family '{id}' has an empty label");
            }
            if !seen.insert(id.to_string()) {
                bail!("Duplicate family id '{id}'");
            }
        }
        Ok(Self::build(defs))
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let defs: Vec<FamilyDef> =
            serde_json::from_reader(reader).context("Failed to parse family catalog")?;
        Self::from_defs(defs)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open family catalog: {}", path.display()))?;
        let catalog = Self::from_json_reader(file)
            .with_context(|| format!("Invalid family catalog: {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            families = catalog.families.len(),
            "loaded family catalog"
        );
        Ok(catalog)
    }

    fn build(defs: Vec<FamilyDef>) -> Self {
        let mut families: Vec<FoodFamily> = defs
            .into_iter()
            .map(|def| {
                let mut keywords: Vec<String> = Vec::with_capacity(def.keywords.len());
                for kw in def.keywords.iter().map(String::as_str).map(normalize) {
                    // an empty keyword would match every key
                    if !kw.is_empty() && !keywords.contains(&kw) {
                        keywords.push(kw);
                    }
                }
                FoodFamily {
                    id: def.id.trim().to_string(),
                    label: def.label,
                    keywords,
                }
            })
            .collect();

        let catch_all = if let Some(idx) = families.iter().position(FoodFamily::is_catch_all) {
            idx
        } else {
            families.push(FoodFamily {
                id: CATCH_ALL_ID.to_string(),
                label: CATCH_ALL_LABEL.to_string(),
                keywords: Vec::new(),
            });
            families.len() - 1
        };

        Self {
            families,
            catch_all,
        }
    }

    /// First family, in declared order, whose keywords occur in `key`.
    ///
    /// `key` must already be normalized. Empty keys and misses resolve to the
    /// catch-all family.
    #[must_use]
    pub fn classify(&self, key: &str) -> &FoodFamily {
        if key.is_empty() {
            return self.catch_all();
        }
        self.families
            .iter()
            .filter(|f| !f.is_catch_all())
            .find(|f| f.matches(key))
            .unwrap_or_else(|| self.catch_all())
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FoodFamily> {
        self.families.iter().find(|f| f.id == id)
    }

    #[must_use]
    pub fn catch_all(&self) -> &FoodFamily {
        &self.families[self.catch_all]
    }

    #[must_use]
    pub fn families(&self) -> &[FoodFamily] {
        &self.families
    }
}

/// Classify a normalized key against the built-in catalog, returning the family id.
#[must_use]
pub fn classify_family(key: &str) -> &'static str {
    &FamilyCatalog::builtin().classify(key).id
}
