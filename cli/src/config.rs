use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use bidou_core::db::Database;
use bidou_core::family::FamilyCatalog;
use bidou_core::store::{JsonFileStore, MealStore};

pub struct Config {
    pub db_path: PathBuf,
    pub catalog_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "bidou").context("Could not determine home directory")?;
        Self::in_dir(proj_dirs.data_dir())
    }

    /// Config rooted at `data_dir`, creating the directory if needed.
    pub fn in_dir(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            db_path: data_dir.join("bidou.db"),
            catalog_path: data_dir.join("families.json"),
        })
    }

    /// Open the meal store: `store` overrides the default database, and a
    /// `.json` path selects a plain snapshot file instead of SQLite.
    pub fn open_store(&self, store: Option<&Path>) -> Result<Box<dyn MealStore>> {
        let path = store.unwrap_or(self.db_path.as_path());
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            tracing::debug!(path = %path.display(), "using JSON snapshot store");
            Ok(Box::new(JsonFileStore::new(path)))
        } else {
            tracing::debug!(path = %path.display(), "using SQLite store");
            Ok(Box::new(Database::open(path)?))
        }
    }

    /// Family catalog: an explicit `catalog` path must exist; otherwise
    /// `families.json` in the data directory is used when present.
    pub fn load_catalog(&self, catalog: Option<&Path>) -> Result<FamilyCatalog> {
        match catalog {
            Some(path) => {
                if !path.exists() {
                    bail!("Family catalog not found: {}", path.display());
                }
                FamilyCatalog::load(path)
            }
            None if self.catalog_path.exists() => FamilyCatalog::load(&self.catalog_path),
            None => Ok(FamilyCatalog::builtin().clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_dir_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("a/b");
        let config = Config::in_dir(&data).unwrap();
        assert!(data.is_dir());
        assert_eq!(config.db_path, data.join("bidou.db"));
    }

    #[test]
    fn test_store_selection_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::in_dir(dir.path()).unwrap();

        let json = dir.path().join("history.JSON");
        let store = config.open_store(Some(json.as_path())).unwrap();
        assert!(store.load().is_empty());
        store.save_all(&[]).unwrap();
        assert!(json.exists());

        let store = config.open_store(None).unwrap();
        assert!(store.load().is_empty());
        assert!(config.db_path.exists());
    }

    #[test]
    fn test_catalog_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::in_dir(dir.path()).unwrap();

        let catalog = config.load_catalog(None).unwrap();
        assert_eq!(catalog.classify("tomate").id, "legumes");

        let missing = dir.path().join("missing.json");
        assert!(config.load_catalog(Some(missing.as_path())).is_err());

        std::fs::write(
            &config.catalog_path,
            r#"[{"id": "sucre", "label": "Sucré", "keywords": ["chocolat"]}]"#,
        )
        .unwrap();
        let catalog = config.load_catalog(None).unwrap();
        assert_eq!(catalog.classify("chocolat noir").id, "sucre");
        assert_eq!(catalog.classify("tomate").id, "autres");
    }
}
