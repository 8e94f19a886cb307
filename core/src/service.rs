use chrono::NaiveDate;

use crate::error::ServiceError;
use crate::family::FamilyCatalog;
use crate::models::{MealDraft, MealEntry};
use crate::stats::{GroupBy, PainStat, TimeWindow, compute_stats, entries_in_family, filter_entries};
use crate::store::MealStore;

/// One journaling session over a [`MealStore`].
///
/// The history is loaded once on open and every mutation writes the full
/// snapshot back before returning. If that write fails the in-memory history
/// is rolled back, so it never runs ahead of the store.
pub struct TrackerService<'c, S: MealStore> {
    store: S,
    catalog: &'c FamilyCatalog,
    entries: Vec<MealEntry>,
}

impl<S: MealStore> TrackerService<'static, S> {
    /// Open a session using the built-in family catalog.
    pub fn open(store: S) -> Self {
        Self::with_catalog(store, FamilyCatalog::builtin())
    }
}

impl<'c, S: MealStore> TrackerService<'c, S> {
    pub fn with_catalog(store: S, catalog: &'c FamilyCatalog) -> Self {
        let entries = store.load();
        tracing::debug!(entries = entries.len(), "opened meal history");
        Self {
            store,
            catalog,
            entries,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[MealEntry] {
        &self.entries
    }

    #[must_use]
    pub fn catalog(&self) -> &FamilyCatalog {
        self.catalog
    }

    /// Validate and append the draft, then reset it for the next meal.
    ///
    /// On any error the draft and the history are left as they were.
    pub fn save_meal(&mut self, draft: &mut MealDraft) -> Result<&MealEntry, ServiceError> {
        let entry = draft.to_entry()?;
        self.entries.push(entry);
        if let Err(e) = self.store.save_all(&self.entries) {
            self.entries.pop();
            return Err(e.into());
        }
        draft.reset();
        let idx = self.entries.len() - 1;
        Ok(&self.entries[idx])
    }

    /// Append already-built entries (e.g. from an import) in one write.
    pub fn append_entries(&mut self, entries: Vec<MealEntry>) -> Result<usize, ServiceError> {
        let added = entries.len();
        if added == 0 {
            return Ok(0);
        }
        let before = self.entries.len();
        self.entries.extend(entries);
        if let Err(e) = self.store.save_all(&self.entries) {
            self.entries.truncate(before);
            return Err(e.into());
        }
        Ok(added)
    }

    /// Remove the entry at zero-based `index`.
    pub fn delete_entry(&mut self, index: usize) -> Result<MealEntry, ServiceError> {
        if index >= self.entries.len() {
            return Err(ServiceError::NoSuchEntry(index));
        }
        let removed = self.entries.remove(index);
        if let Err(e) = self.store.save_all(&self.entries) {
            self.entries.insert(index, removed);
            return Err(e.into());
        }
        Ok(removed)
    }

    /// Entries inside `window`, seen from `today`.
    #[must_use]
    pub fn filtered(&self, window: TimeWindow, today: NaiveDate) -> Vec<&MealEntry> {
        filter_entries(&self.entries, window, today)
    }

    #[must_use]
    pub fn stats(&self, group_by: GroupBy, window: TimeWindow, today: NaiveDate) -> Vec<PainStat> {
        compute_stats(self.filtered(window, today), group_by, self.catalog)
    }

    /// Entries in `window` that contain an ingredient of `family_id`.
    #[must_use]
    pub fn family_detail(
        &self,
        family_id: &str,
        window: TimeWindow,
        today: NaiveDate,
    ) -> Vec<&MealEntry> {
        entries_in_family(self.filtered(window, today), family_id, self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::models::Pain;
    use crate::store::MemoryStore;
    use anyhow::bail;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 20).unwrap()
    }

    fn draft(pain: i64, ingredients: &[&str]) -> MealDraft {
        let mut d = MealDraft::new(today());
        for i in ingredients {
            d.add_ingredient(i);
        }
        d.pain = Some(Pain::try_from(pain).unwrap());
        d
    }

    struct FailingStore;

    impl MealStore for FailingStore {
        fn load(&self) -> Vec<MealEntry> {
            Vec::new()
        }

        fn save_all(&self, _entries: &[MealEntry]) -> anyhow::Result<()> {
            bail!("disk full")
        }
    }

    #[test]
    fn test_save_meal_persists_and_resets_draft() {
        let store = MemoryStore::new();
        let mut svc = TrackerService::open(&store);
        let mut d = draft(5, &["Lentilles"]);

        let saved = svc.save_meal(&mut d).unwrap();
        assert_eq!(saved.pain.get(), 5);
        assert_eq!(store.len(), 1);
        assert!(d.ingredients().is_empty());
        assert!(d.pain.is_none());

        let stats = svc.stats(GroupBy::Ingredient, TimeWindow::All, today());
        assert_eq!(stats[0].key, "lentille");
        assert_eq!(stats[0].count, 1);
        assert!((stats[0].avg - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_save_without_ingredients_leaves_store_unchanged() {
        let store = MemoryStore::new();
        let mut svc = TrackerService::open(&store);
        let mut d = draft(3, &[]);

        let err = svc.save_meal(&mut d).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::NoIngredients)
        ));
        assert!(store.is_empty());
        assert!(svc.entries().is_empty());
        assert_eq!(d.pain.map(Pain::get), Some(3));
    }

    #[test]
    fn test_save_without_pain_keeps_draft() {
        let store = MemoryStore::new();
        let mut svc = TrackerService::open(&store);
        let mut d = MealDraft::new(today());
        d.add_ingredient("riz");

        let err = svc.save_meal(&mut d).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::MissingPain)
        ));
        assert_eq!(d.ingredients().len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_failure_rolls_back() {
        let mut svc = TrackerService::open(FailingStore);
        let mut d = draft(2, &["riz"]);
        let err = svc.save_meal(&mut d).unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));
        assert!(svc.entries().is_empty());
        assert_eq!(d.ingredients().len(), 1);
    }

    #[test]
    fn test_delete_entry_by_position() {
        let store = MemoryStore::new();
        let mut svc = TrackerService::open(&store);
        svc.save_meal(&mut draft(1, &["riz"])).unwrap();
        svc.save_meal(&mut draft(4, &["steak"])).unwrap();

        let removed = svc.delete_entry(0).unwrap();
        assert_eq!(removed.ingredients[0].key, "riz");
        assert_eq!(store.len(), 1);
        assert_eq!(store.load()[0].ingredients[0].key, "steak");
        assert!(matches!(
            svc.delete_entry(5),
            Err(ServiceError::NoSuchEntry(5))
        ));
    }

    #[test]
    fn test_reopen_sees_previous_session() {
        let store = MemoryStore::new();
        {
            let mut svc = TrackerService::open(&store);
            svc.save_meal(&mut draft(2, &["riz"])).unwrap();
            svc.save_meal(&mut draft(4, &["riz"])).unwrap();
            svc.save_meal(&mut draft(4, &["riz"])).unwrap();
        }
        let svc = TrackerService::open(&store);
        let stats = svc.stats(GroupBy::Ingredient, TimeWindow::All, today());
        assert_eq!(stats[0].count, 3);
        assert!((stats[0].avg - 10.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_family_detail_respects_window() {
        let store = MemoryStore::new();
        let mut svc = TrackerService::open(&store);
        let mut old = draft(5, &["saumon"]);
        old.date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        svc.save_meal(&mut old).unwrap();
        svc.save_meal(&mut draft(3, &["thon", "riz"])).unwrap();

        assert_eq!(svc.family_detail("poisson", TimeWindow::All, today()).len(), 2);
        let recent = svc.family_detail("poisson", TimeWindow::WEEK, today());
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].pain.get(), 3);
    }

    #[test]
    fn test_append_entries() {
        let store = MemoryStore::new();
        let mut svc = TrackerService::open(&store);
        let entries = vec![
            draft(1, &["riz"]).to_entry().unwrap(),
            draft(2, &["pain"]).to_entry().unwrap(),
        ];
        assert_eq!(svc.append_entries(entries).unwrap(), 2);
        assert_eq!(svc.append_entries(Vec::new()).unwrap(), 0);
        assert_eq!(store.len(), 2);
    }
}
