use super::ChangeCallback;
use crate::persist::{SaveScheduler, write_atomic};
use crate::utils::now_millis;
use crate::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Last-use timestamps (ms) of recently spawned items, keyed by stable id.
///
/// Holds at most `capacity` ids; the least recently used fall off first.
pub struct RecencyStore {
    path: PathBuf,
    recents: HashMap<String, u64>,
    capacity: usize,
    /// Newest timestamp handed out, so bumps are strictly increasing
    latest: u64,
    scheduler: SaveScheduler,
    on_changed: Option<ChangeCallback>,
}

impl RecencyStore {
    #[must_use]
    pub fn new(path: PathBuf, capacity: usize, quiet_period: Duration) -> Self {
        Self {
            path,
            recents: HashMap::new(),
            capacity,
            latest: 0,
            scheduler: SaveScheduler::new(quiet_period),
            on_changed: None,
        }
    }

    /// Load recents from `path`, trimmed to `capacity`. A missing or
    /// unreadable file gives an empty store.
    #[must_use]
    pub fn load(path: &Path, capacity: usize, quiet_period: Duration) -> Self {
        let mut store = Self::new(path.to_path_buf(), capacity, quiet_period);

        if !path.exists() {
            debug!("No recents file at {}", path.display());
            return store;
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(crate::Error::from)
            .and_then(|content| Ok(serde_json::from_str::<HashMap<String, u64>>(&content)?));

        match parsed {
            Ok(recents) => {
                store.latest = recents.values().copied().max().unwrap_or(0);
                store.recents = recents;
                let trimmed = store.trim();
                debug!(
                    "Loaded {} recents ({} trimmed) from {}",
                    store.recents.len(),
                    trimmed,
                    path.display()
                );
            }
            Err(e) => warn!("Failed to read recents from {}: {}", path.display(), e),
        }
        store
    }

    pub fn set_on_changed(&mut self, callback: ChangeCallback) {
        self.on_changed = Some(callback);
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.recents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recents.is_empty()
    }

    /// Change the capacity, dropping the oldest ids that no longer fit.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        if self.trim() > 0 {
            self.changed(now_millis());
        }
    }

    /// Record a use of `id` now.
    pub fn bump(&mut self, id: &str) {
        self.bump_at(id, now_millis());
    }

    /// Record a use of `id` at `now` (ms). Timestamps never repeat, so the
    /// most recent bump always wins ties.
    pub fn bump_at(&mut self, id: &str, now: u64) {
        let stamp = now.max(self.latest.saturating_add(1));
        self.latest = stamp;
        self.recents.insert(id.to_string(), stamp);
        self.trim();
        trace!("Bumped {id} to {stamp}");
        self.changed(now);
    }

    #[must_use]
    pub fn try_get_last_use(&self, id: &str) -> Option<u64> {
        self.recents.get(id).copied()
    }

    /// Ids from most to least recently used.
    #[must_use]
    pub fn ids_by_recency(&self) -> Vec<(&str, u64)> {
        let mut ids: Vec<(&str, u64)> = self
            .recents
            .iter()
            .map(|(id, stamp)| (id.as_str(), *stamp))
            .collect();
        ids.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ids
    }

    /// Remove everything beyond capacity. Returns how many ids were dropped.
    fn trim(&mut self) -> usize {
        if self.recents.len() <= self.capacity {
            return 0;
        }
        let drop: Vec<String> = self
            .ids_by_recency()
            .into_iter()
            .skip(self.capacity)
            .map(|(id, _)| id.to_string())
            .collect();
        for id in &drop {
            self.recents.remove(id);
        }
        drop.len()
    }

    fn changed(&mut self, now: u64) {
        self.scheduler.mark_dirty(now);
        if let Some(callback) = &self.on_changed {
            callback();
        }
    }

    #[must_use]
    pub fn is_save_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    pub fn save_if_due(&mut self, now: u64) -> bool {
        if !self.scheduler.is_due(now) {
            return false;
        }
        self.save_logged();
        true
    }

    pub fn flush(&mut self) {
        if self.scheduler.is_pending() {
            self.save_logged();
        }
    }

    fn save_logged(&mut self) {
        self.scheduler.mark_saved();
        if let Err(e) = self.save() {
            warn!("Failed to save recents to {}: {}", self.path.display(), e);
        }
    }

    /// Write recents as a JSON map of id to timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_vec(&self.recents)?;
        write_atomic(&self.path, &content)?;
        debug!("Saved {} recents", self.recents.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(capacity: usize) -> RecencyStore {
        RecencyStore::new(PathBuf::from("unused.json"), capacity, Duration::ZERO)
    }

    #[test]
    fn test_bump_records_timestamp() {
        let mut recents = store(20);
        recents.bump_at("a", 1_000);
        assert_eq!(recents.try_get_last_use("a"), Some(1_000));
        assert_eq!(recents.try_get_last_use("b"), None);
    }

    #[test]
    fn test_bumps_are_strictly_increasing() {
        let mut recents = store(20);
        recents.bump_at("a", 1_000);
        recents.bump_at("b", 1_000);
        recents.bump_at("c", 500);

        let a = recents.try_get_last_use("a").unwrap();
        let b = recents.try_get_last_use("b").unwrap();
        let c = recents.try_get_last_use("c").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_rebump_moves_to_front() {
        let mut recents = store(2);
        recents.bump_at("a", 1);
        recents.bump_at("b", 2);
        recents.bump_at("a", 3);
        recents.bump_at("c", 4);

        assert!(recents.try_get_last_use("a").is_some());
        assert!(recents.try_get_last_use("b").is_none());
        assert!(recents.try_get_last_use("c").is_some());
    }

    #[test]
    fn test_set_capacity_trims_immediately() {
        let mut recents = store(10);
        for (i, id) in ["a", "b", "c", "d"].iter().enumerate() {
            recents.bump_at(id, i as u64);
        }

        recents.set_capacity(2);
        assert_eq!(recents.len(), 2);
        assert!(recents.try_get_last_use("c").is_some());
        assert!(recents.try_get_last_use("d").is_some());
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut recents = store(0);
        recents.bump_at("a", 1);
        assert!(recents.is_empty());
    }

    #[test]
    fn test_ids_by_recency_order() {
        let mut recents = store(10);
        recents.bump_at("old", 1);
        recents.bump_at("new", 2);
        let ids: Vec<&str> = recents.ids_by_recency().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn test_save_and_load_trims_to_capacity() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("recents.json");

        let mut recents = RecencyStore::new(path.clone(), 10, Duration::ZERO);
        for i in 0..5u64 {
            recents.bump_at(&format!("id{i}"), 100 + i);
        }
        recents.flush();

        let loaded = RecencyStore::load(&path, 3, Duration::ZERO);
        assert_eq!(loaded.len(), 3);
        assert!(loaded.try_get_last_use("id4").is_some());
        assert!(loaded.try_get_last_use("id1").is_none());
    }

    #[test]
    fn test_load_continues_after_latest_timestamp() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("recents.json");
        std::fs::write(&path, r#"{"a": 5000}"#).unwrap();

        let mut loaded = RecencyStore::load(&path, 10, Duration::ZERO);
        loaded.bump_at("b", 10);
        assert!(loaded.try_get_last_use("b").unwrap() > 5000);
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("recents.json");
        std::fs::write(&path, [0xde, 0xad, 0xbe, 0xef]).unwrap();

        let loaded = RecencyStore::load(&path, 10, Duration::ZERO);
        assert!(loaded.is_empty());
    }
}
