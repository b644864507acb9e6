//! User curation stores: favorites, hidden items and recently used items.

mod recents;

pub use recents::RecencyStore;

use crate::catalog::CatalogEntry;
use crate::persist::{SaveScheduler, write_atomic};
use crate::utils::now_millis;
use crate::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Invoked once for every call that changed a store.
pub type ChangeCallback = Box<dyn Fn() + Send>;

/// Separates the GUID from the item id on each line of a set file.
const FIELD_SEPARATOR: char = '\0';

/// A set of stable cache ids grouped by package GUID.
///
/// Base game items live under the empty GUID. Used for both favorites and
/// hidden items.
pub struct CurationSet {
    label: &'static str,
    path: PathBuf,
    items: BTreeMap<String, BTreeSet<String>>,
    scheduler: SaveScheduler,
    on_changed: Option<ChangeCallback>,
}

impl CurationSet {
    /// Create an empty set that saves to `path`.
    #[must_use]
    pub fn new(label: &'static str, path: PathBuf, quiet_period: Duration) -> Self {
        Self {
            label,
            path,
            items: BTreeMap::new(),
            scheduler: SaveScheduler::new(quiet_period),
            on_changed: None,
        }
    }

    /// Load the set from `path`. Read failures are logged and leave the set
    /// empty; malformed lines are skipped.
    #[must_use]
    pub fn load(label: &'static str, path: &Path, quiet_period: Duration) -> Self {
        let mut set = Self::new(label, path.to_path_buf(), quiet_period);

        if !path.exists() {
            debug!("No {} file at {}", label, path.display());
            return set;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => {
                set.items = parse_lines(&content);
                debug!(
                    "Loaded {} {} entries from {}",
                    set.len(),
                    label,
                    path.display()
                );
            }
            Err(e) => warn!("Failed to load {} from {}: {}", label, path.display(), e),
        }
        set
    }

    pub fn set_on_changed(&mut self, callback: ChangeCallback) {
        self.on_changed = Some(callback);
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Number of ids across all GUIDs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.values().map(BTreeSet::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn check(&self, guid: Option<&str>, item_id: &str) -> bool {
        self.items
            .get(guid.unwrap_or_default())
            .is_some_and(|ids| ids.contains(item_id))
    }

    /// True if the entry's GUID and stable id are in the set.
    #[must_use]
    pub fn contains(&self, entry: &CatalogEntry) -> bool {
        self.check(entry.zipmod_guid(), entry.stable_cache_id())
    }

    /// Iterate `(guid, item_id)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items
            .iter()
            .flat_map(|(guid, ids)| ids.iter().map(move |id| (guid.as_str(), id.as_str())))
    }

    pub fn add_item(&mut self, guid: Option<&str>, item_id: &str) -> bool {
        let added = self
            .items
            .entry(guid.unwrap_or_default().to_string())
            .or_default()
            .insert(item_id.to_string());

        if added {
            self.changed();
        }
        added
    }

    pub fn remove_item(&mut self, guid: Option<&str>, item_id: &str) -> bool {
        let guid = guid.unwrap_or_default();
        let Some(ids) = self.items.get_mut(guid) else {
            return false;
        };
        if !ids.remove(item_id) {
            return false;
        }
        if ids.is_empty() {
            self.items.remove(guid);
        }
        self.changed();
        true
    }

    /// Add every entry of `entries` that comes from the package `guid`.
    pub fn add_mod(&mut self, guid: Option<&str>, entries: &[CatalogEntry]) -> bool {
        let guid = guid.unwrap_or_default();
        let mut any = false;
        for entry in entries
            .iter()
            .filter(|e| e.zipmod_guid().unwrap_or_default() == guid)
        {
            any |= self
                .items
                .entry(guid.to_string())
                .or_default()
                .insert(entry.stable_cache_id().to_string());
        }

        if any {
            self.changed();
        }
        any
    }

    pub fn remove_mod(&mut self, guid: Option<&str>) -> bool {
        let removed = self.items.remove(guid.unwrap_or_default()).is_some();
        if removed {
            self.changed();
        }
        removed
    }

    fn changed(&mut self) {
        self.scheduler.mark_dirty(now_millis());
        if let Some(callback) = &self.on_changed {
            callback();
        }
    }

    #[must_use]
    pub fn is_save_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Save if the quiet period since the last change has elapsed.
    pub fn save_if_due(&mut self, now: u64) -> bool {
        if !self.scheduler.is_due(now) {
            return false;
        }
        self.save_logged();
        true
    }

    /// Save synchronously if anything is pending.
    pub fn flush(&mut self) {
        if self.scheduler.is_pending() {
            self.save_logged();
        }
    }

    fn save_logged(&mut self) {
        self.scheduler.mark_saved();
        if let Err(e) = self.save() {
            warn!(
                "Failed to save {} to {}: {}",
                self.label,
                self.path.display(),
                e
            );
        }
    }

    /// Write the set as `guid\0itemId` lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        let mut content = String::new();
        for (guid, id) in self.iter() {
            let _ = writeln!(content, "{guid}{FIELD_SEPARATOR}{id}");
        }
        write_atomic(&self.path, content.as_bytes())?;
        debug!("Saved {} {} entries", self.len(), self.label);
        Ok(())
    }
}

fn parse_lines(content: &str) -> BTreeMap<String, BTreeSet<String>> {
    let mut items: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for line in content.lines() {
        let Some((guid, item_id)) = line.split_once(FIELD_SEPARATOR) else {
            continue;
        };
        if item_id.is_empty() {
            continue;
        }
        items
            .entry(guid.to_string())
            .or_default()
            .insert(item_id.to_string());
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_set() -> (CurationSet, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut set = CurationSet::new("favorites", PathBuf::from("unused.tsv"), Duration::ZERO);
        let counter = Arc::clone(&calls);
        set.set_on_changed(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (set, calls)
    }

    #[test]
    fn test_none_guid_is_empty_guid() {
        let (mut set, _) = counting_set();
        set.add_item(None, "item");
        assert!(set.check(Some(""), "item"));
        assert!(set.check(None, "item"));
    }

    #[test]
    fn test_remove_item_drops_empty_guid() {
        let (mut set, calls) = counting_set();
        set.add_item(Some("modA"), "item1");
        assert!(set.remove_item(Some("modA"), "item1"));
        assert!(set.is_empty());
        assert!(!set.remove_item(Some("modA"), "item1"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_remove_mod() {
        let (mut set, calls) = counting_set();
        set.add_item(Some("modA"), "item1");
        set.add_item(Some("modA"), "item2");
        set.add_item(Some("modB"), "item1");

        assert!(set.remove_mod(Some("modA")));
        assert!(!set.remove_mod(Some("modA")));
        assert!(!set.check(Some("modA"), "item2"));
        assert!(set.check(Some("modB"), "item1"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let content = "modA\0item1\n\nno separator here\nmodB\0\n\0item2\nmodA\0item3\0extra\n";
        let items = parse_lines(content);

        assert_eq!(items.len(), 2);
        assert!(items["modA"].contains("item1"));
        assert!(items["modA"].contains("item3\0extra"), "Only the first NUL splits");
        assert!(items[""].contains("item2"));
        assert!(!items.contains_key("modB"));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let set = CurationSet::load("hidden", &temp_dir.path().join("hidden.tsv"), Duration::ZERO);
        assert!(set.is_empty());
    }

    #[test]
    fn test_save_if_due_and_flush() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("hidden.tsv");
        let mut set = CurationSet::new("hidden", path.clone(), Duration::from_secs(3600));

        set.add_item(Some("modA"), "item1");
        assert!(set.is_save_pending());
        assert!(!set.save_if_due(now_millis()));
        assert!(!path.exists());

        set.flush();
        assert!(!set.is_save_pending());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "modA\0item1\n");
    }
}
