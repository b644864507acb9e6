//! The item catalog: entries built from host data, plus lookup by
//! coordinate once the background load has published.

mod entry;
mod loader;

pub use entry::{
    CatalogEntry, DeveloperInfo, EntryNames, Provenance, legacy_cache_id, stable_cache_id,
};
pub use loader::{CatalogLoadHandle, CatalogLoader, LoadOptions, load_catalog};

use crate::translation::TranslationUpdate;
use qab_types::ItemCoordinate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Published catalog. Entry positions never change after publishing, so an
/// index is a stable handle for the session.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    by_coordinate: HashMap<ItemCoordinate, usize>,
    developer_info: bool,
}

/// Summary counts for a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub entry_count: usize,
    pub group_count: usize,
    pub package_count: usize,
    pub package_entry_count: usize,
    pub sound_effect_count: usize,
}

impl Catalog {
    #[must_use]
    pub fn from_entries(entries: Vec<CatalogEntry>, developer_info: bool) -> Self {
        let by_coordinate = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.coordinate(), i))
            .collect();
        let mut catalog = Self {
            entries,
            by_coordinate,
            developer_info: !developer_info,
        };
        catalog.set_developer_info(developer_info);
        catalog
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn index_of(&self, coordinate: ItemCoordinate) -> Option<usize> {
        self.by_coordinate.get(&coordinate).copied()
    }

    #[must_use]
    pub fn find(&self, coordinate: ItemCoordinate) -> Option<&CatalogEntry> {
        self.index_of(coordinate).and_then(|i| self.entries.get(i))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn developer_info(&self) -> bool {
        self.developer_info
    }

    /// Apply one translated name. Returns the entry index when a name changed.
    pub fn apply_translation(&mut self, update: &TranslationUpdate) -> Option<usize> {
        let Some(index) = self.index_of(update.coordinate) else {
            debug!("Translation for unknown item {}", update.coordinate);
            return None;
        };
        let entry = &mut self.entries[index];
        if entry.set_name(update.field, &update.text) {
            trace!("Translated {:?} of {} to '{}'", update.field, update.coordinate, update.text);
            Some(index)
        } else {
            None
        }
    }

    /// Switch the developer-info flag, rebuilding stale search strings.
    /// Returns how many entries were rebuilt.
    pub fn set_developer_info(&mut self, enabled: bool) -> usize {
        if self.developer_info == enabled {
            return 0;
        }
        self.developer_info = enabled;
        let mut rebuilt = 0;
        for entry in &mut self.entries {
            if entry.ensure_search_string(enabled) {
                rebuilt += 1;
            }
        }
        debug!("Rebuilt {rebuilt} search strings (developer info {enabled})");
        rebuilt
    }

    /// Entries from the package `guid`; `None` selects base game entries.
    pub fn entries_from_guid<'a>(
        &'a self,
        guid: Option<&'a str>,
    ) -> impl Iterator<Item = &'a CatalogEntry> + 'a {
        let guid = guid.unwrap_or_default();
        self.entries
            .iter()
            .filter(move |e| e.zipmod_guid().unwrap_or_default() == guid)
    }

    #[must_use]
    pub fn stats(&self) -> CatalogStats {
        let groups: HashSet<i32> = self.entries.iter().map(|e| e.coordinate().group_no).collect();
        let packages: HashSet<&str> = self.entries.iter().filter_map(CatalogEntry::zipmod_guid).collect();

        CatalogStats {
            entry_count: self.entries.len(),
            group_count: groups.len(),
            package_count: packages.len(),
            package_entry_count: self.entries.iter().filter(|e| e.provenance().is_some()).count(),
            sound_effect_count: self.entries.iter().filter(|e| e.is_sound_effect()).count(),
        }
    }
}
