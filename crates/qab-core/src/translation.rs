//! Translation cache and the asynchronous translator seam.
//!
//! Names the translator produced in earlier sessions are cached on disk keyed
//! by legacy cache id, so a warm start needs no translation requests at all.

use crate::catalog::{CatalogEntry, EntryNames};
use crate::engine::CoreMessage;
use crate::persist::{SaveScheduler, write_atomic};
use crate::Result;
use qab_types::{ItemCoordinate, NameField};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace, warn};

/// Cached translated names of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationCacheEntry {
    pub category_name: String,
    pub group_name: String,
    pub item_name: String,
}

impl From<&TranslationCacheEntry> for EntryNames {
    fn from(cached: &TranslationCacheEntry) -> Self {
        Self {
            group: cached.group_name.clone(),
            category: cached.category_name.clone(),
            item: cached.item_name.clone(),
        }
    }
}

impl From<&EntryNames> for TranslationCacheEntry {
    fn from(names: &EntryNames) -> Self {
        Self {
            category_name: names.category.clone(),
            group_name: names.group.clone(),
            item_name: names.item.clone(),
        }
    }
}

/// Read-only view of the cache handed to the catalog loader thread.
pub type TranslationSnapshot = Arc<HashMap<String, TranslationCacheEntry>>;

/// Translation cache keyed by legacy cache id, saved after a quiet period.
pub struct TranslationCache {
    path: PathBuf,
    entries: TranslationSnapshot,
    scheduler: SaveScheduler,
}

impl TranslationCache {
    /// Create an empty cache that saves to `path`.
    #[must_use]
    pub fn new(path: PathBuf, quiet_period: Duration) -> Self {
        Self {
            path,
            entries: Arc::new(HashMap::new()),
            scheduler: SaveScheduler::new(quiet_period),
        }
    }

    /// Load the cache from `path`. A missing or unreadable file gives an
    /// empty cache.
    #[must_use]
    pub fn load(path: &Path, quiet_period: Duration) -> Self {
        let mut cache = Self::new(path.to_path_buf(), quiet_period);

        if !path.exists() {
            debug!("Translation cache not found at {}", path.display());
            return cache;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to read translation cache {}: {}", path.display(), e);
                return cache;
            }
        };

        match serde_json::from_str::<HashMap<String, TranslationCacheEntry>>(&content) {
            Ok(entries) => {
                info!("Loaded {} cached translations", entries.len());
                cache.entries = Arc::new(entries);
            }
            Err(e) => {
                warn!(
                    "Failed to parse translation cache: {} (at line {}, column {})",
                    e,
                    e.line(),
                    e.column()
                );
            }
        }
        cache
    }

    #[must_use]
    pub fn try_get(&self, legacy_id: &str) -> Option<&TranslationCacheEntry> {
        self.entries.get(legacy_id)
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
    pub fn snapshot(&self) -> TranslationSnapshot {
        Arc::clone(&self.entries)
    }

    #[must_use]
    pub fn is_save_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Mark the cache dirty; the quiet period restarts at `now` (ms).
    pub fn request_save(&mut self, now: u64) {
        self.scheduler.mark_dirty(now);
    }

    /// Save if a save is pending and the quiet period has elapsed.
    /// Returns true when a write was attempted.
    pub fn save_if_due(&mut self, now: u64, entries: &[CatalogEntry]) -> bool {
        if !self.scheduler.is_due(now) {
            return false;
        }
        self.save_logged(entries);
        true
    }

    /// Save synchronously if anything is pending.
    pub fn flush(&mut self, entries: &[CatalogEntry]) {
        if self.scheduler.is_pending() {
            self.save_logged(entries);
        }
    }

    fn save_logged(&mut self, entries: &[CatalogEntry]) {
        // A failed write is retried on the next change
        self.scheduler.mark_saved();
        if let Err(e) = self.save(entries) {
            warn!(
                "Failed to save translation cache to {}: {}",
                self.path.display(),
                e
            );
        }
    }

    /// Write the current names of `entries`, one per legacy id.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&mut self, entries: &[CatalogEntry]) -> Result<()> {
        let mut table: BTreeMap<&str, TranslationCacheEntry> = BTreeMap::new();
        for entry in entries {
            if table.contains_key(entry.legacy_cache_id()) {
                warn!("Cache collision on item {}", entry.full_name());
                continue;
            }
            table.insert(entry.legacy_cache_id(), entry.names().into());
        }

        let content = serde_json::to_vec(&table)?;
        write_atomic(&self.path, &content)?;
        debug!("Saved {} translations to {}", table.len(), self.path.display());

        self.entries = Arc::new(
            table
                .into_iter()
                .map(|(id, names)| (id.to_string(), names))
                .collect(),
        );
        Ok(())
    }
}

/// Completion callback for one translation. May run on any thread.
pub type TranslationCallback = Box<dyn FnOnce(String) + Send + 'static>;

/// Asynchronous string translation service.
pub trait Translator: Send + Sync {
    /// Queue `text` for translation; `on_done` receives the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be submitted.
    fn translate(&self, text: &str, on_done: TranslationCallback) -> anyhow::Result<()>;
}

/// One translated name to apply on the owning thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationUpdate {
    pub coordinate: ItemCoordinate,
    pub field: NameField,
    pub text: String,
}

/// Submits translation requests whose results go to the interactive queue.
#[derive(Clone)]
pub struct TranslationRequester {
    translator: Arc<dyn Translator>,
    updates: UnboundedSender<CoreMessage>,
}

impl TranslationRequester {
    #[must_use]
    pub fn new(translator: Arc<dyn Translator>, updates: UnboundedSender<CoreMessage>) -> Self {
        Self {
            translator,
            updates,
        }
    }

    /// Submit the three original names of the entry at `coordinate`.
    pub fn request_translations(&self, coordinate: ItemCoordinate, originals: &EntryNames) {
        for (field, text) in [
            (NameField::Group, &originals.group),
            (NameField::Category, &originals.category),
            (NameField::Item, &originals.item),
        ] {
            let updates = self.updates.clone();
            let on_done: TranslationCallback = Box::new(move |text: String| {
                let update = TranslationUpdate {
                    coordinate,
                    field,
                    text,
                };
                if updates.send(CoreMessage::Translated(update)).is_err() {
                    trace!("Dropping translation for {coordinate}, core is gone");
                }
            });

            if let Err(e) = self.translator.translate(text, on_done) {
                warn!("Failed to request translation of '{text}' for {coordinate}: {e}");
            }
        }
    }
}
