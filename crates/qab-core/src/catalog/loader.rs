use super::entry::{CatalogEntry, Provenance};
use crate::translation::{TranslationCacheEntry, TranslationRequester, TranslationSnapshot};
use crate::{Error, Result};
use qab_types::{CatalogSource, ItemCoordinate, ResolveRecord};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Settings the loader needs from the config.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub sound_effect_groups: Vec<i32>,
    pub developer_info: bool,
}

/// Resolve records keyed by `(group, category, local slot)`.
fn provenance_table(records: &[ResolveRecord]) -> HashMap<(i32, i32, i32), &ResolveRecord> {
    records
        .iter()
        .map(|r| ((r.group_no, r.category_no, r.local_slot), r))
        .collect()
}

/// Build catalog entries for every slot of `source`.
///
/// Slots that cannot be turned into an entry are logged and skipped. Entries
/// with a cached translation take their names from `translations`; the rest
/// are submitted to `requester` when one is given. The result is sorted by
/// translated full name.
#[must_use]
pub fn load_catalog(
    source: &CatalogSource,
    translations: &HashMap<String, TranslationCacheEntry>,
    requester: Option<&TranslationRequester>,
    options: &LoadOptions,
) -> Vec<CatalogEntry> {
    let started = Instant::now();
    let provenance = provenance_table(&source.resolve_records);
    let mut seen_ids: HashMap<(String, String), ItemCoordinate> = HashMap::new();
    let mut entries = Vec::with_capacity(source.slot_count());
    let mut skipped = 0usize;
    let mut requested = 0usize;

    for (&group_no, categories) in &source.items {
        for (&category_no, slots) in categories {
            for (&slot, info) in slots {
                let coordinate = ItemCoordinate::new(group_no, category_no, slot);
                let name = info.as_ref().map_or("?", |i| i.name.as_str());

                let Some(info) = info else {
                    warn!(
                        "Failed to load item: missing item info; name={name} group={group_no} category={category_no} slot={slot}"
                    );
                    skipped += 1;
                    continue;
                };
                let Some(group) = source.groups.get(&group_no) else {
                    warn!(
                        "Failed to load item: invalid group number; name={name} group={group_no} category={category_no} slot={slot}"
                    );
                    skipped += 1;
                    continue;
                };
                let Some(category_name) = group.categories.get(&category_no) else {
                    warn!(
                        "Failed to load item: invalid category number; name={name} group={group_no} category={category_no} slot={slot}"
                    );
                    skipped += 1;
                    continue;
                };

                let record = provenance.get(&(group_no, category_no, slot)).copied();
                let mut entry = CatalogEntry::new(
                    coordinate,
                    &group.name,
                    category_name,
                    info,
                    record.map(Provenance::from),
                )
                .with_sound_effect(options.sound_effect_groups.contains(&group_no));

                if let Some(cached) = translations.get(entry.legacy_cache_id()) {
                    entry.set_names(cached.into());
                } else if let Some(requester) = requester {
                    requester.request_translations(coordinate, entry.original_names());
                    requested += 1;
                }
                entry.ensure_search_string(options.developer_info);

                let key = (
                    entry.zipmod_guid().unwrap_or_default().to_string(),
                    entry.stable_cache_id().to_string(),
                );
                if let Some(previous) = seen_ids.get(&key) {
                    warn!(
                        "Cache id collision: {} used by {} and {} (guid '{}')",
                        key.1, previous, coordinate, key.0
                    );
                } else {
                    seen_ids.insert(key, coordinate);
                }

                entries.push(entry);
            }
        }
    }

    entries.sort_by(|a, b| a.full_name().cmp(b.full_name()));

    info!(
        "Loaded {} items in {}ms ({} skipped, {} sent for translation)",
        entries.len(),
        started.elapsed().as_millis(),
        skipped,
        requested
    );
    entries
}

/// Runs [`load_catalog`] off the interactive thread.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Start loading on a background thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(
        source: Arc<CatalogSource>,
        translations: TranslationSnapshot,
        requester: Option<TranslationRequester>,
        options: LoadOptions,
    ) -> Result<CatalogLoadHandle> {
        let (tx, rx) = oneshot::channel();

        std::thread::Builder::new()
            .name("qab-catalog-loader".to_string())
            .spawn(move || {
                let entries =
                    load_catalog(&source, &translations, requester.as_ref(), &options);
                if tx.send(entries).is_err() {
                    debug!("Catalog load finished after the receiver was dropped");
                }
            })?;

        Ok(CatalogLoadHandle { rx })
    }
}

/// Assign-once publish point for a background catalog load.
pub struct CatalogLoadHandle {
    rx: oneshot::Receiver<Vec<CatalogEntry>>,
}

impl CatalogLoadHandle {
    /// Take the result if the load has finished. `None` while still running.
    pub fn try_take(&mut self) -> Option<Result<Vec<CatalogEntry>>> {
        match self.rx.try_recv() {
            Ok(entries) => Some(Ok(entries)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(Error::Catalog(
                "loader thread exited without publishing a catalog".to_string(),
            ))),
        }
    }

    /// Wait for the load to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the loader thread died before publishing.
    pub async fn wait(self) -> Result<Vec<CatalogEntry>> {
        self.rx.await.map_err(|_| {
            Error::Catalog("loader thread exited without publishing a catalog".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qab_types::{GroupInfo, ItemLoadInfo};
    use std::collections::BTreeMap;

    fn source() -> CatalogSource {
        let mut source = CatalogSource::default();
        source.groups.insert(
            0,
            GroupInfo {
                name: "Shapes".to_string(),
                categories: BTreeMap::from([(1, "Cubes".to_string())]),
            },
        );
        let slots = BTreeMap::from([
            (
                1,
                Some(ItemLoadInfo {
                    name: "Box".to_string(),
                    ..Default::default()
                }),
            ),
            (2, None),
        ]);
        source.items.insert(0, BTreeMap::from([(1, slots)]));
        source
    }

    #[test]
    fn test_missing_info_is_skipped() {
        let entries = load_catalog(&source(), &HashMap::new(), None, &LoadOptions::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].full_name(), "Shapes/Cubes/Box");
    }

    #[test]
    fn test_unregistered_group_and_category_are_skipped() {
        let mut source = source();
        let orphan = BTreeMap::from([(
            1,
            Some(ItemLoadInfo {
                name: "Lost".to_string(),
                ..Default::default()
            }),
        )]);
        source.items.insert(42, BTreeMap::from([(1, orphan.clone())]));
        source.items.get_mut(&0).unwrap().insert(9, orphan);

        let entries = load_catalog(&source, &HashMap::new(), None, &LoadOptions::default());
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_provenance_is_matched_by_local_slot() {
        let mut source = source();
        source.resolve_records.push(ResolveRecord {
            guid: "com.shapes".to_string(),
            file_name: "shapes.zipmod".to_string(),
            group_no: 0,
            category_no: 1,
            slot: 77,
            local_slot: 1,
        });

        let entries = load_catalog(&source, &HashMap::new(), None, &LoadOptions::default());
        assert_eq!(entries[0].zipmod_guid(), Some("com.shapes"));
        assert_eq!(entries[0].stable_cache_id(), "00000000-00000001-00000077");
    }

    #[test]
    fn test_cached_translation_is_used() {
        let translations = HashMap::from([(
            "00000000-00000001-Box".to_string(),
            TranslationCacheEntry {
                category_name: "Cubes!".to_string(),
                group_name: "Shapes!".to_string(),
                item_name: "Box!".to_string(),
            },
        )]);

        let entries = load_catalog(&source(), &translations, None, &LoadOptions::default());
        assert_eq!(entries[0].full_name(), "Shapes!/Cubes!/Box!");
        assert_eq!(entries[0].original_full_name(), "Shapes/Cubes/Box");
    }

    #[test]
    fn test_developer_info_option_applies() {
        let options = LoadOptions {
            sound_effect_groups: vec![0],
            developer_info: true,
        };
        let entries = load_catalog(&source(), &HashMap::new(), None, &options);
        assert!(entries[0].search_includes_developer_info());
        assert!(entries[0].is_sound_effect());
    }

    #[tokio::test]
    async fn test_spawn_publishes_once() {
        let handle = CatalogLoader::spawn(
            Arc::new(source()),
            Arc::new(HashMap::new()),
            None,
            LoadOptions::default(),
        )
        .unwrap();

        let entries = handle.wait().await.unwrap();
        assert_eq!(entries.len(), 1);
    }
}
