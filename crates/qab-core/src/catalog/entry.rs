use crate::search::build_search_string;
use crate::utils::make_valid_file_name;
use qab_types::{ItemCoordinate, ItemLoadInfo, NameField, ResolveRecord};
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

/// Technical strings that only show up in search when developer info is on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeveloperInfo {
    pub child_root: Option<String>,
    pub bundle_path: Option<String>,
    pub file_name: Option<String>,
    pub manifest: Option<String>,
}

impl DeveloperInfo {
    fn from_load_info(info: &ItemLoadInfo) -> Self {
        Self {
            child_root: info.child_root.clone(),
            bundle_path: info.bundle_path.clone(),
            file_name: info.file_name.clone(),
            manifest: info.manifest.clone(),
        }
    }
}

/// Where a package item came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub guid: String,
    pub file_name: String,
    /// Slot declared inside the package
    pub slot: i32,
}

impl From<&ResolveRecord> for Provenance {
    fn from(record: &ResolveRecord) -> Self {
        Self {
            guid: record.guid.clone(),
            file_name: record.file_name.clone(),
            slot: record.slot,
        }
    }
}

/// Names of an entry in one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryNames {
    pub group: String,
    pub category: String,
    pub item: String,
}

impl EntryNames {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}/{}", self.group, self.category, self.item)
    }
}

/// One spawnable item of the catalog.
///
/// Identity is the coordinate triple. Two entries with the same coordinate
/// are equal even if their names differ.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    coordinate: ItemCoordinate,
    provenance: Option<Provenance>,
    stable_cache_id: String,
    legacy_cache_id: String,
    original: EntryNames,
    names: EntryNames,
    original_full_name: String,
    full_name: String,
    developer: DeveloperInfo,
    is_sound_effect: bool,
    search_string: String,
    /// Developer-info flag the search string was built with
    search_includes_developer_info: bool,
}

impl CatalogEntry {
    /// Build an entry from host data. Names start as the originals and the
    /// search string is built without developer info.
    #[must_use]
    pub fn new(
        coordinate: ItemCoordinate,
        group_name: &str,
        category_name: &str,
        info: &ItemLoadInfo,
        provenance: Option<Provenance>,
    ) -> Self {
        let original = EntryNames {
            group: group_name.to_string(),
            category: category_name.to_string(),
            item: info.name.clone(),
        };
        let stable_slot = provenance.as_ref().map_or(coordinate.slot, |p| p.slot);
        let original_full_name = original.full_name();

        let mut entry = Self {
            stable_cache_id: stable_cache_id(coordinate.group_no, coordinate.category_no, stable_slot),
            legacy_cache_id: legacy_cache_id(
                coordinate.group_no,
                coordinate.category_no,
                &info.name,
            ),
            coordinate,
            provenance,
            names: original.clone(),
            original,
            full_name: original_full_name.clone(),
            original_full_name,
            developer: DeveloperInfo::from_load_info(info),
            is_sound_effect: false,
            search_string: String::new(),
            search_includes_developer_info: false,
        };
        entry.rebuild_search_string(false);
        entry
    }

    #[must_use]
    pub fn with_sound_effect(mut self, is_sound_effect: bool) -> Self {
        self.is_sound_effect = is_sound_effect;
        self
    }

    #[must_use]
    pub fn coordinate(&self) -> ItemCoordinate {
        self.coordinate
    }

    #[must_use]
    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    #[must_use]
    pub fn zipmod_guid(&self) -> Option<&str> {
        self.provenance.as_ref().map(|p| p.guid.as_str())
    }

    #[must_use]
    pub fn zipmod_file_name(&self) -> Option<&str> {
        self.provenance.as_ref().map(|p| p.file_name.as_str())
    }

    /// Slot declared by the package, or -1 for base game items.
    #[must_use]
    pub fn zipmod_slot(&self) -> i32 {
        self.provenance.as_ref().map_or(-1, |p| p.slot)
    }

    #[must_use]
    pub fn stable_cache_id(&self) -> &str {
        &self.stable_cache_id
    }

    #[must_use]
    pub fn legacy_cache_id(&self) -> &str {
        &self.legacy_cache_id
    }

    #[must_use]
    pub fn group_name(&self) -> &str {
        &self.names.group
    }

    #[must_use]
    pub fn category_name(&self) -> &str {
        &self.names.category
    }

    #[must_use]
    pub fn item_name(&self) -> &str {
        &self.names.item
    }

    #[must_use]
    pub fn names(&self) -> &EntryNames {
        &self.names
    }

    #[must_use]
    pub fn original_names(&self) -> &EntryNames {
        &self.original
    }

    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    #[must_use]
    pub fn original_full_name(&self) -> &str {
        &self.original_full_name
    }

    #[must_use]
    pub fn developer_info(&self) -> &DeveloperInfo {
        &self.developer
    }

    /// Developer strings in search order: child root, bundle path, file name,
    /// manifest, then the group, category and slot numbers.
    #[must_use]
    pub fn developer_strings(&self) -> Vec<String> {
        let d = &self.developer;
        [&d.child_root, &d.bundle_path, &d.file_name, &d.manifest]
            .into_iter()
            .flatten()
            .cloned()
            .chain([
                self.coordinate.group_no.to_string(),
                self.coordinate.category_no.to_string(),
                self.coordinate.slot.to_string(),
            ])
            .collect()
    }

    #[must_use]
    pub fn is_sound_effect(&self) -> bool {
        self.is_sound_effect
    }

    /// The search string as last built, without checking the developer flag.
    #[must_use]
    pub fn search_string(&self) -> &str {
        &self.search_string
    }

    #[must_use]
    pub fn search_includes_developer_info(&self) -> bool {
        self.search_includes_developer_info
    }

    /// Replace all three names at once (translation cache hit).
    pub fn set_names(&mut self, names: EntryNames) {
        self.names = names;
        self.refresh_composites();
    }

    /// Replace one translated name. Returns false if nothing changed.
    pub fn set_name(&mut self, field: NameField, text: &str) -> bool {
        let slot = match field {
            NameField::Group => &mut self.names.group,
            NameField::Category => &mut self.names.category,
            NameField::Item => &mut self.names.item,
        };
        if *slot == text {
            return false;
        }
        text.clone_into(slot);
        self.refresh_composites();
        true
    }

    /// Rebuild the search string if it was built with a different flag.
    /// Returns true when a rebuild happened.
    pub fn ensure_search_string(&mut self, include_developer_info: bool) -> bool {
        if self.search_includes_developer_info == include_developer_info {
            return false;
        }
        self.rebuild_search_string(include_developer_info);
        true
    }

    fn refresh_composites(&mut self) {
        self.full_name = self.names.full_name();
        self.rebuild_search_string(self.search_includes_developer_info);
    }

    fn rebuild_search_string(&mut self, include_developer_info: bool) {
        self.search_string = build_search_string(self, include_developer_info);
        self.search_includes_developer_info = include_developer_info;
    }

    /// Multi-line description used by "Print item info".
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Name: {}", self.full_name);
        if self.original_full_name != self.full_name {
            let _ = writeln!(out, "Original name: {}", self.original_full_name);
        }
        let _ = writeln!(
            out,
            "Group: {}  Category: {}  Slot: {}",
            self.coordinate.group_no, self.coordinate.category_no, self.coordinate.slot
        );
        let _ = writeln!(out, "Cache id: {}", self.stable_cache_id);
        let _ = writeln!(out, "Legacy cache id: {}", self.legacy_cache_id);
        if let Some(p) = &self.provenance {
            let _ = writeln!(
                out,
                "Zipmod: {} ({}) slot {}",
                p.guid, p.file_name, p.slot
            );
        }
        let d = &self.developer;
        for (label, value) in [
            ("Child root", &d.child_root),
            ("Bundle", &d.bundle_path),
            ("Asset", &d.file_name),
            ("Manifest", &d.manifest),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                let _ = writeln!(out, "{label}: {value}");
            }
        }
        if self.is_sound_effect {
            out.push_str("Sound effect\n");
        }
        out
    }
}

impl PartialEq for CatalogEntry {
    fn eq(&self, other: &Self) -> bool {
        self.coordinate == other.coordinate
    }
}

impl Eq for CatalogEntry {}

impl Hash for CatalogEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.coordinate.hash(state);
    }
}

/// Persistence id that survives package loaders reassigning local slots.
#[must_use]
pub fn stable_cache_id(group_no: i32, category_no: i32, slot: i32) -> String {
    format!(
        "{}-{}-{}",
        padded(group_no),
        padded(category_no),
        padded(slot)
    )
}

/// Older name-based id, still used to key the translation cache and to find
/// thumbnails generated before stable ids existed.
#[must_use]
pub fn legacy_cache_id(group_no: i32, category_no: i32, item_name: &str) -> String {
    format!(
        "{}-{}-{}",
        padded(group_no),
        padded(category_no),
        make_valid_file_name(item_name)
    )
}

/// Eight digits with the sign in front of the padding: `-1` is `-00000001`.
fn padded(n: i32) -> String {
    let sign = if n < 0 { "-" } else { "" };
    format!("{sign}{:08}", n.unsigned_abs())
}
