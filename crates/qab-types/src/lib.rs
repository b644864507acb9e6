//! Shared types for Quick Access Box components.
//!
//! This crate holds the types that cross the boundary between the host
//! application, `qab-core` and `qab-cli`: item coordinates, the raw catalog
//! source dumped by the host, package provenance records and the small enums
//! the UI feeds back into the core. All types are serializable so a catalog
//! can be captured to JSON and replayed outside the host.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

/// Deserialize a Vec that may be null or missing (both become empty vec)
fn deserialize_null_as_empty_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt: Option<Vec<T>> = Option::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// Position of an item in the host's item tree.
///
/// `slot` is the host-local slot number. Package loaders may hand out a
/// different local slot on every run, so this triple identifies an item
/// within one session only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCoordinate {
    pub group_no: i32,
    pub category_no: i32,
    pub slot: i32,
}

impl ItemCoordinate {
    #[must_use]
    pub const fn new(group_no: i32, category_no: i32, slot: i32) -> Self {
        Self {
            group_no,
            category_no,
            slot,
        }
    }
}

impl fmt::Display for ItemCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "group={} category={} slot={}",
            self.group_no, self.category_no, self.slot
        )
    }
}

/// Raw per-slot item record as registered in the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemLoadInfo {
    /// Untranslated item name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_root: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
}

/// A top-level group and the categories registered under it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    /// Untranslated group name
    pub name: String,

    /// Category number -> untranslated category name
    #[serde(default)]
    pub categories: BTreeMap<i32, String>,
}

/// One record from the package loader describing where a slot came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRecord {
    /// Package GUID
    pub guid: String,

    /// Package file name on disk
    #[serde(default)]
    pub file_name: String,

    pub group_no: i32,
    pub category_no: i32,

    /// Slot number as declared inside the package (stable across runs)
    pub slot: i32,

    /// Slot number the loader assigned in this session
    pub local_slot: i32,
}

/// Item table: group -> category -> slot -> item record.
///
/// A `None` record mirrors a registered slot whose info failed to load.
pub type ItemTable = BTreeMap<i32, BTreeMap<i32, BTreeMap<i32, Option<ItemLoadInfo>>>>;

/// Everything the catalog loader reads from the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSource {
    /// Group number -> group registration
    #[serde(default)]
    pub groups: BTreeMap<i32, GroupInfo>,

    #[serde(default)]
    pub items: ItemTable,

    #[serde(default, deserialize_with = "deserialize_null_as_empty_vec")]
    pub resolve_records: Vec<ResolveRecord>,
}

impl CatalogSource {
    /// Number of item slots in the source, including broken ones.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.items
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }
}

/// Which translatable name of an entry a translation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameField {
    Group,
    Category,
    Item,
}

/// Subset of the catalog shown by the search box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Matches minus hidden items; favorites and recents when the query is empty
    #[default]
    Filtered,
    Favorites,
    Hidden,
    All,
}

impl ViewMode {
    pub const ALL: [ViewMode; 4] = [
        ViewMode::Filtered,
        ViewMode::Favorites,
        ViewMode::Hidden,
        ViewMode::All,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Filtered => "filtered",
            ViewMode::Favorites => "favorites",
            ViewMode::Hidden => "hidden",
            ViewMode::All => "all",
        }
    }

    /// Index used by dropdown-style widgets
    #[must_use]
    pub fn index(self) -> i32 {
        match self {
            ViewMode::Filtered => 0,
            ViewMode::Favorites => 1,
            ViewMode::Hidden => 2,
            ViewMode::All => 3,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A view mode value outside the known set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidViewMode(pub String);

impl fmt::Display for InvalidViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid view mode: {}", self.0)
    }
}

impl std::error::Error for InvalidViewMode {}

impl TryFrom<i32> for ViewMode {
    type Error = InvalidViewMode;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ViewMode::Filtered),
            1 => Ok(ViewMode::Favorites),
            2 => Ok(ViewMode::Hidden),
            3 => Ok(ViewMode::All),
            other => Err(InvalidViewMode(other.to_string())),
        }
    }
}

impl FromStr for ViewMode {
    type Err = InvalidViewMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| InvalidViewMode(s.to_string()))
    }
}

/// Pointer button that activated a list row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    /// Spawn the item
    Left,
    /// Spawn the item parented to the current selection
    Middle,
    /// Open the context menu
    Right,
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn view_mode_index_round_trips(value in -1000i32..1000) {
            match ViewMode::try_from(value) {
                Ok(mode) => prop_assert_eq!(mode.index(), value),
                Err(err) => {
                    prop_assert!(!(0..=3).contains(&value));
                    prop_assert_eq!(err.0, value.to_string());
                }
            }
        }

        #[test]
        fn coordinate_json_keeps_ordering(
            a in (any::<i32>(), any::<i32>(), any::<i32>()),
            b in (any::<i32>(), any::<i32>(), any::<i32>())
        ) {
            let ca = ItemCoordinate::new(a.0, a.1, a.2);
            let cb = ItemCoordinate::new(b.0, b.1, b.2);
            let back: ItemCoordinate = serde_json::from_str(&serde_json::to_string(&ca).unwrap()).unwrap();
            prop_assert_eq!(back, ca);
            prop_assert_eq!(ca.cmp(&cb), a.cmp(&b));
        }
    }
}
