//! Which catalog entries the list shows, and how each row looks and behaves.

use crate::catalog::{Catalog, CatalogEntry};
use crate::curation::{CurationSet, RecencyStore};
use crate::search::Query;
use qab_types::ViewMode;
use std::cmp::Ordering;

/// Borrowed curation stores consulted while filtering.
#[derive(Clone, Copy)]
pub struct CurationView<'a> {
    pub favorites: &'a CurationSet,
    pub hidden: &'a CurationSet,
    pub recents: &'a RecencyStore,
}

impl CurationView<'_> {
    #[must_use]
    pub fn is_favorite(&self, entry: &CatalogEntry) -> bool {
        self.favorites.contains(entry)
    }

    #[must_use]
    pub fn is_hidden(&self, entry: &CatalogEntry) -> bool {
        self.hidden.contains(entry)
    }

    #[must_use]
    pub fn last_use(&self, entry: &CatalogEntry) -> Option<u64> {
        self.recents.try_get_last_use(entry.stable_cache_id())
    }
}

/// Catalog indices to show for `query` under `mode`.
///
/// With an empty query the filtered view shows favorites and recents, most
/// recently used first; every other combination keeps catalog order.
#[must_use]
pub fn filter_catalog(
    catalog: &Catalog,
    query: &Query,
    mode: ViewMode,
    curation: CurationView<'_>,
) -> Vec<usize> {
    let entries = catalog.entries();
    let select = |keep: &dyn Fn(&CatalogEntry) -> bool| -> Vec<usize> {
        entries
            .iter()
            .enumerate()
            .filter(|(_, e)| keep(e))
            .map(|(i, _)| i)
            .collect()
    };
    let matching = |e: &CatalogEntry| query.matches(e.search_string());

    match mode {
        ViewMode::Filtered if query.is_empty() => {
            let mut shown = select(&|e| curation.is_favorite(e) || curation.last_use(e).is_some());
            shown.sort_by(|&a, &b| {
                let (a, b) = (&entries[a], &entries[b]);
                compare_last_use(curation.last_use(a), curation.last_use(b))
                    .then_with(|| b.item_name().cmp(a.item_name()))
            });
            shown
        }
        ViewMode::Filtered => select(&|e| matching(e) && !curation.is_hidden(e)),
        ViewMode::Favorites => select(&|e| matching(e) && curation.is_favorite(e)),
        ViewMode::Hidden => select(&|e| matching(e) && curation.is_hidden(e)),
        ViewMode::All => select(&matching),
    }
}

/// Most recent first; never-used entries last.
fn compare_last_use(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Highlight of a list row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStyle {
    Favorite,
    Hidden,
    Normal,
}

#[must_use]
pub fn row_style(entry: &CatalogEntry, curation: CurationView<'_>) -> RowStyle {
    if curation.is_favorite(entry) {
        RowStyle::Favorite
    } else if curation.is_hidden(entry) {
        RowStyle::Hidden
    } else {
        RowStyle::Normal
    }
}

/// Actions offered by a row's context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextAction {
    FavoriteItem,
    FavoriteMod,
    UnfavoriteItem,
    UnfavoriteMod,
    HideItem,
    HideMod,
    UnhideItem,
    UnhideMod,
    PrintInfo,
}

impl ContextAction {
    pub const ALL: [ContextAction; 9] = [
        ContextAction::FavoriteItem,
        ContextAction::FavoriteMod,
        ContextAction::UnfavoriteItem,
        ContextAction::UnfavoriteMod,
        ContextAction::HideItem,
        ContextAction::HideMod,
        ContextAction::UnhideItem,
        ContextAction::UnhideMod,
        ContextAction::PrintInfo,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ContextAction::FavoriteItem => "Favorite this item",
            ContextAction::FavoriteMod => "Favorite all items from this mod",
            ContextAction::UnfavoriteItem => "Unfavorite this item",
            ContextAction::UnfavoriteMod => "Unfavorite all items from this mod",
            ContextAction::HideItem => "Hide this item",
            ContextAction::HideMod => "Hide all items from this mod",
            ContextAction::UnhideItem => "Unhide this item",
            ContextAction::UnhideMod => "Unhide all items from this mod",
            ContextAction::PrintInfo => "Print item info",
        }
    }

    /// Whether the action applies to an item with the given state.
    #[must_use]
    pub fn is_visible(self, is_favorite: bool, is_hidden: bool) -> bool {
        match self {
            ContextAction::FavoriteItem | ContextAction::FavoriteMod => !is_favorite,
            ContextAction::UnfavoriteItem | ContextAction::UnfavoriteMod => is_favorite,
            ContextAction::HideItem | ContextAction::HideMod => !is_hidden,
            ContextAction::UnhideItem | ContextAction::UnhideMod => is_hidden,
            ContextAction::PrintInfo => true,
        }
    }
}

/// Visible context actions for `entry`, in menu order.
#[must_use]
pub fn context_menu(entry: &CatalogEntry, curation: CurationView<'_>) -> Vec<ContextAction> {
    let is_favorite = curation.is_favorite(entry);
    let is_hidden = curation.is_hidden(entry);
    ContextAction::ALL
        .into_iter()
        .filter(|a| a.is_visible(is_favorite, is_hidden))
        .collect()
}
