//! Virtualized list: a fixed pool of row slots rebound to whichever logical
//! rows are in view, with spacer paddings standing in for the rest.

use crate::{Error, Result};
use qab_types::PointerButton;

/// A click on a bound row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowClick<K> {
    pub key: K,
    pub button: PointerButton,
}

/// Fixed-size slot pool over a list of keys.
///
/// Keys are the identity of a row: a slot whose key did not change is not
/// rebound. The list never holds row widgets itself; callers draw
/// `slot_key(i)` into their `i`-th widget for every slot `update()` returns.
#[derive(Debug, Clone)]
pub struct VirtualList<K> {
    row_height: f64,
    base_top_padding: f64,
    base_bottom_padding: f64,
    items: Vec<K>,
    slots: Vec<Option<K>>,
    scroll_offset: f64,
    items_above: usize,
    dirty: bool,
    force_rebind: bool,
    top_padding: f64,
    bottom_padding: f64,
    selected: Option<K>,
}

impl<K: Copy + Eq> VirtualList<K> {
    /// Create a list whose pool covers `viewport_height` plus one row.
    ///
    /// # Errors
    ///
    /// Returns an error if either height is not a positive finite number.
    pub fn new(row_height: f64, viewport_height: f64) -> Result<Self> {
        if !(row_height.is_finite() && row_height > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "row height must be positive, got {row_height}"
            )));
        }
        if !(viewport_height.is_finite() && viewport_height >= 0.0) {
            return Err(Error::InvalidArgument(format!(
                "viewport height must be non-negative, got {viewport_height}"
            )));
        }

        Ok(Self {
            row_height,
            base_top_padding: 0.0,
            base_bottom_padding: 0.0,
            items: Vec::new(),
            slots: vec![None; pool_size_for(row_height, viewport_height)],
            scroll_offset: 0.0,
            items_above: 0,
            dirty: true,
            force_rebind: false,
            top_padding: 0.0,
            bottom_padding: 0.0,
            selected: None,
        })
    }

    /// Padding the surrounding layout already has above and below the rows.
    #[must_use]
    pub fn with_base_padding(mut self, top: f64, bottom: f64) -> Self {
        self.base_top_padding = top;
        self.base_bottom_padding = bottom;
        self.dirty = true;
        self
    }

    pub fn set_items(&mut self, items: Vec<K>) {
        self.items = items;
        self.dirty = true;
    }

    pub fn clear(&mut self) {
        self.set_items(Vec::new());
    }

    /// Scroll position in pixels from the top of the content.
    pub fn set_scroll_offset(&mut self, offset: f64) {
        self.scroll_offset = if offset.is_finite() { offset } else { 0.0 };
    }

    /// Make the next `update()` rebind every slot even if keys are unchanged.
    pub fn refresh_rows(&mut self) {
        self.force_rebind = true;
    }

    /// Recompute bindings and paddings. Returns the slots that got a new key.
    pub fn update(&mut self) -> Vec<usize> {
        let above = self.compute_items_above();
        if above == self.items_above && !self.dirty && !self.force_rebind {
            return Vec::new();
        }
        self.items_above = above;

        let mut rebound = Vec::new();
        for (slot, bound) in self.slots.iter_mut().enumerate() {
            let key = self.items.get(above + slot).copied();
            if key != *bound || (self.force_rebind && key.is_some()) {
                *bound = key;
                if key.is_some() {
                    rebound.push(slot);
                }
            }
        }

        if let Some(selected) = self.selected
            && !self.slots.contains(&Some(selected))
        {
            self.selected = None;
        }

        self.recalculate_paddings();
        self.dirty = false;
        self.force_rebind = false;
        rebound
    }

    // Row counts are far below 2^52, and the clamp keeps the value non-negative
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn compute_items_above(&self) -> usize {
        let offscreen = self.items.len().saturating_sub(self.slots.len()) as f64;
        (self.scroll_offset / self.row_height)
            .clamp(0.0, offscreen)
            .floor() as usize
    }

    // Row counts are far below 2^52
    #[allow(clippy::cast_precision_loss)]
    fn recalculate_paddings(&mut self) {
        let above = self.items_above as f64 * self.row_height;
        let total = self.items.len() as f64 * self.row_height;
        let pool = self.slots.len() as f64 * self.row_height;

        self.top_padding = self.base_top_padding + above;
        self.bottom_padding = self.base_bottom_padding + (total - pool - above).max(0.0);
    }

    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn items(&self) -> &[K] {
        &self.items
    }

    #[must_use]
    pub fn items_above(&self) -> usize {
        self.items_above
    }

    #[must_use]
    pub fn row_height(&self) -> f64 {
        self.row_height
    }

    #[must_use]
    pub fn top_padding(&self) -> f64 {
        self.top_padding
    }

    #[must_use]
    pub fn bottom_padding(&self) -> f64 {
        self.bottom_padding
    }

    /// Key bound to `slot`, or `None` for a hidden spare slot.
    #[must_use]
    pub fn slot_key(&self, slot: usize) -> Option<K> {
        self.slots.get(slot).copied().flatten()
    }

    #[must_use]
    pub fn is_slot_visible(&self, slot: usize) -> bool {
        self.slot_key(slot).is_some()
    }

    /// Number of slots currently showing a row.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Logical index shown by `slot`.
    #[must_use]
    pub fn logical_index(&self, slot: usize) -> Option<usize> {
        self.is_slot_visible(slot).then_some(self.items_above + slot)
    }

    /// Padding plus rows: the height a scroll view should give its content.
    // Row counts are far below 2^52
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn content_height(&self) -> f64 {
        self.top_padding + self.visible_count() as f64 * self.row_height + self.bottom_padding
    }

    /// Scroll offset that puts logical row `index` at the top.
    // Row counts are far below 2^52
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn offset_of(&self, index: usize) -> f64 {
        index as f64 * self.row_height
    }

    /// Resolve a click on `slot`. Clicking selects the row.
    pub fn click(&mut self, slot: usize, button: PointerButton) -> Option<RowClick<K>> {
        let key = self.slot_key(slot)?;
        self.selected = Some(key);
        Some(RowClick { key, button })
    }

    /// Select the first row of the list.
    pub fn select_first(&mut self) -> Option<K> {
        self.selected = self.items.first().copied();
        self.selected
    }

    #[must_use]
    pub fn selected_key(&self) -> Option<K> {
        self.selected
    }

    /// Slot currently showing the selected key.
    #[must_use]
    pub fn selected_slot(&self) -> Option<usize> {
        let selected = self.selected?;
        self.slots.iter().position(|s| *s == Some(selected))
    }
}

// Viewport heights are small positive numbers
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pool_size_for(row_height: f64, viewport_height: f64) -> usize {
    (viewport_height / row_height).ceil() as usize + 1
}
