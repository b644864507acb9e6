use crate::catalog::{Catalog, CatalogEntry, CatalogLoadHandle, CatalogLoader, LoadOptions};
use crate::config::{Config, Directories};
use crate::curation::{ChangeCallback, CurationSet, RecencyStore};
use crate::host::{SceneHost, SpawnParent, spawn_entry};
use crate::search::Query;
use crate::thumbs::{
    DirectoryThumbnails, PngIndex, Thumbnail, ThumbnailBatch, ThumbnailHost, ThumbnailPlan,
    ThumbnailResolver, plan,
};
use crate::translation::{
    TranslationCache, TranslationRequester, TranslationUpdate, Translator,
};
use crate::utils::now_millis;
use crate::view::{
    ContextAction, CurationView, RowStyle, context_menu, filter_catalog, row_style,
};
use crate::virtual_list::VirtualList;
use crate::{Error, Result};
use qab_types::{CatalogSource, PointerButton, ViewMode};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, trace, warn};

/// Work posted to the interactive thread from other threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreMessage {
    /// A translator finished one name
    Translated(TranslationUpdate),
    /// Favorites, hidden items or recents changed
    CurationChanged,
}

/// What a row click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Spawned(usize),
    ContextMenu {
        index: usize,
        actions: Vec<ContextAction>,
    },
    /// The slot showed no row
    Ignored,
}

/// Quick access engine: owns the catalog, the stores layered over it and the
/// list state the search box shows.
///
/// Everything here runs on the interactive thread. Background work (catalog
/// loading, translations) reports back through the message queue, which
/// [`QuickAccessCore::tick`] drains.
pub struct QuickAccessCore {
    dirs: Directories,
    config: Config,
    catalog: Option<Catalog>,
    loading: Option<CatalogLoadHandle>,
    translations: TranslationCache,
    /// Translations that arrived before the catalog was published
    early_translations: Vec<TranslationUpdate>,
    favorites: CurationSet,
    hidden: CurationSet,
    recents: RecencyStore,
    query_text: String,
    query: Query,
    view_mode: ViewMode,
    list: VirtualList<usize>,
    thumbnails: ThumbnailResolver,
    message_tx: UnboundedSender<CoreMessage>,
    message_rx: UnboundedReceiver<CoreMessage>,
    needs_refresh: bool,
}

impl QuickAccessCore {
    /// Create a core using the platform directories.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the config fails
    /// to load.
    pub fn new() -> Result<Self> {
        Self::with_directories(Directories::new()?)
    }

    /// Create a core whose files live in `dirs`.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created, the config fails to
    /// load or the list geometry is invalid.
    pub fn with_directories(dirs: Directories) -> Result<Self> {
        dirs.ensure_exists()?;
        let config = Config::load(&dirs.config_file)?;
        Self::with_config(dirs, config)
    }

    /// Create a core with an explicit config; nothing is read from the
    /// config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the list geometry is invalid.
    pub fn with_config(dirs: Directories, config: Config) -> Result<Self> {
        let persistence = &config.persistence;
        let curation_delay = persistence.curation_save_delay();

        let translations =
            TranslationCache::load(&dirs.translation_cache, persistence.translation_save_delay());
        let mut favorites = CurationSet::load("favorites", &dirs.favorites_file, curation_delay);
        let mut hidden = CurationSet::load("hidden", &dirs.hidden_file, curation_delay);
        let mut recents = RecencyStore::load(
            &dirs.recents_file,
            config.general.effective_recents_count(),
            curation_delay,
        );

        let (message_tx, message_rx) = mpsc::unbounded_channel();
        favorites.set_on_changed(curation_notifier(&message_tx));
        hidden.set_on_changed(curation_notifier(&message_tx));
        recents.set_on_changed(curation_notifier(&message_tx));

        let list = VirtualList::new(config.list.row_height, config.list.viewport_height)?;

        let bundled_dir = config
            .thumbnails
            .bundled_directory
            .clone()
            .unwrap_or_else(|| dirs.bundled_thumbnails.clone());
        let png_index = if bundled_dir.is_dir() {
            PngIndex::scan(&bundled_dir)
        } else {
            debug!("No bundled thumbnails at {}", bundled_dir.display());
            PngIndex::default()
        };
        let mut thumbnails = ThumbnailResolver::new(png_index);
        let thumbnail_dir = config
            .thumbnails
            .output_directory
            .clone()
            .unwrap_or_else(|| dirs.thumbnails.clone());
        thumbnails.register_provider(Box::new(DirectoryThumbnails::new(thumbnail_dir)));

        debug!(
            "Core ready: {} favorites, {} hidden, {} recents, {} cached translations",
            favorites.len(),
            hidden.len(),
            recents.len(),
            translations.len()
        );

        Ok(Self {
            dirs,
            config,
            catalog: None,
            loading: None,
            translations,
            early_translations: Vec::new(),
            favorites,
            hidden,
            recents,
            query_text: String::new(),
            query: Query::default(),
            view_mode: ViewMode::default(),
            list,
            thumbnails,
            message_tx,
            message_rx,
            needs_refresh: true,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn directories(&self) -> &Directories {
        &self.dirs
    }

    /// Queue for posting work to this core from other threads.
    #[must_use]
    pub fn message_sender(&self) -> UnboundedSender<CoreMessage> {
        self.message_tx.clone()
    }

    /// Start loading `source` on a background thread. Names missing from the
    /// translation cache go to `translator` when one is given.
    ///
    /// # Errors
    ///
    /// Returns an error if a catalog is already loaded or loading, or the
    /// loader thread cannot be started.
    pub fn start_loading(
        &mut self,
        source: CatalogSource,
        translator: Option<Arc<dyn Translator>>,
    ) -> Result<()> {
        if self.catalog.is_some() || self.loading.is_some() {
            return Err(Error::Catalog("catalog is already loaded".to_string()));
        }

        let requester = translator.map(|t| TranslationRequester::new(t, self.message_tx.clone()));
        let options = LoadOptions {
            sound_effect_groups: self.config.catalog.sound_effect_groups.clone(),
            developer_info: self.config.general.search_developer_info,
        };

        info!("Loading catalog of {} slots", source.slot_count());
        self.loading = Some(CatalogLoader::spawn(
            Arc::new(source),
            self.translations.snapshot(),
            requester,
            options,
        )?);
        Ok(())
    }

    /// Wait for a load started with [`QuickAccessCore::start_loading`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotLoaded`] if no load was started, or an error if
    /// the loader thread died.
    pub async fn wait_loaded(&mut self) -> Result<()> {
        if self.catalog.is_some() {
            return Ok(());
        }
        let handle = self.loading.take().ok_or(Error::NotLoaded)?;
        let entries = handle.wait().await?;
        self.publish(entries);
        self.tick();
        Ok(())
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.catalog.is_some()
    }

    #[must_use]
    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    /// Run one frame of interactive work: publish a finished catalog load,
    /// apply queued messages, refresh the list and save whatever is due.
    pub fn tick(&mut self) {
        self.poll_loading();
        self.drain_messages();
        if self.needs_refresh {
            self.refresh();
        }
        self.save_due(now_millis());
    }

    fn poll_loading(&mut self) {
        let Some(handle) = self.loading.as_mut() else {
            return;
        };
        match handle.try_take() {
            None => {}
            Some(Ok(entries)) => {
                self.loading = None;
                self.publish(entries);
            }
            Some(Err(e)) => {
                self.loading = None;
                error!("Catalog load failed: {e}");
            }
        }
    }

    fn publish(&mut self, entries: Vec<CatalogEntry>) {
        let mut catalog =
            Catalog::from_entries(entries, self.config.general.search_developer_info);
        let early = std::mem::take(&mut self.early_translations);
        for update in &early {
            catalog.apply_translation(update);
        }
        // Unchanged names are cached too, so the next start asks for nothing
        if !early.is_empty() {
            self.translations.request_save(now_millis());
        }

        info!("Catalog published with {} items", catalog.len());
        self.catalog = Some(catalog);
        self.needs_refresh = true;
    }

    fn drain_messages(&mut self) {
        while let Ok(message) = self.message_rx.try_recv() {
            self.handle_message(message);
        }
    }

    fn handle_message(&mut self, message: CoreMessage) {
        match message {
            CoreMessage::Translated(update) => {
                let Some(catalog) = self.catalog.as_mut() else {
                    trace!("Holding translation for {} until publish", update.coordinate);
                    self.early_translations.push(update);
                    return;
                };
                self.translations.request_save(now_millis());
                if catalog.apply_translation(&update).is_some() {
                    self.list.refresh_rows();
                    self.needs_refresh = true;
                }
            }
            CoreMessage::CurationChanged => {
                self.list.refresh_rows();
                self.needs_refresh = true;
            }
        }
    }

    fn save_due(&mut self, now: u64) {
        if let Some(catalog) = &self.catalog {
            self.translations.save_if_due(now, catalog.entries());
        }
        self.favorites.save_if_due(now);
        self.hidden.save_if_due(now);
        self.recents.save_if_due(now);
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query_text
    }

    /// Change the search text and scroll back to the top.
    pub fn set_query(&mut self, text: &str) {
        if text == self.query_text {
            return;
        }
        self.query_text = text.to_string();
        self.query = Query::parse(text);
        self.list.set_scroll_offset(0.0);
        self.refresh();
    }

    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        if mode == self.view_mode {
            return;
        }
        debug!("View mode {} -> {}", self.view_mode, mode);
        self.view_mode = mode;
        self.list.set_scroll_offset(0.0);
        self.refresh();
    }

    /// Set the view mode from its numeric index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidViewMode`] for an index outside the known modes.
    pub fn set_view_mode_index(&mut self, index: i32) -> Result<()> {
        let mode = ViewMode::try_from(index)?;
        self.set_view_mode(mode);
        Ok(())
    }

    /// Toggle developer strings in search. Stale search strings are rebuilt.
    pub fn set_developer_info(&mut self, enabled: bool) {
        self.config.general.search_developer_info = enabled;
        let rebuilt = self
            .catalog
            .as_mut()
            .map_or(0, |catalog| catalog.set_developer_info(enabled));
        if rebuilt > 0 {
            self.refresh();
        }
    }

    fn curation(&self) -> CurationView<'_> {
        CurationView {
            favorites: &self.favorites,
            hidden: &self.hidden,
            recents: &self.recents,
        }
    }

    /// Recompute the shown rows for the current query and view mode.
    /// Returns the list slots that need redrawing.
    pub fn refresh(&mut self) -> Vec<usize> {
        self.needs_refresh = false;
        let shown = match &self.catalog {
            Some(catalog) => filter_catalog(catalog, &self.query, self.view_mode, self.curation()),
            None => Vec::new(),
        };
        trace!("'{}' in {} view: {} rows", self.query_text, self.view_mode, shown.len());

        self.list.set_items(shown);
        let rebound = self.list.update();
        if self.list.selected_key().is_none() {
            self.list.select_first();
        }
        rebound
    }

    /// Catalog indices of the shown rows, in display order.
    #[must_use]
    pub fn results(&self) -> &[usize] {
        self.list.items()
    }

    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&CatalogEntry> {
        self.catalog.as_ref()?.get(index)
    }

    /// Entries of the shown rows, in display order.
    pub fn result_entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.results().iter().filter_map(|&i| self.entry(i))
    }

    #[must_use]
    pub fn list(&self) -> &VirtualList<usize> {
        &self.list
    }

    /// Scroll the list. Returns the list slots that need redrawing.
    pub fn scroll_to(&mut self, offset: f64) -> Vec<usize> {
        self.list.set_scroll_offset(offset);
        self.list.update()
    }

    #[must_use]
    pub fn row_style(&self, index: usize) -> Option<RowStyle> {
        self.entry(index).map(|e| row_style(e, self.curation()))
    }

    pub fn thumbnail(&mut self, index: usize) -> Option<Thumbnail> {
        let entry = self.catalog.as_ref()?.get(index)?;
        Some(self.thumbnails.resolve(entry))
    }

    #[must_use]
    pub fn thumbnails(&self) -> &ThumbnailResolver {
        &self.thumbnails
    }

    pub fn thumbnails_mut(&mut self) -> &mut ThumbnailResolver {
        &mut self.thumbnails
    }

    #[must_use]
    pub fn favorites(&self) -> &CurationSet {
        &self.favorites
    }

    #[must_use]
    pub fn hidden(&self) -> &CurationSet {
        &self.hidden
    }

    #[must_use]
    pub fn recents(&self) -> &RecencyStore {
        &self.recents
    }

    /// Dispatch a click on list slot `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if spawning failed.
    pub fn click_row(
        &mut self,
        slot: usize,
        button: PointerButton,
        host: &mut dyn SceneHost,
    ) -> Result<ClickOutcome> {
        let Some(click) = self.list.click(slot, button) else {
            return Ok(ClickOutcome::Ignored);
        };
        let index = click.key;

        match click.button {
            PointerButton::Left => self.spawn(index, SpawnParent::Scene, host)?,
            PointerButton::Middle => self.spawn(index, SpawnParent::Selection, host)?,
            PointerButton::Right => {
                let entry = self.entry(index).ok_or(Error::NotLoaded)?;
                let actions = context_menu(entry, self.curation());
                return Ok(ClickOutcome::ContextMenu { index, actions });
            }
        }
        Ok(ClickOutcome::Spawned(index))
    }

    /// Spawn the entry at catalog `index` and record the use.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog isn't loaded, `index` is out of range
    /// or the host failed to spawn.
    pub fn spawn(
        &mut self,
        index: usize,
        parent: SpawnParent,
        host: &mut dyn SceneHost,
    ) -> Result<()> {
        let catalog = self.catalog.as_ref().ok_or(Error::NotLoaded)?;
        let entry = catalog
            .get(index)
            .ok_or_else(|| Error::InvalidArgument(format!("no catalog entry {index}")))?;

        spawn_entry(host, entry, parent)?;
        self.recents.bump(entry.stable_cache_id());
        Ok(())
    }

    /// Apply a context menu action to the entry at catalog `index`.
    /// [`ContextAction::PrintInfo`] returns the description it logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog isn't loaded or `index` is out of
    /// range.
    pub fn apply_context_action(
        &mut self,
        index: usize,
        action: ContextAction,
    ) -> Result<Option<String>> {
        let catalog = self.catalog.as_ref().ok_or(Error::NotLoaded)?;
        let entry = catalog
            .get(index)
            .ok_or_else(|| Error::InvalidArgument(format!("no catalog entry {index}")))?;
        let guid = entry.zipmod_guid();
        let id = entry.stable_cache_id();

        match action {
            ContextAction::FavoriteItem => {
                self.favorites.add_item(guid, id);
            }
            ContextAction::FavoriteMod => {
                self.favorites.add_mod(guid, catalog.entries());
            }
            ContextAction::UnfavoriteItem => {
                self.favorites.remove_item(guid, id);
            }
            ContextAction::UnfavoriteMod => {
                self.favorites.remove_mod(guid);
            }
            ContextAction::HideItem => {
                self.hidden.add_item(guid, id);
            }
            ContextAction::HideMod => {
                self.hidden.add_mod(guid, catalog.entries());
            }
            ContextAction::UnhideItem => {
                self.hidden.remove_item(guid, id);
            }
            ContextAction::UnhideMod => {
                self.hidden.remove_mod(guid);
            }
            ContextAction::PrintInfo => {
                let description = entry.describe();
                info!(target: "qab::message", "{description}");
                return Ok(Some(description));
            }
        }

        self.drain_messages();
        if self.needs_refresh {
            self.refresh();
        }
        Ok(None)
    }

    /// Where generated thumbnails are written.
    #[must_use]
    pub fn thumbnail_dir(&self) -> PathBuf {
        self.config
            .thumbnails
            .output_directory
            .clone()
            .unwrap_or_else(|| self.dirs.thumbnails.clone())
    }

    /// What a thumbnail batch over the whole catalog would do.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotLoaded`] before the catalog is published.
    pub fn thumbnail_plan(&self) -> Result<ThumbnailPlan<'_>> {
        let catalog = self.catalog.as_ref().ok_or(Error::NotLoaded)?;
        Ok(plan(catalog.entries(), &self.thumbnail_dir(), &self.thumbnails))
    }

    /// Set up a thumbnail batch over the whole catalog. Drive it with
    /// [`ThumbnailBatch::tick`] from the host's frame loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog isn't loaded or the batch
    /// preconditions fail.
    pub fn make_thumbnails(&self, host: &dyn ThumbnailHost) -> Result<ThumbnailBatch> {
        let catalog = self.catalog.as_ref().ok_or(Error::NotLoaded)?;
        ThumbnailBatch::new(
            catalog.entries().to_vec(),
            self.thumbnail_dir(),
            &self.config.thumbnails,
            &self.thumbnails,
            host,
        )
    }

    /// Save everything that is pending, now.
    pub fn shutdown(&mut self) {
        self.drain_messages();
        match &self.catalog {
            Some(catalog) => self.translations.flush(catalog.entries()),
            None => {
                if self.translations.is_save_pending() {
                    warn!("Dropping pending translation cache save, catalog never loaded");
                }
            }
        }
        self.favorites.flush();
        self.hidden.flush();
        self.recents.flush();
        info!("Quick access core shut down");
    }
}

fn curation_notifier(tx: &UnboundedSender<CoreMessage>) -> ChangeCallback {
    let tx = tx.clone();
    Box::new(move || {
        if tx.send(CoreMessage::CurationChanged).is_err() {
            trace!("Core is gone, dropping curation change");
        }
    })
}
