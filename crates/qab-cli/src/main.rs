//! Quick Access Box CLI
//!
//! Loads a catalog dump exported from the host and works on it the way the
//! in-scene search box does:
//! - Search with the same query language and view modes
//! - Manage favorites and hidden items
//! - Inspect recents, item info and thumbnail work

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use qab_core::catalog::CatalogEntry;
use qab_core::config::Directories;
use qab_core::thumbs::Thumbnail;
use qab_core::translation::{TranslationCallback, Translator};
use qab_core::view::{ContextAction, RowStyle};
use qab_core::{CatalogSource, QuickAccessCore, ViewMode};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "qab")]
#[command(about = "Quick Access Box - search and curate a studio item catalog")]
#[command(version)]
#[command(after_help = "\
Examples:
  qab -c catalog.json search red chair          Items matching both words
  qab -c catalog.json search -- bikini -red     Exclude a word with '-'
  qab -c catalog.json search --view favorites   List favorites
  qab -c catalog.json search --dev p_chair      Match asset names too
  qab -c catalog.json favorites add 0/2/20      Favorite by coordinate
  qab -c catalog.json hidden add --mod 'Sofa'   Hide every item of a mod
  qab -c catalog.json info 'Props/Misc/Red Ball'
  qab -c catalog.json thumbs plan --json

Set RUST_LOG=qab=debug for verbose output.
")]
struct Cli {
    /// Catalog dump (JSON) exported from the host
    #[arg(short, long, value_name = "FILE")]
    catalog: PathBuf,

    /// Keep config and caches in this directory instead of the user dirs
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// JSON object mapping original names to translations
    #[arg(long, value_name = "FILE")]
    dictionary: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog
    Search {
        /// Query words; prefix a word with '-' to exclude it
        query: Vec<String>,

        /// Which subset to search (filtered, favorites, hidden, all)
        #[arg(long, default_value_t = ViewMode::Filtered)]
        view: ViewMode,

        /// Also match asset, bundle and package names
        #[arg(long)]
        dev: bool,

        /// Show at most this many rows (0 shows everything)
        #[arg(short = 'n', long, default_value_t = 25)]
        limit: usize,
    },

    /// Manage favorite items
    Favorites {
        #[command(subcommand)]
        command: CurationCommand,
    },

    /// Manage hidden items
    Hidden {
        #[command(subcommand)]
        command: CurationCommand,
    },

    /// List recently spawned items, newest first
    Recents,

    /// Print everything known about an item
    Info {
        /// Stable id, full name or coordinate (group/category/slot)
        item: String,
    },

    /// Show catalog statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Thumbnail utilities
    Thumbs {
        #[command(subcommand)]
        command: ThumbsCommand,
    },
}

#[derive(Subcommand)]
enum CurationCommand {
    /// Add an item
    Add {
        /// Stable id, full name or coordinate (group/category/slot)
        item: String,

        /// Apply to every item from the same mod
        #[arg(long = "mod")]
        whole_mod: bool,
    },

    /// Remove an item
    Remove {
        /// Stable id, full name or coordinate (group/category/slot)
        item: String,

        /// Apply to every item from the same mod
        #[arg(long = "mod")]
        whole_mod: bool,
    },

    /// List the stored items
    List,
}

#[derive(Subcommand)]
enum ThumbsCommand {
    /// Show what a thumbnail batch would generate and skip
    Plan {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Which curation set a [`CurationCommand`] works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CurationKind {
    Favorites,
    Hidden,
}

impl CurationKind {
    fn action(self, add: bool, whole_mod: bool) -> ContextAction {
        match (self, add, whole_mod) {
            (CurationKind::Favorites, true, false) => ContextAction::FavoriteItem,
            (CurationKind::Favorites, true, true) => ContextAction::FavoriteMod,
            (CurationKind::Favorites, false, false) => ContextAction::UnfavoriteItem,
            (CurationKind::Favorites, false, true) => ContextAction::UnfavoriteMod,
            (CurationKind::Hidden, true, false) => ContextAction::HideItem,
            (CurationKind::Hidden, true, true) => ContextAction::HideMod,
            (CurationKind::Hidden, false, false) => ContextAction::UnhideItem,
            (CurationKind::Hidden, false, true) => ContextAction::UnhideMod,
        }
    }

    fn label(self) -> &'static str {
        match self {
            CurationKind::Favorites => "favorites",
            CurationKind::Hidden => "hidden",
        }
    }
}

/// Translates from a fixed word list; unknown text comes back unchanged.
struct DictionaryTranslator {
    words: HashMap<String, String>,
}

impl DictionaryTranslator {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dictionary {}", path.display()))?;
        let words: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid dictionary {}", path.display()))?;
        debug!("Loaded {} dictionary words from {}", words.len(), path.display());
        Ok(Self { words })
    }
}

impl Translator for DictionaryTranslator {
    fn translate(&self, text: &str, on_done: TranslationCallback) -> anyhow::Result<()> {
        let translated = self.words.get(text).map_or(text, String::as_str);
        on_done(translated.to_string());
        Ok(())
    }
}

/// Set up logging to stderr. Debug builds also log to a timestamped file in
/// the temp directory.
fn setup_logging() {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("qab={default_level}")));

    if cfg!(debug_assertions) {
        let temp_dir = std::env::temp_dir();
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let log_filename = format!("qab-{timestamp}.log");

        let file_appender = tracing_appender::rolling::never(&temp_dir, &log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        std::mem::forget(guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true);

        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging();

    let mut core = open_core(&cli).await?;
    let outcome = run_command(&mut core, cli.command);
    core.shutdown();
    outcome
}

/// Build the core, load the catalog dump and wait for it to publish.
async fn open_core(cli: &Cli) -> Result<QuickAccessCore> {
    let mut core = match &cli.base_dir {
        Some(base) => QuickAccessCore::with_directories(Directories::with_base(base.clone())),
        None => QuickAccessCore::new(),
    }
    .context("Failed to set up qab directories")?;

    let source = read_catalog(&cli.catalog)?;
    let translator: Option<Arc<dyn Translator>> = match &cli.dictionary {
        Some(path) => Some(Arc::new(DictionaryTranslator::load(path)?)),
        None => None,
    };

    core.start_loading(source, translator)
        .context("Failed to start loading the catalog")?;
    core.wait_loaded()
        .await
        .context("Failed to load the catalog")?;
    core.tick();

    Ok(core)
}

fn read_catalog(path: &Path) -> Result<CatalogSource> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    let source: CatalogSource = serde_json::from_str(&content)
        .with_context(|| format!("Invalid catalog dump {}", path.display()))?;
    info!(
        "Read {} slots in {} groups from {}",
        source.slot_count(),
        source.groups.len(),
        path.display()
    );
    Ok(source)
}

fn run_command(core: &mut QuickAccessCore, command: Commands) -> Result<()> {
    match command {
        Commands::Search {
            query,
            view,
            dev,
            limit,
        } => {
            run_search(core, &query.join(" "), view, dev, limit);
            Ok(())
        }
        Commands::Favorites { command } => run_curation(core, CurationKind::Favorites, command),
        Commands::Hidden { command } => run_curation(core, CurationKind::Hidden, command),
        Commands::Recents => {
            run_recents(core);
            Ok(())
        }
        Commands::Info { item } => run_info(core, &item),
        Commands::Stats { json } => run_stats(core, json),
        Commands::Thumbs {
            command: ThumbsCommand::Plan { json },
        } => run_thumbs_plan(core, json),
    }
}

fn run_search(core: &mut QuickAccessCore, query: &str, view: ViewMode, dev: bool, limit: usize) {
    if dev {
        core.set_developer_info(true);
    }
    core.set_view_mode(view);
    core.set_query(query);
    core.refresh();

    let results = core.results().to_vec();
    if results.is_empty() {
        println!("No items found.");
        return;
    }

    let shown = if limit == 0 {
        results.len()
    } else {
        limit.min(results.len())
    };
    for &index in &results[..shown] {
        let Some(entry) = core.entry(index) else {
            continue;
        };
        let marker = match core.row_style(index) {
            Some(RowStyle::Favorite) => "*",
            Some(RowStyle::Hidden) => "-",
            _ => " ",
        };
        println!("{marker} {:<60} {}", entry.full_name(), entry.stable_cache_id());
    }
    if shown < results.len() {
        println!("... {} more", results.len() - shown);
    }
}

fn run_curation(
    core: &mut QuickAccessCore,
    kind: CurationKind,
    command: CurationCommand,
) -> Result<()> {
    let (item, add, whole_mod) = match command {
        CurationCommand::List => {
            list_curation(core, kind);
            return Ok(());
        }
        CurationCommand::Add { item, whole_mod } => (item, true, whole_mod),
        CurationCommand::Remove { item, whole_mod } => (item, false, whole_mod),
    };

    let index = find_entry(core, &item)?;
    let action = kind.action(add, whole_mod);
    core.apply_context_action(index, action)
        .with_context(|| format!("Failed to update {}", kind.label()))?;

    if let Some(entry) = core.entry(index) {
        println!("{}: {}", action.label(), entry.full_name());
    }
    Ok(())
}

fn list_curation(core: &QuickAccessCore, kind: CurationKind) {
    let set = match kind {
        CurationKind::Favorites => core.favorites(),
        CurationKind::Hidden => core.hidden(),
    };
    if set.is_empty() {
        println!("No {} items.", kind.label());
        return;
    }

    let by_key = entries_by_curation_key(catalog_entries(core));
    for (guid, id) in set.iter() {
        let name = by_key
            .get(&(guid, id))
            .map_or("(not in catalog)", |e| e.full_name());
        let package = if guid.is_empty() { "base game" } else { guid };
        println!("{id:<24} {name:<60} {package}");
    }
}

fn run_recents(core: &QuickAccessCore) {
    let recents = core.recents().ids_by_recency();
    if recents.is_empty() {
        println!("No recently used items.");
        return;
    }

    let entries = catalog_entries(core);
    for (id, last_use) in recents {
        let names = names_with_stable_id(entries, id);
        let name = if names.is_empty() {
            "(not in catalog)".to_string()
        } else {
            names.join(", ")
        };
        let when = i64::try_from(last_use)
            .ok()
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|t| {
                t.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| last_use.to_string());
        println!("{when}  {name} ({id})");
    }
}

fn run_info(core: &mut QuickAccessCore, item: &str) -> Result<()> {
    let index = find_entry(core, item)?;
    if let Some(description) = core.apply_context_action(index, ContextAction::PrintInfo)? {
        println!("{description}");
    }

    let thumbnail = match core.thumbnail(index) {
        Some(Thumbnail::Provided(path) | Thumbnail::Bundled(path)) => path.display().to_string(),
        Some(Thumbnail::SoundEffect) => "sound effect placeholder".to_string(),
        Some(Thumbnail::Missing) | None => "none".to_string(),
    };
    println!("Thumbnail: {thumbnail}");
    Ok(())
}

fn run_stats(core: &QuickAccessCore, json: bool) -> Result<()> {
    let catalog = core.catalog().context("Catalog is not loaded")?;
    let stats = catalog.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Items: {}", stats.entry_count);
    println!("Groups: {}", stats.group_count);
    println!(
        "Mods: {} ({} items)",
        stats.package_count, stats.package_entry_count
    );
    println!("Sound effects: {}", stats.sound_effect_count);
    println!("Favorites: {}", core.favorites().len());
    println!("Hidden: {}", core.hidden().len());
    println!("Recents: {}", core.recents().len());
    Ok(())
}

fn run_thumbs_plan(core: &QuickAccessCore, json: bool) -> Result<()> {
    let plan = core
        .thumbnail_plan()
        .context("Failed to plan thumbnails")?;

    if json {
        let value = serde_json::json!({
            "outputDirectory": core.thumbnail_dir(),
            "pending": plan.pending.iter().map(|e| e.stable_cache_id()).collect::<Vec<_>>(),
            "skipped": plan.skipped,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Output: {}", core.thumbnail_dir().display());
    println!("To generate: {}", plan.pending.len());
    println!(
        "Skipped: {} existing, {} bundled, {} sound effects",
        plan.skipped.skipped_existing,
        plan.skipped.skipped_custom,
        plan.skipped.skipped_sound_effects
    );
    for entry in &plan.pending {
        println!("  {:<24} {}", entry.stable_cache_id(), entry.full_name());
    }
    Ok(())
}

fn catalog_entries(core: &QuickAccessCore) -> &[CatalogEntry] {
    core.catalog()
        .map(qab_core::catalog::Catalog::entries)
        .unwrap_or_default()
}

/// Entries keyed the way curation sets store them: `(guid, stable id)`, with
/// an empty guid for base-game items. Two mods can share a stable id.
fn entries_by_curation_key(entries: &[CatalogEntry]) -> HashMap<(&str, &str), &CatalogEntry> {
    entries
        .iter()
        .map(|e| ((e.zipmod_guid().unwrap_or_default(), e.stable_cache_id()), e))
        .collect()
}

/// Full names of every entry whose stable id is `id`.
fn names_with_stable_id<'a>(entries: &'a [CatalogEntry], id: &str) -> Vec<&'a str> {
    entries
        .iter()
        .filter(|e| e.stable_cache_id() == id)
        .map(CatalogEntry::full_name)
        .collect()
}

/// Find an entry by stable id, `group/category/slot` or full name.
/// Names match case-insensitively, against both translated and original
/// names.
fn find_entry(core: &QuickAccessCore, item: &str) -> Result<usize> {
    let catalog = core.catalog().context("Catalog is not loaded")?;
    let entries = catalog.entries();

    if let Some(index) = entries.iter().position(|e| e.stable_cache_id() == item) {
        return Ok(index);
    }
    if let Some(index) = parse_coordinate(item).and_then(|c| catalog.index_of(c)) {
        return Ok(index);
    }

    let matches: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| {
            e.full_name().eq_ignore_ascii_case(item)
                || e.original_full_name().eq_ignore_ascii_case(item)
                || e.item_name().eq_ignore_ascii_case(item)
        })
        .map(|(i, _)| i)
        .collect();

    match matches.as_slice() {
        [index] => Ok(*index),
        [] => bail!("No item matches '{item}'"),
        _ => bail!(
            "'{item}' matches {} items, use a stable id or full name",
            matches.len()
        ),
    }
}

fn parse_coordinate(text: &str) -> Option<qab_core::ItemCoordinate> {
    let mut parts = text.split('/').map(|p| p.trim().parse::<i32>());
    let group_no = parts.next()?.ok()?;
    let category_no = parts.next()?.ok()?;
    let slot = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(qab_core::ItemCoordinate::new(group_no, category_no, slot))
}
