//! Thumbnail lookup for list rows and the batch generator that renders them.

mod camera;
mod generator;

pub use camera::{Bounds, CameraFrame, SpawnedObject, Vec3};
pub use generator::{
    BatchReport, BatchState, FRONT_FACING_GROUPS, SkipReason, ThumbnailBatch, ThumbnailHost,
    ThumbnailPlan, plan,
};

use crate::catalog::CatalogEntry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use walkdir::WalkDir;

const PNG_EXTENSION: &str = "png";

/// Image shown for a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    /// Image supplied by a registered provider
    Provided(PathBuf),
    /// Image bundled with a package, matched by file stem
    Bundled(PathBuf),
    SoundEffect,
    Missing,
}

impl Thumbnail {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Thumbnail::Provided(path) | Thumbnail::Bundled(path) => Some(path),
            Thumbnail::SoundEffect | Thumbnail::Missing => None,
        }
    }
}

/// A source of thumbnails consulted before bundled images and placeholders.
pub trait ThumbnailProvider: Send {
    fn thumbnail(&self, entry: &CatalogEntry) -> Option<PathBuf>;
}

/// Serves generated thumbnails from a directory.
///
/// Files are named by stable id; legacy-named files from older versions are
/// still found.
#[derive(Debug, Clone)]
pub struct DirectoryThumbnails {
    dir: PathBuf,
}

impl DirectoryThumbnails {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ThumbnailProvider for DirectoryThumbnails {
    fn thumbnail(&self, entry: &CatalogEntry) -> Option<PathBuf> {
        [entry.stable_cache_id(), entry.legacy_cache_id()]
            .into_iter()
            .map(|id| thumbnail_path(&self.dir, id))
            .find(|path| path.is_file())
    }
}

/// `<dir>/<id>.png`
#[must_use]
pub fn thumbnail_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{id}.{PNG_EXTENSION}"))
}

/// Index of package-bundled PNGs by file stem.
///
/// When two files share a stem the one with the longer path wins, so a mod
/// can override a default by nesting its image deeper.
#[derive(Debug, Default, Clone)]
pub struct PngIndex {
    by_stem: HashMap<String, PathBuf>,
}

impl PngIndex {
    #[must_use]
    pub fn from_names<I, P>(names: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut index = Self::default();
        for name in names {
            index.insert(name.into());
        }
        index
    }

    /// Index every `.png` below `root`. Unreadable entries are skipped.
    #[must_use]
    pub fn scan(root: &Path) -> Self {
        let index = Self::from_names(
            WalkDir::new(root)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().is_file())
                .map(walkdir::DirEntry::into_path)
                .filter(|p| {
                    p.extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case(PNG_EXTENSION))
                }),
        );
        info!("Indexed {} thumbnails under {}", index.len(), root.display());
        index
    }

    fn insert(&mut self, path: PathBuf) {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            return;
        };
        let path_len = path.as_os_str().len();
        if let Some(existing) = self.by_stem.get(&stem)
            && existing.as_os_str().len() > path_len
        {
            return;
        }
        self.by_stem.insert(stem, path);
    }

    #[must_use]
    pub fn get(&self, stem: &str) -> Option<&Path> {
        self.by_stem.get(stem).map(PathBuf::as_path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_stem.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_stem.is_empty()
    }
}

/// Resolves and memoizes the thumbnail of each entry.
///
/// Memoized results are dropped on the next lookup after anyone holding the
/// [`ThumbnailResolver::stale_flag`] sets it.
#[derive(Default)]
pub struct ThumbnailResolver {
    providers: Vec<Box<dyn ThumbnailProvider>>,
    png_index: PngIndex,
    resolved: HashMap<String, Thumbnail>,
    stale: Arc<AtomicBool>,
}

impl ThumbnailResolver {
    #[must_use]
    pub fn new(png_index: PngIndex) -> Self {
        Self {
            providers: Vec::new(),
            png_index,
            resolved: HashMap::new(),
            stale: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that marks memoized results as outdated, e.g. once a batch has
    /// written new files.
    #[must_use]
    pub fn stale_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stale)
    }

    /// Add a provider to the end of the chain.
    ///
    /// Forgets memoized results so the new provider is consulted.
    pub fn register_provider(&mut self, provider: Box<dyn ThumbnailProvider>) {
        self.providers.push(provider);
        self.resolved.clear();
    }

    pub fn set_png_index(&mut self, png_index: PngIndex) {
        self.png_index = png_index;
        self.resolved.clear();
    }

    #[must_use]
    pub fn png_index(&self) -> &PngIndex {
        &self.png_index
    }

    /// Whether a bundled image exists for `entry`. Generated files don't count.
    #[must_use]
    pub fn has_custom(&self, entry: &CatalogEntry) -> bool {
        self.bundled(entry).is_some()
    }

    fn bundled(&self, entry: &CatalogEntry) -> Option<&Path> {
        self.png_index
            .get(entry.stable_cache_id())
            .or_else(|| self.png_index.get(entry.legacy_cache_id()))
    }

    pub fn resolve(&mut self, entry: &CatalogEntry) -> Thumbnail {
        if self.stale.swap(false, Ordering::AcqRel) {
            debug!("Dropping {} memoized thumbnails", self.resolved.len());
            self.resolved.clear();
        }
        if let Some(found) = self.resolved.get(entry.stable_cache_id()) {
            return found.clone();
        }

        let thumbnail = self.lookup(entry);
        debug!("Thumbnail for {}: {:?}", entry.stable_cache_id(), thumbnail);
        self.resolved
            .insert(entry.stable_cache_id().to_string(), thumbnail.clone());
        thumbnail
    }

    fn lookup(&self, entry: &CatalogEntry) -> Thumbnail {
        if let Some(path) = self.providers.iter().find_map(|p| p.thumbnail(entry)) {
            return Thumbnail::Provided(path);
        }
        if let Some(path) = self.bundled(entry) {
            return Thumbnail::Bundled(path.to_path_buf());
        }
        if entry.is_sound_effect() {
            Thumbnail::SoundEffect
        } else {
            Thumbnail::Missing
        }
    }

    /// Drop memoized results, e.g. after a batch wrote new files.
    pub fn invalidate(&mut self) {
        self.resolved.clear();
    }
}
