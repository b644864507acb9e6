use crate::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Application directories following platform conventions
#[derive(Debug, Clone)]
pub struct Directories {
    /// Config directory (~/.config/qab)
    pub config: PathBuf,

    /// Data directory (~/.local/share/qab)
    pub data: PathBuf,

    /// Cache directory (~/.cache/qab)
    pub cache: PathBuf,

    /// Generated thumbnails (~/.cache/qab/thumbnails)
    pub thumbnails: PathBuf,

    /// Thumbnails shipped with mods, scanned by file stem
    /// (~/.local/share/qab/bundled-thumbnails)
    pub bundled_thumbnails: PathBuf,

    /// Config file path
    pub config_file: PathBuf,

    /// Translation cache keyed by legacy id
    pub translation_cache: PathBuf,

    pub favorites_file: PathBuf,

    pub hidden_file: PathBuf,

    pub recents_file: PathBuf,
}

impl Directories {
    /// Create a new `Directories` instance with the platform's standard paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the system's project directories cannot be determined.
    pub fn new() -> Result<Self> {
        let project = ProjectDirs::from("", "", "qab").ok_or_else(|| {
            Error::Config("Failed to determine project directories".to_string())
        })?;

        let config = project.config_dir().to_path_buf();
        let data = project.data_dir().to_path_buf();
        let cache = project.cache_dir().to_path_buf();

        Ok(Self {
            config_file: config.join("config.json"),
            translation_cache: cache.join("translation-cache.json"),
            favorites_file: cache.join("favorites.tsv"),
            hidden_file: cache.join("hidden.tsv"),
            recents_file: cache.join("recents.json"),
            thumbnails: cache.join("thumbnails"),
            bundled_thumbnails: data.join("bundled-thumbnails"),
            config,
            data,
            cache,
        })
    }

    /// Root every directory and file in `base`.
    #[must_use]
    pub fn with_base(base: PathBuf) -> Self {
        Self {
            config_file: base.join("config.json"),
            translation_cache: base.join("translation-cache.json"),
            favorites_file: base.join("favorites.tsv"),
            hidden_file: base.join("hidden.tsv"),
            recents_file: base.join("recents.json"),
            thumbnails: base.join("thumbnails"),
            bundled_thumbnails: base.join("bundled-thumbnails"),
            config: base.clone(),
            data: base.clone(),
            cache: base,
        }
    }

    /// Ensure all directories exist.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    pub fn ensure_exists(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config)?;
        std::fs::create_dir_all(&self.data)?;
        std::fs::create_dir_all(&self.cache)?;
        std::fs::create_dir_all(&self.thumbnails)?;
        Ok(())
    }
}
