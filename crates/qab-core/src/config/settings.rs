use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for `general.recentsCount`
pub const MAX_RECENTS_COUNT: usize = 200;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub list: ListConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub thumbnails: ThumbnailConfig,
}

impl Config {
    /// Load config from file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        super::validation::warn_unknown_fields(&content, "config.json");
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralConfig {
    /// How many recently spawned items to remember (0 disables recents)
    #[serde(default = "default_recents_count")]
    pub recents_count: usize,

    /// Include bundle paths, manifests and slot numbers in search strings
    #[serde(default)]
    pub search_developer_info: bool,
}

impl GeneralConfig {
    /// `recents_count` clamped to the supported range.
    #[must_use]
    pub fn effective_recents_count(&self) -> usize {
        self.recents_count.min(MAX_RECENTS_COUNT)
    }
}

fn default_recents_count() -> usize {
    20
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            recents_count: default_recents_count(),
            search_developer_info: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    /// Group numbers whose items are sound effects rather than visible objects
    #[serde(default = "default_sound_effect_groups")]
    pub sound_effect_groups: Vec<i32>,
}

fn default_sound_effect_groups() -> Vec<i32> {
    vec![11]
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            sound_effect_groups: default_sound_effect_groups(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConfig {
    #[serde(default = "default_row_height")]
    pub row_height: f64,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,
}

fn default_row_height() -> f64 {
    40.0
}
fn default_viewport_height() -> f64 {
    600.0
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            row_height: default_row_height(),
            viewport_height: default_viewport_height(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceConfig {
    /// Quiet period before the translation cache is written
    #[serde(default = "default_translation_save_delay")]
    pub translation_save_delay_secs: u64,

    /// Quiet period before favorites, hidden and recents are written
    #[serde(default = "default_curation_save_delay")]
    pub curation_save_delay_ms: u64,
}

fn default_translation_save_delay() -> u64 {
    60
}
fn default_curation_save_delay() -> u64 {
    1000
}

impl PersistenceConfig {
    #[must_use]
    pub fn translation_save_delay(&self) -> Duration {
        Duration::from_secs(self.translation_save_delay_secs)
    }

    #[must_use]
    pub fn curation_save_delay(&self) -> Duration {
        Duration::from_millis(self.curation_save_delay_ms)
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            translation_save_delay_secs: default_translation_save_delay(),
            curation_save_delay_ms: default_curation_save_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailConfig {
    /// Where generated thumbnails go; defaults to the cache thumbnails dir
    #[serde(default)]
    pub output_directory: Option<PathBuf>,

    /// Mod-supplied PNGs to index; defaults to the data bundled-thumbnails dir
    #[serde(default)]
    pub bundled_directory: Option<PathBuf>,

    /// Wait for the user to confirm each pose before capturing
    #[serde(default)]
    pub manual_adjust: bool,

    #[serde(default)]
    pub dark_background: bool,

    /// Edge length of the captured square image in pixels
    #[serde(default = "default_capture_size")]
    pub capture_size: u32,

    /// Unload unused assets after this many spawned items (0 never unloads)
    #[serde(default = "default_unload_every")]
    pub unload_every: usize,
}

fn default_capture_size() -> u32 {
    64
}
fn default_unload_every() -> usize {
    400
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            output_directory: None,
            bundled_directory: None,
            manual_adjust: false,
            dark_background: false,
            capture_size: default_capture_size(),
            unload_every: default_unload_every(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.general.recents_count, 20);
        assert!(!config.general.search_developer_info);
        assert_eq!(config.catalog.sound_effect_groups, vec![11]);
        assert!((config.list.row_height - 40.0).abs() < f64::EPSILON);
        assert!((config.list.viewport_height - 600.0).abs() < f64::EPSILON);
        assert_eq!(config.persistence.translation_save_delay_secs, 60);
        assert_eq!(config.persistence.curation_save_delay_ms, 1000);
        assert!(config.thumbnails.output_directory.is_none());
        assert!(config.thumbnails.bundled_directory.is_none());
        assert_eq!(config.thumbnails.capture_size, 64);
        assert_eq!(config.thumbnails.unload_every, 400);
    }

    #[test]
    fn test_config_load_nonexistent_returns_default() {
        let path = std::path::Path::new("/nonexistent/path/config.json");
        let config = Config::load(path).unwrap();
        assert_eq!(config.general.recents_count, 20);
    }

    #[test]
    fn test_config_load_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"general": {{"recentsCount": 5, "searchDeveloperInfo": true}}, "catalog": {{"soundEffectGroups": [9]}}}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.general.recents_count, 5);
        assert!(config.general.search_developer_info);
        assert_eq!(config.catalog.sound_effect_groups, vec![9]);
        assert_eq!(
            config.persistence.curation_save_delay_ms, 1000,
            "Missing sections should fall back to defaults"
        );
    }

    #[test]
    fn test_config_load_invalid_json_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_config_unknown_fields_are_tolerated() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"general": {{"recentCount": 3}}, "theme": {{}}}}"#).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.general.recents_count, 20);
    }

    #[test]
    fn test_effective_recents_count_is_clamped() {
        let general = GeneralConfig {
            recents_count: 5000,
            search_developer_info: false,
        };
        assert_eq!(general.effective_recents_count(), MAX_RECENTS_COUNT);
    }

    #[test]
    fn test_persistence_durations() {
        let persistence = PersistenceConfig::default();
        assert_eq!(persistence.translation_save_delay(), Duration::from_secs(60));
        assert_eq!(persistence.curation_save_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_config_save_and_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");

        let mut config = Config::default();
        config.thumbnails.manual_adjust = true;
        config.thumbnails.output_directory = Some(PathBuf::from("/tmp/thumbs"));
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert!(loaded.thumbnails.manual_adjust);
        assert_eq!(
            loaded.thumbnails.output_directory,
            Some(PathBuf::from("/tmp/thumbs"))
        );
    }
}
