//! Debounced save scheduling and crash-safe file writes shared by every
//! on-disk store.

use crate::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::trace;

/// Tracks whether a store has unsaved changes and when it may be written.
///
/// Every change restarts the quiet period, so a burst of changes produces a
/// single write once things settle.
#[derive(Debug, Clone)]
pub struct SaveScheduler {
    quiet_period_ms: u64,
    dirty: bool,
    /// Timestamp (ms) of the most recent change
    last_dirty_at: u64,
}

impl SaveScheduler {
    // Durations above u64::MAX ms are not meaningful quiet periods
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period_ms: quiet_period.as_millis() as u64,
            dirty: false,
            last_dirty_at: 0,
        }
    }

    /// Record a change made at `now` (ms).
    pub fn mark_dirty(&mut self, now: u64) {
        self.dirty = true;
        self.last_dirty_at = now;
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.dirty
    }

    /// True when a save is pending and the quiet period has elapsed.
    #[must_use]
    pub fn is_due(&self, now: u64) -> bool {
        self.dirty && now.saturating_sub(self.last_dirty_at) >= self.quiet_period_ms
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    #[must_use]
    pub fn last_dirty_at(&self) -> u64 {
        self.last_dirty_at
    }

    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}

/// Path of the temporary sibling used by [`write_atomic`].
fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write `bytes` to `path` through a temporary sibling file and a rename.
///
/// The previous file stays intact if the process dies mid-write.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the file
/// cannot be written or renamed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;

    trace!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_starts_clean() {
        let scheduler = SaveScheduler::new(Duration::from_secs(1));
        assert!(!scheduler.is_pending());
        assert!(!scheduler.is_due(u64::MAX));
    }

    #[test]
    fn test_scheduler_due_after_quiet_period() {
        let mut scheduler = SaveScheduler::new(Duration::from_millis(500));
        scheduler.mark_dirty(1_000);

        assert!(scheduler.is_pending());
        assert!(!scheduler.is_due(1_499), "Should wait for the quiet period");
        assert!(scheduler.is_due(1_500));
    }

    #[test]
    fn test_scheduler_change_restarts_quiet_period() {
        let mut scheduler = SaveScheduler::new(Duration::from_millis(500));
        scheduler.mark_dirty(1_000);
        scheduler.mark_dirty(1_400);

        assert!(!scheduler.is_due(1_500));
        assert!(scheduler.is_due(1_900));
        assert_eq!(scheduler.last_dirty_at(), 1_400);
    }

    #[test]
    fn test_scheduler_mark_saved_clears_pending() {
        let mut scheduler = SaveScheduler::new(Duration::ZERO);
        scheduler.mark_dirty(10);
        assert!(scheduler.is_due(10));

        scheduler.mark_saved();
        assert!(!scheduler.is_pending());
        assert!(!scheduler.is_due(10_000));
    }

    #[test]
    fn test_scheduler_clock_going_backwards_is_not_due() {
        let mut scheduler = SaveScheduler::new(Duration::from_millis(100));
        scheduler.mark_dirty(5_000);
        assert!(!scheduler.is_due(4_000));
    }

    #[test]
    fn test_write_atomic_creates_parent_and_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("store.json");

        write_atomic(&path, b"{}").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert!(!temp_path(&path).exists(), "Temp file should be renamed away");
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("favorites.tsv");
        std::fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_temp_path_appends_suffix() {
        let path = Path::new("/cache/recents.json");
        assert_eq!(temp_path(path), PathBuf::from("/cache/recents.json.tmp"));
    }
}
