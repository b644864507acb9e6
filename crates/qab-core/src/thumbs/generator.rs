//! Batch thumbnail generation.
//!
//! Each item is spawned alone, framed with an orthographic camera, captured
//! and removed again. The batch advances one step per [`ThumbnailBatch::tick`]
//! so the host's frame loop is never blocked for longer than one step.

use super::camera::{CameraFrame, SpawnedObject};
use super::{ThumbnailResolver, thumbnail_path};
use crate::catalog::CatalogEntry;
use crate::config::ThumbnailConfig;
use crate::host::SpawnError;
use crate::{Error, Result};
use qab_types::ItemCoordinate;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// Groups whose items read better shot straight from the front.
pub const FRONT_FACING_GROUPS: [i32; 4] = [0, 9, 10, 501];

/// Scene operations the generator needs from the host.
pub trait ThumbnailHost {
    /// Whether the user can adjust the camera before each capture.
    fn supports_manual_adjust(&self) -> bool;

    /// Switch to an orthographic capture setup with the chosen background.
    ///
    /// # Errors
    ///
    /// Returns an error if the capture setup could not be created.
    fn prepare(&mut self, dark_background: bool) -> anyhow::Result<()>;

    /// Add one item to the empty scene.
    ///
    /// # Errors
    ///
    /// Returns an error if the host could not add the item.
    fn spawn(&mut self, coordinate: ItemCoordinate) -> std::result::Result<(), SpawnError>;

    /// Bounds and orientation of what was spawned, `None` if nothing renders.
    fn measure(&mut self) -> Option<SpawnedObject>;

    fn frame_camera(&mut self, frame: &CameraFrame);

    fn set_camera_control(&mut self, enabled: bool);

    /// Polled while waiting for the user to accept a pose.
    fn confirm_pressed(&mut self) -> bool;

    /// Polled at every step.
    fn cancel_requested(&mut self) -> bool;

    /// Render a square PNG of the current view.
    ///
    /// # Errors
    ///
    /// Returns an error if the capture failed.
    fn capture(&mut self, size: u32) -> anyhow::Result<Vec<u8>>;

    fn clear_scene(&mut self);

    fn unload_unused_assets(&mut self);

    /// Undo [`ThumbnailHost::prepare`] and give the camera back to the user.
    fn restore(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Init,
    SpawnNext,
    WaitPose,
    Capture,
    Despawn,
    Done,
    Aborted,
}

impl BatchState {
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, BatchState::Done | BatchState::Aborted)
    }
}

/// Counters of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub written: usize,
    pub skipped_sound_effects: usize,
    pub skipped_existing: usize,
    pub skipped_custom: usize,
    pub no_renderers: usize,
    pub failed: usize,
}

/// Why an item gets no generated thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SoundEffect,
    Exists,
    Custom,
}

/// Items a batch over `entries` would render, and how many it would skip.
#[derive(Debug, Default)]
pub struct ThumbnailPlan<'a> {
    pub pending: Vec<&'a CatalogEntry>,
    pub skipped: BatchReport,
}

/// Work out what a batch would do without touching a scene.
#[must_use]
pub fn plan<'a>(
    entries: &'a [CatalogEntry],
    output_dir: &Path,
    resolver: &ThumbnailResolver,
) -> ThumbnailPlan<'a> {
    let mut plan = ThumbnailPlan::default();
    for entry in entries {
        match skip_reason(entry, output_dir, resolver.has_custom(entry)) {
            Some(reason) => plan.skipped.count_skip(reason),
            None => plan.pending.push(entry),
        }
    }
    plan
}

fn skip_reason(entry: &CatalogEntry, output_dir: &Path, has_custom: bool) -> Option<SkipReason> {
    if entry.is_sound_effect() {
        Some(SkipReason::SoundEffect)
    } else if output_exists(entry, output_dir) {
        Some(SkipReason::Exists)
    } else if has_custom {
        Some(SkipReason::Custom)
    } else {
        None
    }
}

fn output_exists(entry: &CatalogEntry, output_dir: &Path) -> bool {
    [entry.stable_cache_id(), entry.legacy_cache_id()]
        .into_iter()
        .any(|id| thumbnail_path(output_dir, id).exists())
}

impl BatchReport {
    fn count_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::SoundEffect => self.skipped_sound_effects += 1,
            SkipReason::Exists => self.skipped_existing += 1,
            SkipReason::Custom => self.skipped_custom += 1,
        }
    }
}

struct BatchItem {
    entry: CatalogEntry,
    has_custom: bool,
}

/// Resumable thumbnail batch, driven by [`ThumbnailBatch::tick`].
pub struct ThumbnailBatch {
    items: Vec<BatchItem>,
    output_dir: PathBuf,
    manual_adjust: bool,
    dark_background: bool,
    capture_size: u32,
    unload_every: usize,
    state: BatchState,
    next: usize,
    current: Option<usize>,
    pose_framed: bool,
    created: usize,
    report: BatchReport,
    cancelled: Arc<AtomicBool>,
    thumbnails_stale: Arc<AtomicBool>,
}

impl ThumbnailBatch {
    /// Validate the batch arguments. Nothing in the scene changes until the
    /// first tick.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty item list or manual
    /// mode on a host that can't support it, and [`Error::MissingDirectory`]
    /// if `output_dir` does not exist.
    pub fn new(
        entries: Vec<CatalogEntry>,
        output_dir: PathBuf,
        config: &ThumbnailConfig,
        resolver: &ThumbnailResolver,
        host: &dyn ThumbnailHost,
    ) -> Result<Self> {
        let checked = Self::check_preconditions(&entries, &output_dir, config, host);
        if let Err(e) = checked {
            error!(target: "qab::message", "Failed to make thumbs: {e}");
            return Err(e);
        }

        let items = entries
            .into_iter()
            .map(|entry| BatchItem {
                has_custom: resolver.has_custom(&entry),
                entry,
            })
            .collect();

        Ok(Self {
            items,
            output_dir,
            manual_adjust: config.manual_adjust,
            dark_background: config.dark_background,
            capture_size: config.capture_size,
            unload_every: config.unload_every,
            state: BatchState::Init,
            next: 0,
            current: None,
            pose_framed: false,
            created: 0,
            report: BatchReport::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
            thumbnails_stale: resolver.stale_flag(),
        })
    }

    fn check_preconditions(
        entries: &[CatalogEntry],
        output_dir: &Path,
        config: &ThumbnailConfig,
        host: &dyn ThumbnailHost,
    ) -> Result<()> {
        if config.manual_adjust && !host.supports_manual_adjust() {
            return Err(Error::InvalidArgument(
                "Manual mode needs a host with camera adjustment support".to_string(),
            ));
        }
        if entries.is_empty() {
            return Err(Error::InvalidArgument(
                "No items to make thumbnails of".to_string(),
            ));
        }
        if config.capture_size == 0 {
            return Err(Error::InvalidArgument(
                "Capture size must be positive".to_string(),
            ));
        }
        if !output_dir.is_dir() {
            return Err(Error::MissingDirectory(output_dir.to_path_buf()));
        }
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> BatchState {
        self.state
    }

    #[must_use]
    pub fn report(&self) -> BatchReport {
        self.report
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Stop at the next tick.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Flag that cancels the batch from another thread.
    #[must_use]
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Advance one step and return the new state.
    pub fn tick(&mut self, host: &mut dyn ThumbnailHost) -> BatchState {
        if self.state.is_finished() {
            return self.state;
        }
        if self.cancelled.load(Ordering::SeqCst) || host.cancel_requested() {
            info!(target: "qab::message", "Thumbnail generation cancelled");
            self.finish(host, BatchState::Aborted);
            return self.state;
        }

        self.state = match self.state {
            BatchState::Init => self.init(host),
            BatchState::SpawnNext => self.spawn_next(host),
            BatchState::WaitPose => self.wait_pose(host),
            BatchState::Capture => self.capture(host),
            BatchState::Despawn => self.despawn(host),
            BatchState::Done | BatchState::Aborted => self.state,
        };
        if self.state == BatchState::Done {
            self.finish(host, BatchState::Done);
        }
        self.state
    }

    /// Tick until the batch finishes. Manual mode waits on the host's
    /// confirm input, so this only returns once the user confirmed every pose.
    pub fn run(&mut self, host: &mut dyn ThumbnailHost) -> BatchReport {
        while !self.tick(host).is_finished() {}
        self.report
    }

    fn init(&mut self, host: &mut dyn ThumbnailHost) -> BatchState {
        host.clear_scene();
        match host.prepare(self.dark_background) {
            Ok(()) => BatchState::SpawnNext,
            Err(e) => {
                error!(target: "qab::message", "Failed to make thumbs: {e:#}");
                self.finish(host, BatchState::Aborted);
                BatchState::Aborted
            }
        }
    }

    fn spawn_next(&mut self, host: &mut dyn ThumbnailHost) -> BatchState {
        while let Some(item) = self.items.get(self.next) {
            let index = self.next;
            self.next += 1;

            if let Some(reason) = skip_reason(&item.entry, &self.output_dir, item.has_custom) {
                debug!("Skipping {} ({:?})", item.entry.full_name(), reason);
                self.report.count_skip(reason);
                continue;
            }

            self.current = Some(index);
            self.pose_framed = false;
            self.created += 1;
            return match host.spawn(item.entry.coordinate()) {
                Ok(()) => BatchState::WaitPose,
                Err(SpawnError::ModdedItemFault(reason)) => {
                    debug!(
                        "Ignoring modded item fault for {}: {}",
                        item.entry.full_name(),
                        reason
                    );
                    BatchState::WaitPose
                }
                Err(e) => {
                    warn!("Failed to spawn {}: {}", item.entry.full_name(), e);
                    self.report.failed += 1;
                    BatchState::Despawn
                }
            };
        }
        BatchState::Done
    }

    fn wait_pose(&mut self, host: &mut dyn ThumbnailHost) -> BatchState {
        let Some(item) = self.current.and_then(|i| self.items.get(i)) else {
            return BatchState::Despawn;
        };

        if !self.pose_framed {
            let Some(object) = host.measure() else {
                info!(
                    "No renderers to take capture of - {}",
                    item.entry.full_name()
                );
                self.report.no_renderers += 1;
                return BatchState::Despawn;
            };

            let frame = if FRONT_FACING_GROUPS.contains(&item.entry.coordinate().group_no) {
                CameraFrame::front(&object)
            } else {
                CameraFrame::isometric(&object)
            };
            host.frame_camera(&frame);
            self.pose_framed = true;

            if !self.manual_adjust {
                return BatchState::Capture;
            }
            host.set_camera_control(true);
            return BatchState::WaitPose;
        }

        if host.confirm_pressed() {
            host.set_camera_control(false);
            BatchState::Capture
        } else {
            BatchState::WaitPose
        }
    }

    fn capture(&mut self, host: &mut dyn ThumbnailHost) -> BatchState {
        let Some(item) = self.current.and_then(|i| self.items.get(i)) else {
            return BatchState::Despawn;
        };
        let path = thumbnail_path(&self.output_dir, item.entry.stable_cache_id());

        let written = host
            .capture(self.capture_size)
            .map_err(|e| Error::Thumbnail(format!("{e:#}")))
            .and_then(|bytes| write_new(&path, &bytes));
        match written {
            Ok(true) => {
                debug!("Wrote {}", path.display());
                self.report.written += 1;
            }
            Ok(false) => self.report.skipped_existing += 1,
            Err(e) => {
                warn!(
                    "Failed to capture thumbnail of {}: {}",
                    item.entry.full_name(),
                    e
                );
                self.report.failed += 1;
            }
        }
        BatchState::Despawn
    }

    fn despawn(&mut self, host: &mut dyn ThumbnailHost) -> BatchState {
        host.clear_scene();
        self.current = None;
        if self.unload_every > 0 && self.created % self.unload_every == 0 {
            host.unload_unused_assets();
        }
        BatchState::SpawnNext
    }

    fn finish(&mut self, host: &mut dyn ThumbnailHost, state: BatchState) {
        host.restore();
        host.clear_scene();
        self.current = None;
        self.state = state;
        if self.report.written > 0 {
            self.thumbnails_stale.store(true, Ordering::Release);
        }
        info!(
            target: "qab::message",
            "Finished taking thumbnails! ({} written, {} failed)",
            self.report.written,
            self.report.failed
        );
    }
}

/// Write `bytes` to `path` unless the file already exists.
fn write_new(path: &Path, bytes: &[u8]) -> Result<bool> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(bytes)?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}
