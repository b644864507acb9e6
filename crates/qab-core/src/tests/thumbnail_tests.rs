//! Tests for thumbnail batches driven through the core

use super::fixtures::*;
use crate::catalog::stable_cache_id;
use crate::host::SpawnError;
use crate::thumbs::{
    BatchState, Bounds, CameraFrame, PngIndex, SpawnedObject, Thumbnail, ThumbnailHost, Vec3,
    thumbnail_path,
};
use crate::Error;
use qab_types::ItemCoordinate;

/// Host that renders every item as a unit cube
#[derive(Default)]
struct CubeHost {
    spawned: Vec<ItemCoordinate>,
    in_scene: usize,
    restored: bool,
}

impl ThumbnailHost for CubeHost {
    fn supports_manual_adjust(&self) -> bool {
        false
    }

    fn prepare(&mut self, _dark_background: bool) -> anyhow::Result<()> {
        Ok(())
    }

    fn spawn(&mut self, coordinate: ItemCoordinate) -> Result<(), SpawnError> {
        self.spawned.push(coordinate);
        self.in_scene += 1;
        Ok(())
    }

    fn measure(&mut self) -> Option<SpawnedObject> {
        Some(SpawnedObject {
            bounds: Bounds {
                center: Vec3::ZERO,
                size: Vec3::new(1.0, 1.0, 1.0),
            },
            position: Vec3::ZERO,
            forward: Vec3::new(0.0, 0.0, 1.0),
            right: Vec3::new(1.0, 0.0, 0.0),
            up: Vec3::new(0.0, 1.0, 0.0),
        })
    }

    fn frame_camera(&mut self, _frame: &CameraFrame) {}

    fn set_camera_control(&mut self, _enabled: bool) {}

    fn confirm_pressed(&mut self) -> bool {
        true
    }

    fn cancel_requested(&mut self) -> bool {
        false
    }

    fn capture(&mut self, size: u32) -> anyhow::Result<Vec<u8>> {
        Ok(vec![0; size as usize])
    }

    fn clear_scene(&mut self) {
        self.in_scene = 0;
    }

    fn unload_unused_assets(&mut self) {}

    fn restore(&mut self) {
        self.restored = true;
    }
}

#[tokio::test]
async fn test_batch_fills_thumbnail_directory() {
    let (mut core, _dir) = loaded_core().await;
    let plan = core.thumbnail_plan().unwrap();
    assert_eq!(plan.pending.len(), 3);
    assert_eq!(plan.skipped.skipped_sound_effects, 1);

    let chair = core
        .catalog()
        .unwrap()
        .index_of(ItemCoordinate::new(0, 2, 20))
        .unwrap();
    assert_eq!(core.thumbnail(chair), Some(Thumbnail::Missing));

    let mut host = CubeHost::default();
    let mut batch = core.make_thumbnails(&host).unwrap();
    let report = batch.run(&mut host);

    assert_eq!(batch.state(), BatchState::Done);
    assert_eq!(report.written, 3);
    assert_eq!(host.spawned.len(), 3);
    assert_eq!(host.in_scene, 0);
    assert!(host.restored);

    let stable = core.entry(chair).unwrap().stable_cache_id().to_string();
    let expected = thumbnail_path(&core.thumbnail_dir(), &stable);
    assert_eq!(std::fs::read(&expected).unwrap().len(), 64);

    assert_eq!(core.thumbnail(chair), Some(Thumbnail::Provided(expected)));

    // Everything exists now
    assert!(core.thumbnail_plan().unwrap().pending.is_empty());
}

#[tokio::test]
async fn test_sound_effects_get_placeholder() {
    let (mut core, _dir) = loaded_core().await;
    let bell = core
        .catalog()
        .unwrap()
        .index_of(ItemCoordinate::new(11, 1, 30))
        .unwrap();
    assert_eq!(core.thumbnail(bell), Some(Thumbnail::SoundEffect));

    let ball = core
        .catalog()
        .unwrap()
        .index_of(ItemCoordinate::new(0, 1, 10))
        .unwrap();
    assert_eq!(core.thumbnail(ball), Some(Thumbnail::Missing));
}

#[tokio::test]
async fn test_bundled_thumbnails_are_not_regenerated() {
    let (mut core, _dir) = loaded_core().await;
    let ids: Vec<String> = core
        .catalog()
        .unwrap()
        .entries()
        .iter()
        .map(|e| format!("mods/{}.png", e.stable_cache_id()))
        .collect();
    core.thumbnails_mut().set_png_index(PngIndex::from_names(ids));

    let plan = core.thumbnail_plan().unwrap();
    assert!(plan.pending.is_empty());
    assert_eq!(plan.skipped.skipped_custom, 3);
}

#[tokio::test]
async fn test_bundled_directory_is_scanned_on_startup() {
    let dir = tempfile::TempDir::new().unwrap();
    let bundled = dir.path().join("bundled-thumbnails").join("mods").join("chair");
    std::fs::create_dir_all(&bundled).unwrap();
    let png = bundled.join(format!("{}.png", stable_cache_id(0, 2, 20)));
    std::fs::write(&png, b"png").unwrap();

    let mut core = make_core_in(&dir);
    core.start_loading(sample_source(), None).unwrap();
    core.wait_loaded().await.unwrap();
    assert_eq!(core.thumbnails().png_index().len(), 1);

    let chair = core
        .catalog()
        .unwrap()
        .index_of(ItemCoordinate::new(0, 2, 20))
        .unwrap();
    assert_eq!(core.thumbnail(chair), Some(Thumbnail::Bundled(png)));

    let plan = core.thumbnail_plan().unwrap();
    assert_eq!(plan.pending.len(), 2);
    assert_eq!(plan.skipped.skipped_custom, 1);
}

#[tokio::test]
async fn test_batch_needs_loaded_catalog() {
    let (core, _dir) = make_core();
    let host = CubeHost::default();
    assert!(matches!(core.make_thumbnails(&host), Err(Error::NotLoaded)));
}

#[tokio::test]
async fn test_manual_mode_needs_host_support() {
    let dir = tempfile::TempDir::new().unwrap();
    let dirs = crate::config::Directories::with_base(dir.path().to_path_buf());
    let mut config = test_config(4);
    config.thumbnails.manual_adjust = true;
    let mut core = crate::QuickAccessCore::with_config(dirs, config).unwrap();
    core.start_loading(sample_source(), None).unwrap();
    core.wait_loaded().await.unwrap();

    let host = CubeHost::default();
    assert!(matches!(
        core.make_thumbnails(&host),
        Err(Error::InvalidArgument(_))
    ));
}
