//! The seam to the host scene graph.

use crate::catalog::CatalogEntry;
use crate::{Error, Result};
use qab_types::ItemCoordinate;
use thiserror::Error as ThisError;
use tracing::{debug, info};

/// Where a spawned item is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnParent {
    /// Scene root
    Scene,
    /// The host's currently selected object
    Selection,
}

#[derive(ThisError, Debug)]
pub enum SpawnError {
    /// Known crash inside some modded items' setup after the item was added
    #[error("Modded item fault: {0}")]
    ModdedItemFault(String),

    #[error("Host error: {0}")]
    Host(#[from] anyhow::Error),
}

/// Host scene operations used when spawning from the list.
pub trait SceneHost {
    /// Add the item at `coordinate` to the scene.
    ///
    /// # Errors
    ///
    /// Returns an error if the host could not add the item.
    fn add_item(
        &mut self,
        coordinate: ItemCoordinate,
        parent: SpawnParent,
    ) -> std::result::Result<(), SpawnError>;
}

/// Spawn `entry` into the host scene.
///
/// A [`SpawnError::ModdedItemFault`] leaves the item in the scene and is not
/// reported as a failure.
///
/// # Errors
///
/// Returns [`Error::Spawn`] for any other host failure.
pub fn spawn_entry(
    host: &mut dyn SceneHost,
    entry: &CatalogEntry,
    parent: SpawnParent,
) -> Result<()> {
    match host.add_item(entry.coordinate(), parent) {
        Ok(()) => {
            info!("Spawned {} ({})", entry.full_name(), entry.coordinate());
            Ok(())
        }
        Err(SpawnError::ModdedItemFault(reason)) => {
            debug!(
                "Ignoring modded item fault for {} ({}): {}",
                entry.full_name(),
                entry.coordinate(),
                reason
            );
            Ok(())
        }
        Err(e) => Err(Error::Spawn(format!("{}: {e}", entry.full_name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qab_types::ItemLoadInfo;

    struct ScriptedHost {
        result: Option<SpawnError>,
        spawned: Vec<(ItemCoordinate, SpawnParent)>,
    }

    impl SceneHost for ScriptedHost {
        fn add_item(
            &mut self,
            coordinate: ItemCoordinate,
            parent: SpawnParent,
        ) -> std::result::Result<(), SpawnError> {
            self.spawned.push((coordinate, parent));
            match self.result.take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    fn entry() -> CatalogEntry {
        let info = ItemLoadInfo {
            name: "Lamp".to_string(),
            ..Default::default()
        };
        CatalogEntry::new(ItemCoordinate::new(1, 2, 3), "Lights", "Desk", &info, None)
    }

    #[test]
    fn test_spawn_passes_coordinate_and_parent() {
        let mut host = ScriptedHost {
            result: None,
            spawned: Vec::new(),
        };
        spawn_entry(&mut host, &entry(), SpawnParent::Selection).unwrap();
        assert_eq!(
            host.spawned,
            vec![(ItemCoordinate::new(1, 2, 3), SpawnParent::Selection)]
        );
    }

    #[test]
    fn test_modded_item_fault_is_swallowed() {
        let mut host = ScriptedHost {
            result: Some(SpawnError::ModdedItemFault("UpdateColor".to_string())),
            spawned: Vec::new(),
        };
        assert!(spawn_entry(&mut host, &entry(), SpawnParent::Scene).is_ok());
    }

    #[test]
    fn test_other_failures_propagate() {
        let mut host = ScriptedHost {
            result: Some(SpawnError::Host(anyhow::anyhow!("scene locked"))),
            spawned: Vec::new(),
        };
        let err = spawn_entry(&mut host, &entry(), SpawnParent::Scene).unwrap_err();
        assert!(matches!(err, Error::Spawn(_)));
        assert!(err.to_string().contains("Lights/Desk/Lamp"));
        assert!(err.to_string().contains("scene locked"));
    }

    #[test]
    fn test_spawn_error_display() {
        let err = SpawnError::ModdedItemFault("UpdateColor".to_string());
        assert_eq!(err.to_string(), "Modded item fault: UpdateColor");
        let err = SpawnError::from(anyhow::anyhow!("no scene"));
        assert_eq!(err.to_string(), "Host error: no scene");
    }
}
