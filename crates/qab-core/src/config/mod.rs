mod dirs;
mod settings;
mod validation;

pub use dirs::Directories;
pub use settings::{
    CatalogConfig, Config, GeneralConfig, ListConfig, MAX_RECENTS_COUNT, PersistenceConfig,
    ThumbnailConfig,
};
pub use validation::warn_unknown_fields;
