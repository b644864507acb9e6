pub mod catalog;
pub mod config;
pub mod curation;
pub mod engine;
pub mod host;
pub mod persist;
pub mod thumbs;
pub mod translation;
pub mod view;
pub mod virtual_list;

// Exposed for benchmarks - not part of stable API
#[doc(hidden)]
pub mod search;

pub(crate) mod utils;

mod error;

#[cfg(test)]
mod tests;

pub use engine::{ClickOutcome, CoreMessage, QuickAccessCore};
pub use error::{Error, Result};

pub use qab_types::*;
