//! Test module for qab-core
//!
//! This module contains end-to-end tests for:
//! - Catalog loading, sorting and provenance
//! - Query matching and view filtering
//! - Curation and recents persistence
//! - Virtual list geometry over large result lists
//! - The interactive core: loading, translations, clicks and context actions
//! - Thumbnail batches driven through the core

// Test modules use exact float comparisons and test-specific casts
#![allow(clippy::float_cmp, clippy::cast_possible_truncation)]

mod curation_tests;
mod thumbnail_tests;
