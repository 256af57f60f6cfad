//! adscout — ad-transparency library scraper.
//!
//! Drives a headless browser over a social network's public ad library,
//! extracts advertisement creatives (embedded-JSON first, DOM heuristics
//! as fallback), optionally matches them against the advertiser's organic
//! posts to recover engagement numbers, and scores each finished record.

pub mod core;
pub mod discover;
pub mod extract;
pub mod matching;
pub mod scraping;
pub mod validate;

pub use crate::core::config::{load_scout_config, CompetitorTarget, ScoutConfig};
pub use crate::core::types::{
    AdRecord, DiagnosticsBundle, ExtractionResult, MediaAssets, OrganicPost, RunRecord,
    Validation,
};
pub use discover::{DatasetSink, JsonlSink, Target};
