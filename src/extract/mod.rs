//! Extraction engine: JSON-first (embedded payloads in inline scripts),
//! DOM-heuristics fallback. Both strategies are pure functions over the
//! page's marshaled HTML so they stay unit-testable without a browser.

pub mod dom;
pub mod embedded_json;
pub mod fields;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::core::types::{DiagnosticsBundle, DiscoveryMethod, ExtractionMethod, ExtractionResult};

/// Everything both strategies need to know about the page being extracted.
#[derive(Debug, Clone)]
pub struct ExtractContext {
    pub search_term: String,
    pub competitor_name: Option<String>,
    pub min_active_days: u32,
    pub max_ads: usize,
    /// Label applied to DOM-path records (the JSON path always labels
    /// itself `json_extraction`).
    pub discovery_method: DiscoveryMethod,
    pub scraped_at: DateTime<Utc>,
    pub page_url: String,
    pub page_title: String,
}

/// Run the strategy ladder over a page's HTML:
/// embedded JSON first, DOM heuristics when that yields nothing.
///
/// The JSON strategy failing (malformed payload, unexpected shape) is an
/// expected condition, logged and absorbed; the DOM strategy always
/// produces a result, possibly with zero ads.
pub fn extract_ads(html: &str, ctx: &ExtractContext) -> ExtractionResult {
    match embedded_json::extract(html, ctx) {
        Ok(ads) if !ads.is_empty() => {
            info!(
                count = ads.len(),
                url = %ctx.page_url,
                "embedded JSON payload yielded ads"
            );
            let debug = DiagnosticsBundle {
                page_url: ctx.page_url.clone(),
                page_title: ctx.page_title.clone(),
                ..Default::default()
            };
            return ExtractionResult {
                ads,
                method: ExtractionMethod::JsonExtraction,
                success: true,
                debug,
            };
        }
        Ok(_) => {
            info!(url = %ctx.page_url, "no embedded JSON payload — falling back to DOM scan");
        }
        Err(e) => {
            warn!(url = %ctx.page_url, error = %e, "embedded JSON extraction failed — falling back to DOM scan");
        }
    }
    dom::classify_page(html, ctx)
}
