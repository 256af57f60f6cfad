//! Embedded-payload extraction. The library preloads its first page of
//! results as a GraphQL-style payload inside inline `<script>` tags; when
//! present, that payload is far more reliable than any DOM heuristic.
//!
//! The payload is located by scanning script text for a marker key,
//! backing up to the enclosing `{`, and slicing out a balanced-brace
//! substring (string- and escape-aware — creative text loves braces).

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use super::ExtractContext;
use crate::core::types::{
    AdImage, AdRecord, AdVideo, DiscoveryMethod, ImageFormat, ImageShape, MediaAssets,
    AD_TEXT_MAX_CHARS,
};

/// Marker whose presence in a script says "results payload lives here".
pub const PAYLOAD_MARKER: &str = "\"__bbox\"";
/// Wrapper key holding the preloaded result.
pub const KEY_BBOX: &str = "__bbox";
/// Path from the wrapper to the edge list. Key names, not algorithm.
pub const EDGE_PATH: &[&str] = &[
    "result",
    "data",
    "ad_library_main",
    "search_results_connection",
    "edges",
];
const KEY_NODE: &str = "node";
const MAX_SEARCH_DEPTH: usize = 12;

/// Slice out one balanced JSON object starting at the `{` at byte offset
/// `open`. Braces inside string values (and escaped quotes inside those
/// strings) do not affect the depth count.
pub fn balanced_json_slice(text: &str, open: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find candidate payload objects in one script's text: each marker hit is
/// widened to the nearest enclosing `{` and sliced.
fn payload_slices(script: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(rel) = script[from..].find(PAYLOAD_MARKER) {
        let hit = from + rel;
        if let Some(open) = script[..hit].rfind('{') {
            if let Some(slice) = balanced_json_slice(script, open) {
                out.push(slice);
            }
        }
        from = hit + PAYLOAD_MARKER.len();
    }
    out
}

/// Walk the exact known path; on a miss, fall back to a bounded recursive
/// search for any array of `{"node": …}` objects.
fn find_edges(payload: &Value) -> Option<&Vec<Value>> {
    let root = payload.get(KEY_BBOX)?;
    let mut exact = Some(root);
    for key in EDGE_PATH {
        exact = exact.and_then(|v| v.get(key));
    }
    if let Some(Value::Array(edges)) = exact {
        return Some(edges);
    }
    // Shape drifted — search for the edge list structurally.
    fn search(v: &Value, depth: usize) -> Option<&Vec<Value>> {
        if depth > MAX_SEARCH_DEPTH {
            return None;
        }
        match v {
            Value::Array(items) => {
                let looks_like_edges = !items.is_empty()
                    && items.iter().all(|i| i.get(KEY_NODE).is_some());
                if looks_like_edges {
                    return Some(items);
                }
                items.iter().find_map(|i| search(i, depth + 1))
            }
            Value::Object(map) => map.values().find_map(|v| search(v, depth + 1)),
            _ => None,
        }
    }
    search(root, 0)
}

fn str_of<'a>(v: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| v.get(*k).and_then(Value::as_str))
}

/// Delivery timestamps arrive either as epoch seconds or as ISO dates.
fn parse_time(v: &Value) -> Option<DateTime<Utc>> {
    if let Some(secs) = v.as_i64() {
        return DateTime::from_timestamp(secs, 0);
    }
    let s = v.as_str()?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

fn delivery_days(node: &Value) -> Option<u32> {
    let start = ["start_date", "ad_delivery_start_time"]
        .iter()
        .find_map(|k| node.get(*k))
        .and_then(parse_time)?;
    let end = ["end_date", "ad_delivery_stop_time"]
        .iter()
        .find_map(|k| node.get(*k))
        .and_then(parse_time)
        .unwrap_or_else(Utc::now);
    let secs = (end - start).num_seconds();
    (secs >= 0).then(|| (secs / 86_400) as u32)
}

fn node_media(node: &Value) -> MediaAssets {
    let mut assets = MediaAssets::default();
    let snapshot = node.get("snapshot").unwrap_or(node);
    if let Some(images) = snapshot.get("images").and_then(Value::as_array) {
        for (position, img) in images.iter().enumerate() {
            let Some(url) = str_of(img, &["original_image_url", "resized_image_url"]) else {
                continue;
            };
            assets.images.push(AdImage {
                url: url.to_string(),
                alt: String::new(),
                width: 0,
                height: 0,
                aspect_ratio: None,
                is_high_res: false,
                position,
                shape: ImageShape::Standard,
                format: ImageFormat::from_url(url),
            });
        }
    }
    if let Some(videos) = snapshot.get("videos").and_then(Value::as_array) {
        for (position, vid) in videos.iter().enumerate() {
            let Some(url) = str_of(vid, &["video_hd_url", "video_sd_url"]) else {
                continue;
            };
            assets.videos.push(AdVideo {
                video_url: url.to_string(),
                thumbnail_url: str_of(vid, &["video_preview_image_url"])
                    .unwrap_or_default()
                    .to_string(),
                duration: None,
                width: 0,
                height: 0,
                position,
            });
        }
    }
    assets
}

/// Map one edge node to a record. `None` when the node fails the
/// acceptance floor (real advertiser name, substantial text).
fn map_edge(edge: &Value, index: usize, ctx: &ExtractContext) -> Option<AdRecord> {
    let node = edge.get(KEY_NODE)?;

    let advertiser = str_of(node, &["page_name", "page_id"])?.trim().to_string();
    if advertiser.is_empty() {
        return None;
    }

    let text = node
        .get("ad_creative_bodies")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    if text.chars().count() <= 30 {
        return None;
    }
    let ad_text: String = text.chars().take(AD_TEXT_MAX_CHARS).collect();

    let active_days = delivery_days(node);
    if let Some(days) = active_days {
        if days < ctx.min_active_days {
            return None;
        }
    }

    let snapshot = node.get("snapshot").unwrap_or(node);
    let landing = str_of(snapshot, &["link_url"])
        .filter(|u| super::fields::landing_url::is_external_url(u))
        .map(str::to_string);

    let library_id = str_of(node, &["ad_archive_id", "id"]).map(str::to_string);
    let (ad_id, fallback_id) = match &library_id {
        Some(id) => (id.clone(), false),
        None => (
            format!("discovered_{}_{}", ctx.scraped_at.timestamp_millis(), index),
            true,
        ),
    };

    Some(AdRecord {
        ad_id,
        fallback_id,
        library_id,
        advertiser_name: advertiser,
        ad_text,
        landing_page_url: landing.clone(),
        landing_page_strategy: landing.is_some().then_some("json_link_url".to_string()),
        cta_button_text: str_of(snapshot, &["cta_text"]).map(str::to_string),
        media_assets: node_media(node),
        active_days,
        discovery_method: DiscoveryMethod::JsonExtraction,
        search_term: ctx.search_term.clone(),
        competitor_name: ctx.competitor_name.clone(),
        scraped_at: ctx.scraped_at,
        match_score: None,
        engagement_matched: false,
        engagement_source: None,
        reactions_total: None,
        comments_total: None,
        shares_total: None,
        organic_post_url: None,
        validation: None,
    })
}

/// Scan every inline script for a results payload and map its edges.
/// `Ok(vec![])` means "no payload present" — the caller falls back to DOM.
pub fn extract(html: &str, ctx: &ExtractContext) -> Result<Vec<AdRecord>> {
    let doc = Html::parse_document(html);
    let script_sel =
        Selector::parse("script").ok().context("script selector")?;

    let mut ads = Vec::new();
    for script in doc.select(&script_sel) {
        let body: String = script.text().collect();
        if !body.contains(PAYLOAD_MARKER) {
            continue;
        }
        for slice in payload_slices(&body) {
            let Ok(payload) = serde_json::from_str::<Value>(slice) else {
                debug!("payload candidate failed to parse, skipping");
                continue;
            };
            let Some(edges) = find_edges(&payload) else {
                continue;
            };
            for (i, edge) in edges.iter().enumerate() {
                if ads.len() >= ctx.max_ads {
                    return Ok(ads);
                }
                if let Some(record) = map_edge(edge, i, ctx) {
                    ads.push(record);
                }
            }
        }
    }
    Ok(ads)
}
