//! Media-asset extraction. Creative images must be separated from the sea
//! of profile pictures, emoji sprites, and UI icons the page also renders;
//! a URL denylist plus per-host dimension floors do that filtering.

use aho_corasick::AhoCorasick;
use scraper::{ElementRef, Selector};
use std::sync::OnceLock;

use crate::core::types::{AdImage, AdThumbnail, AdVideo, ImageFormat, ImageShape, MediaAssets};

/// URL substrings that mark an image as page furniture, not creative.
const URL_DENYLIST: &[&str] = &[
    "profile_pic",
    "favicon",
    "/images/emoji/",
    "spinner",
    "icon-",
    "_thumb",
    "_small",
    "avatar",
    "logo_",
    "button",
    "s60x60",
    "s100x100",
    "s130x130",
    "s148x148",
    "s200x200",
];

/// Platform-CDN markers. CDN-hosted creatives are often served scaled-down,
/// so they get a looser dimension floor than third-party images.
const CDN_MARKERS: &[&str] = &["fbcdn.net", "scontent"];

const CDN_DIM_FLOOR: u32 = 60;
const EXTERNAL_DIM_FLOOR: u32 = 200;
const HIGH_RES_FLOOR: u32 = 400;
const MIN_URL_LEN: usize = 50;

/// Lazy-loading attributes tried in order after plain `src`.
const IMG_SRC_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src", "data-original"];

fn denylist_matcher() -> &'static AhoCorasick {
    static AC: OnceLock<AhoCorasick> = OnceLock::new();
    AC.get_or_init(|| {
        AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(URL_DENYLIST)
            .expect("static denylist patterns")
    })
}

fn is_platform_cdn(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    CDN_MARKERS.iter().any(|m| lower.contains(m))
}

/// Accept or reject an image URL before dimensions are even considered.
fn plausible_creative_url(url: &str) -> bool {
    if url.starts_with("data:") {
        return false;
    }
    if url.len() <= MIN_URL_LEN {
        return false;
    }
    !denylist_matcher().is_match(url)
}

fn parse_dim(raw: Option<&str>) -> u32 {
    raw.map(|v| v.trim().trim_end_matches("px"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Dimension floor check. Unknown (zero) dimensions pass; known dimensions
/// must both clear the per-host floor.
fn passes_dim_floor(url: &str, width: u32, height: u32) -> bool {
    if width == 0 || height == 0 {
        return true;
    }
    let floor = if is_platform_cdn(url) { CDN_DIM_FLOOR } else { EXTERNAL_DIM_FLOOR };
    width >= floor && height >= floor
}

fn image_source(el: &ElementRef) -> Option<String> {
    for attr in IMG_SRC_ATTRS {
        if let Some(v) = el.value().attr(attr) {
            let v = v.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }
    // srcset: take the first entry's URL.
    let srcset = el.value().attr("srcset")?;
    srcset
        .split(',')
        .next()
        .and_then(|entry| entry.split_whitespace().next())
        .map(str::to_string)
}

fn collect_images(container: &ElementRef) -> Vec<AdImage> {
    let Ok(sel) = Selector::parse("img") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (position, el) in container.select(&sel).enumerate() {
        let Some(url) = image_source(&el) else {
            continue;
        };
        if !plausible_creative_url(&url) {
            continue;
        }
        let width = parse_dim(el.value().attr("width"));
        let height = parse_dim(el.value().attr("height"));
        if !passes_dim_floor(&url, width, height) {
            continue;
        }
        let aspect_ratio = (height > 0).then(|| width as f64 / height as f64);
        out.push(AdImage {
            alt: el.value().attr("alt").unwrap_or_default().to_string(),
            is_high_res: width >= HIGH_RES_FLOOR && height >= HIGH_RES_FLOOR,
            shape: ImageShape::from_dimensions(width, height),
            format: ImageFormat::from_url(&url),
            url,
            width,
            height,
            aspect_ratio,
            position,
        });
    }
    out
}

fn collect_videos(container: &ElementRef) -> (Vec<AdVideo>, Vec<AdThumbnail>) {
    let Ok(sel) = Selector::parse("video") else {
        return (Vec::new(), Vec::new());
    };
    let source_sel = Selector::parse("source[src]").ok();
    let mut videos = Vec::new();
    let mut thumbnails = Vec::new();
    for (position, el) in container.select(&sel).enumerate() {
        let src = el
            .value()
            .attr("src")
            .map(str::to_string)
            .or_else(|| {
                source_sel.as_ref().and_then(|s| {
                    el.select(s)
                        .filter_map(|c| c.value().attr("src"))
                        .next()
                        .map(str::to_string)
                })
            });
        let Some(video_url) = src else {
            continue;
        };
        let thumbnail_url = el.value().attr("poster").unwrap_or_default().to_string();
        if !thumbnail_url.is_empty() {
            thumbnails.push(AdThumbnail {
                url: thumbnail_url.clone(),
                linked_video: Some(video_url.clone()),
                position,
            });
        }
        videos.push(AdVideo {
            video_url,
            thumbnail_url,
            duration: el.value().attr("duration").and_then(|d| d.trim().parse().ok()),
            width: parse_dim(el.value().attr("width")),
            height: parse_dim(el.value().attr("height")),
            position,
        });
    }
    (videos, thumbnails)
}

/// Extract every creative media asset from a container.
pub fn extract(container: &ElementRef) -> MediaAssets {
    let images = collect_images(container);
    let (videos, thumbnails) = collect_videos(container);
    MediaAssets { images, videos, thumbnails }
}
