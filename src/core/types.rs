use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a record was discovered. JSON/DOM describe the extraction strategy;
/// direct-URL/search-term describe the target kind when the per-target
/// handler overrides the strategy label (legacy dataset consumers key on
/// all four values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    JsonExtraction,
    DomScraping,
    DirectUrl,
    SearchTerm,
}

/// Which extraction strategy produced a page's ads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    JsonExtraction,
    DomScraping,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::JsonExtraction => "json_extraction",
            ExtractionMethod::DomScraping => "dom_scraping",
        }
    }
}

/// Data-quality confidence for a finished record. Only ever moves
/// high → medium → low during validation, never back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// One tier down. Low stays low.
    pub fn downgraded(self) -> Self {
        match self {
            Confidence::High => Confidence::Medium,
            Confidence::Medium | Confidence::Low => Confidence::Low,
        }
    }

    /// Cap at `ceiling` (i.e. never report better than `ceiling`).
    pub fn capped_at(self, ceiling: Confidence) -> Self {
        match (self, ceiling) {
            (Confidence::High, Confidence::Medium) => Confidence::Medium,
            (Confidence::High, Confidence::Low) | (Confidence::Medium, Confidence::Low) => {
                Confidence::Low
            }
            (current, _) => current,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validation {
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub confidence: Confidence,
}

/// Categorical shape of an ad image, inferred from its dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageShape {
    Banner,
    Vertical,
    Square,
    Standard,
}

impl ImageShape {
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width as f64 > height as f64 * 1.5 {
            ImageShape::Banner
        } else if height as f64 > width as f64 * 1.5 {
            ImageShape::Vertical
        } else if width.abs_diff(height) < 50 {
            ImageShape::Square
        } else {
            ImageShape::Standard
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    #[serde(rename = "JPEG")]
    Jpeg,
    #[serde(rename = "PNG")]
    Png,
    #[serde(rename = "GIF")]
    Gif,
    #[serde(rename = "WebP")]
    WebP,
    Unknown,
}

impl ImageFormat {
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        if lower.contains(".jpg") || lower.contains("jpeg") {
            ImageFormat::Jpeg
        } else if lower.contains(".png") {
            ImageFormat::Png
        } else if lower.contains(".gif") {
            ImageFormat::Gif
        } else if lower.contains(".webp") {
            ImageFormat::WebP
        } else {
            ImageFormat::Unknown
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdImage {
    pub url: String,
    #[serde(default)]
    pub alt: String,
    pub width: u32,
    pub height: u32,
    /// `None` when the height is unknown (zero).
    pub aspect_ratio: Option<f64>,
    pub is_high_res: bool,
    /// Index of the element within the container (carousel position).
    pub position: usize,
    #[serde(rename = "type")]
    pub shape: ImageShape,
    pub format: ImageFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdVideo {
    pub video_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
    /// Seconds, when the markup exposes it.
    pub duration: Option<f64>,
    pub width: u32,
    pub height: u32,
    pub position: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdThumbnail {
    pub url: String,
    #[serde(default)]
    pub linked_video: Option<String>,
    pub position: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaAssets {
    pub images: Vec<AdImage>,
    pub videos: Vec<AdVideo>,
    pub thumbnails: Vec<AdThumbnail>,
}

impl MediaAssets {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.videos.is_empty()
    }

    /// Highest-resolution image URL per carousel position.
    pub fn best_image_urls(&self) -> Vec<String> {
        let mut by_position: BTreeMap<usize, &AdImage> = BTreeMap::new();
        for img in &self.images {
            let entry = by_position.entry(img.position).or_insert(img);
            let best_px = (entry.width as u64) * (entry.height as u64);
            let cur_px = (img.width as u64) * (img.height as u64);
            if cur_px > best_px {
                *entry = img;
            }
        }
        by_position.values().map(|i| i.url.clone()).collect()
    }
}

/// One discovered advertisement, normalized from either extraction path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdRecord {
    /// Provider-assigned library ID when available, else a synthesized
    /// `discovered_<ms>_<index>` value (see `fallback_id`).
    pub ad_id: String,
    /// Synthesized IDs are not stable across runs; downstream dedup must
    /// not key on them.
    pub fallback_id: bool,
    #[serde(default)]
    pub library_id: Option<String>,
    pub advertiser_name: String,
    /// Truncated to `AD_TEXT_MAX_CHARS`.
    pub ad_text: String,
    #[serde(default)]
    pub landing_page_url: Option<String>,
    /// Which fallback strategy resolved the landing URL (diagnostics).
    #[serde(default)]
    pub landing_page_strategy: Option<String>,
    #[serde(default)]
    pub cta_button_text: Option<String>,
    pub media_assets: MediaAssets,
    /// Estimated days the ad has run. `None` = unknown; never guessed.
    pub active_days: Option<u32>,
    pub discovery_method: DiscoveryMethod,
    pub search_term: String,
    #[serde(default)]
    pub competitor_name: Option<String>,
    pub scraped_at: DateTime<Utc>,

    // Engagement-matching outputs (populated only when matching runs).
    #[serde(default)]
    pub match_score: Option<f64>,
    #[serde(default)]
    pub engagement_matched: bool,
    #[serde(default)]
    pub engagement_source: Option<String>,
    #[serde(default)]
    pub reactions_total: Option<u64>,
    #[serde(default)]
    pub comments_total: Option<u64>,
    #[serde(default)]
    pub shares_total: Option<u64>,
    #[serde(default)]
    pub organic_post_url: Option<String>,

    #[serde(default)]
    pub validation: Option<Validation>,
}

/// Hard cap applied to stored ad text.
pub const AD_TEXT_MAX_CHARS: usize = 600;

/// A post scraped from an advertiser's public profile page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganicPost {
    pub post_text: String,
    pub post_url: String,
    pub images: Vec<String>,
    pub reactions_total: u64,
    pub comments_total: u64,
    pub shares_total: u64,
    /// Sponsored posts are ads, not organic signal; matching skips them.
    pub is_sponsored: bool,
    pub posted_at: DateTime<Utc>,
}

impl OrganicPost {
    pub fn has_engagement(&self) -> bool {
        self.reactions_total > 0 || self.comments_total > 0 || self.shares_total > 0
    }
}

/// Per-container extractor failure. One bad container never aborts the page.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerError {
    pub index: usize,
    pub message: String,
}

/// First-few-containers raw extraction snapshot, kept for run logs.
#[derive(Debug, Clone, Serialize)]
pub struct SampleExtraction {
    pub index: usize,
    pub advertiser: String,
    pub text_len: usize,
    pub text_preview: String,
    pub active_days: Option<u32>,
    pub images: usize,
    pub videos: usize,
    pub landing_page_url: Option<String>,
    pub landing_page_strategy: Option<String>,
    pub cta_button: Option<String>,
}

/// Observability payload returned by value from each extraction run.
/// Log-only: never part of the persisted dataset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosticsBundle {
    pub page_url: String,
    pub page_title: String,
    pub total_containers: usize,
    pub candidate_containers: usize,
    /// Rejection-reason histogram — essential tuning output, not cosmetics.
    pub rejections: BTreeMap<String, usize>,
    pub samples: Vec<SampleExtraction>,
    pub errors: Vec<ContainerError>,
}

impl DiagnosticsBundle {
    pub fn count_rejection(&mut self, reason: &str) {
        *self.rejections.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn total_rejections(&self) -> usize {
        self.rejections.values().sum()
    }
}

/// Uniform envelope returned by the extraction orchestrator regardless of
/// which strategy succeeded.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub ads: Vec<AdRecord>,
    pub method: ExtractionMethod,
    pub success: bool,
    pub debug: DiagnosticsBundle,
}

/// Emitted for a target that completed without discovering any ads.
#[derive(Debug, Clone, Serialize)]
pub struct NoAdsRecord {
    pub error: bool,
    pub search_term: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competitor_name: Option<String>,
    pub message: String,
    pub result_type: String,
    pub scraped_at: DateTime<Utc>,
}

impl NoAdsRecord {
    pub fn new(search_term: &str, competitor_name: Option<&str>, min_active_days: u32) -> Self {
        Self {
            error: false,
            search_term: search_term.to_string(),
            competitor_name: competitor_name.map(str::to_string),
            message: format!("No ads found (active >= {} days)", min_active_days),
            result_type: "no_ads_found".to_string(),
            scraped_at: Utc::now(),
        }
    }
}

/// Emitted for a target whose processing failed fatally. The run continues
/// with the next target.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryErrorRecord {
    pub error: bool,
    pub search_term: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competitor_name: Option<String>,
    pub error_message: String,
    pub error_type: String,
    pub scraped_at: DateTime<Utc>,
}

impl DiscoveryErrorRecord {
    pub fn new(search_term: &str, competitor_name: Option<&str>, message: &str) -> Self {
        Self {
            error: true,
            search_term: search_term.to_string(),
            competitor_name: competitor_name.map(str::to_string),
            error_message: message.to_string(),
            error_type: "discovery_error".to_string(),
            scraped_at: Utc::now(),
        }
    }
}

/// One dataset row. Every target produces at least one of these.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RunRecord {
    Ad(Box<AdRecord>),
    NoAds(NoAdsRecord),
    Error(DiscoveryErrorRecord),
}
