//! Per-target discovery: navigate to a target's library page, clear login
//! prompts, scroll the feed out, extract, optionally match engagement from
//! the advertiser's profile page, validate, and emit dataset records.
//!
//! One failing target never stops the run; it becomes a structured error
//! record and the loop moves on.

use anyhow::Result;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::config::{CompetitorTarget, ScoutConfig};
use crate::core::types::{
    AdRecord, DiscoveryErrorRecord, DiscoveryMethod, NoAdsRecord, RunRecord,
};
use crate::extract::{self, ExtractContext};
use crate::matching::{self, organic};
use crate::scraping::browser::ScoutBrowser;
use crate::scraping::page::{AdLibraryPage, LivePage};
use crate::scraping::scroll::{self, ScrollOptions};
use crate::validate;

const AD_LIBRARY_BASE: &str = "https://www.facebook.com/ads/library/";
/// Scroll budget for profile pages — posts load fast, the full ad budget
/// would be wasted there.
const PROFILE_SCROLL_ITERATIONS: usize = 5;
const MAX_ORGANIC_POSTS: usize = 50;

/// Body-text phrases that mean a login wall is covering the results.
const LOGIN_INDICATORS: &[&str] = &[
    "log in",
    "sign in",
    "login",
    "create account",
    "masuk",
    "daftar",
];

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("page capture failed: {0}")]
    Capture(#[from] anyhow::Error),
}

/// One unit of work: a keyword search or a competitor page.
#[derive(Debug, Clone)]
pub enum Target {
    SearchTerm(String),
    Competitor(CompetitorTarget),
}

impl Target {
    pub fn display_name(&self) -> &str {
        match self {
            Target::SearchTerm(term) => term,
            Target::Competitor(c) => &c.name,
        }
    }

    pub fn competitor_name(&self) -> Option<&str> {
        match self {
            Target::SearchTerm(_) => None,
            Target::Competitor(c) => Some(&c.name),
        }
    }

    /// The ad-library URL this target starts from.
    pub fn library_url(&self, country: &str) -> String {
        match self {
            Target::SearchTerm(term) => format!(
                "{AD_LIBRARY_BASE}?active_status=active&ad_type=all&country={}&q={}&media_type=all",
                utf8_percent_encode(country, NON_ALPHANUMERIC),
                utf8_percent_encode(term, NON_ALPHANUMERIC),
            ),
            Target::Competitor(c) => c.url.clone(),
        }
    }

    /// Label stamped onto DOM-extracted records for this target.
    pub fn discovery_method(&self) -> DiscoveryMethod {
        match self {
            Target::SearchTerm(_) => DiscoveryMethod::SearchTerm,
            Target::Competitor(_) => DiscoveryMethod::DirectUrl,
        }
    }

    /// Profile page to scrape organic posts from, when known.
    pub fn profile_page_url(&self) -> Option<String> {
        match self {
            Target::SearchTerm(_) => None,
            Target::Competitor(c) => Some(c.profile_page_url()),
        }
    }
}

/// Best-effort login-wall clearing: if the body text shows login wording,
/// press Escape and hide overlay dialogs, then let the page settle.
pub async fn clear_login_wall(page: &dyn AdLibraryPage, settle_ms: u64) {
    let Ok(html) = page.html().await else {
        return;
    };
    let lower = html.to_lowercase();
    if !LOGIN_INDICATORS.iter().any(|ind| lower.contains(ind)) {
        return;
    }
    info!("login wall detected — dismissing");
    if let Err(e) = page.press_escape().await {
        warn!("escape press failed: {}", e);
    }
    match page.dismiss_overlays().await {
        Ok(n) if n > 0 => info!("hid {} overlay element(s)", n),
        Ok(_) => {}
        Err(e) => warn!("overlay dismissal failed: {}", e),
    }
    page.settle(settle_ms).await;
}

/// Scroll the feed out and run the extraction ladder on the settled page.
pub async fn extract_from_page(
    page: &dyn AdLibraryPage,
    target: &Target,
    config: &ScoutConfig,
    cancel: &AtomicBool,
) -> Result<crate::core::types::ExtractionResult> {
    clear_login_wall(page, config.settle_ms).await;

    let outcome = scroll::drive(
        page,
        &ScrollOptions {
            max_iterations: config.max_scroll_iterations,
            settle_ms: config.settle_ms,
            ..Default::default()
        },
        cancel,
    )
    .await?;
    info!(
        iterations = outcome.iterations,
        ad_like = outcome.final_ad_like_count,
        early = outcome.stopped_early,
        "scroll finished"
    );

    let html = page.html().await?;
    let ctx = ExtractContext {
        search_term: target.display_name().to_string(),
        competitor_name: target.competitor_name().map(str::to_string),
        min_active_days: config.min_active_days,
        max_ads: config.max_ads_per_target,
        discovery_method: target.discovery_method(),
        scraped_at: chrono::Utc::now(),
        page_url: page.url().await,
        page_title: page.title().await.unwrap_or_default(),
    };
    Ok(extract::extract_ads(&html, &ctx))
}

/// Visit the advertiser's profile page and match ads against its organic
/// posts. Failures set the appropriate `engagement_source` rather than
/// erroring the target.
async fn match_engagement(
    browser: &ScoutBrowser,
    target: &Target,
    ads: &mut [AdRecord],
    config: &ScoutConfig,
    cancel: &AtomicBool,
) {
    let Some(profile_url) = target.profile_page_url() else {
        set_engagement_source(ads, matching::SOURCE_NOT_ATTEMPTED);
        return;
    };

    info!(url = %profile_url, "scraping profile page for organic posts");
    let posts = match scrape_profile(browser, &profile_url, config, cancel).await {
        Ok(posts) => posts,
        Err(e) => {
            warn!(url = %profile_url, error = %e, "profile scrape failed");
            set_engagement_source(ads, matching::SOURCE_ERROR);
            return;
        }
    };

    if posts.is_empty() {
        set_engagement_source(ads, matching::SOURCE_PAGE_NOT_ACCESSIBLE);
        return;
    }

    matching::match_ads_to_posts(ads, &posts, chrono::Utc::now(), cancel);
}

async fn scrape_profile(
    browser: &ScoutBrowser,
    url: &str,
    config: &ScoutConfig,
    cancel: &AtomicBool,
) -> Result<Vec<crate::core::types::OrganicPost>> {
    let tab = browser.open(url).await?;
    let page = LivePage::new(tab);
    page.settle(config.settle_ms).await;
    clear_login_wall(&page, config.settle_ms).await;

    scroll::drive(
        &page,
        &ScrollOptions {
            max_iterations: PROFILE_SCROLL_ITERATIONS,
            settle_ms: config.settle_ms,
            ..Default::default()
        },
        cancel,
    )
    .await?;

    let html = page.html().await?;
    Ok(organic::extract_posts(&html, MAX_ORGANIC_POSTS, chrono::Utc::now()))
}

fn set_engagement_source(ads: &mut [AdRecord], source: &str) {
    for ad in ads.iter_mut() {
        ad.engagement_source = Some(source.to_string());
    }
}

/// Process one target end to end, returning its dataset rows.
pub async fn process_target(
    browser: &ScoutBrowser,
    target: &Target,
    config: &ScoutConfig,
    cancel: &AtomicBool,
) -> Vec<RunRecord> {
    let url = target.library_url(&config.country);
    info!(target = %target.display_name(), url = %url, "processing target");

    let result = async {
        let tab = browser
            .open(&url)
            .await
            .map_err(|source| DiscoveryError::Navigation { url: url.clone(), source })?;
        let page = LivePage::new(tab);
        page.settle(config.settle_ms).await;

        let extraction = extract_from_page(&page, target, config, cancel).await?;
        Ok::<_, DiscoveryError>(extraction)
    }
    .await;

    let mut extraction = match result {
        Ok(extraction) => extraction,
        Err(e) => {
            warn!(target = %target.display_name(), error = %e, "target failed");
            return vec![RunRecord::Error(DiscoveryErrorRecord::new(
                target.display_name(),
                target.competitor_name(),
                &e.to_string(),
            ))];
        }
    };

    info!(
        method = extraction.method.as_str(),
        ads = extraction.ads.len(),
        containers = extraction.debug.total_containers,
        candidates = extraction.debug.candidate_containers,
        rejected = extraction.debug.total_rejections(),
        "extraction finished"
    );
    for (reason, count) in &extraction.debug.rejections {
        info!("  rejected {:>4} × {}", count, reason);
    }

    if extraction.ads.is_empty() {
        return vec![RunRecord::NoAds(NoAdsRecord::new(
            target.display_name(),
            target.competitor_name(),
            config.min_active_days,
        ))];
    }

    if config.enable_engagement_matching {
        match_engagement(browser, target, &mut extraction.ads, config, cancel).await;
    } else {
        set_engagement_source(&mut extraction.ads, matching::SOURCE_NOT_ATTEMPTED);
    }

    validate::annotate(&mut extraction.ads);
    extraction.ads.truncate(config.max_ads_per_target);

    extraction
        .ads
        .into_iter()
        .map(|ad| RunRecord::Ad(Box::new(ad)))
        .collect()
}

// ── Dataset sink ─────────────────────────────────────────────────────────────

/// Where finished records go. The scraper only knows this seam; what is
/// behind it (file, pipe, test buffer) is the caller's business.
pub trait DatasetSink {
    fn write(&mut self, record: &RunRecord) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

/// Append-only JSON-lines file sink.
pub struct JsonlSink {
    writer: BufWriter<std::fs::File>,
}

impl JsonlSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl DatasetSink for JsonlSink {
    fn write(&mut self, record: &RunRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_encodes_term_and_country() {
        let t = Target::SearchTerm("coding class jakarta".into());
        let url = t.library_url("ID");
        assert!(url.starts_with("https://www.facebook.com/ads/library/?"));
        assert!(url.contains("country=ID"));
        assert!(url.contains("q=coding%20class%20jakarta"));
        assert!(url.contains("active_status=active"));
    }

    #[test]
    fn competitor_target_uses_configured_url() {
        let t = Target::Competitor(CompetitorTarget {
            name: "Acme Tutoring".into(),
            url: "https://www.facebook.com/ads/library/?view_all_page_id=42".into(),
            page_url: None,
        });
        assert_eq!(
            t.library_url("ID"),
            "https://www.facebook.com/ads/library/?view_all_page_id=42"
        );
        assert_eq!(t.discovery_method(), DiscoveryMethod::DirectUrl);
        assert_eq!(
            t.profile_page_url().as_deref(),
            Some("https://www.facebook.com/AcmeTutoring")
        );
    }
}
