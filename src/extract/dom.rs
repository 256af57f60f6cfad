//! DOM-heuristics extraction. Container markup on the library page is
//! obfuscated and changes without notice, so nothing here trusts a single
//! selector: candidates come from a broad sweep, a cheap prefilter throws
//! out obvious chrome, and every rejection is counted by reason so a run's
//! diagnostics show exactly where a markup change started eating ads.

use aho_corasick::AhoCorasick;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::OnceLock;

use super::fields::{active_days, advertiser, cta, landing_url, library_id, media, text};
use super::ExtractContext;
use crate::core::types::{
    AdRecord, ContainerError, DiagnosticsBundle, ExtractionMethod, ExtractionResult,
    SampleExtraction, AD_TEXT_MAX_CHARS,
};

// Rejection-histogram keys.
const REJECT_NO_MEDIA_OR_TEXT: &str = "failed_prefilter";
const REJECT_NO_ADVERTISER: &str = "no_advertiser_name";
const REJECT_NO_TEXT: &str = "no_ad_text";
const REJECT_UI_ELEMENT: &str = "ui_element";
const REJECT_TOO_YOUNG: &str = "below_min_active_days";
const REJECT_DUPLICATE: &str = "duplicate_container";

const CANDIDATE_SELECTORS: &[&str] = &[
    r#"[data-testid*="ad"]"#,
    r#"[data-testid*="result"]"#,
    r#"[data-testid*="page"]"#,
    "div",
    "article",
    "section",
];

/// Phrases that mark a container as ad-flavored.
const SPONSORED_KEYWORDS: &[&str] = &["sponsored", "iklan", "started running"];

const SAMPLE_LIMIT: usize = 3;
const TEXT_PREVIEW_LEN: usize = 120;

fn sponsored_matcher() -> &'static AhoCorasick {
    static AC: OnceLock<AhoCorasick> = OnceLock::new();
    AC.get_or_init(|| {
        AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(SPONSORED_KEYWORDS)
            .expect("static keyword patterns")
    })
}

/// Cheap prefilter, run before any field extraction: a plausible ad
/// container has media AND substantial text AND at least one ad signal
/// (sponsored wording, a page badge, or a platform profile link).
fn plausible_ad_container(el: &ElementRef) -> bool {
    static SELS: OnceLock<Option<(Selector, Selector, Selector)>> = OnceLock::new();
    let Some((media_sel, page_sel, profile_sel)) = SELS.get_or_init(|| {
        Some((
            Selector::parse("img, video").ok()?,
            Selector::parse(r#"[data-testid*="page"]"#).ok()?,
            Selector::parse(r#"a[href*="facebook.com"]"#).ok()?,
        ))
    }) else {
        return false;
    };

    if el.select(media_sel).next().is_none() {
        return false;
    }
    let text: String = el.text().collect();
    if text.trim().chars().count() < 50 {
        return false;
    }
    sponsored_matcher().is_match(&text)
        || el.select(page_sel).next().is_some()
        || el.select(profile_sel).next().is_some()
}

/// Broad candidate sweep, deduplicated by node identity.
fn gather_candidates<'a>(doc: &'a Html) -> Vec<ElementRef<'a>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for sel_str in CANDIDATE_SELECTORS {
        let Ok(sel) = Selector::parse(sel_str) else {
            continue;
        };
        for el in doc.select(&sel) {
            if seen.insert(el.id()) {
                out.push(el);
            }
        }
    }
    out
}

struct ExtractedFields {
    advertiser: Option<String>,
    text: text::AdTextExtraction,
    library_id: Option<(String, &'static str)>,
    landing: landing_url::LandingPage,
    cta: Option<String>,
    media: crate::core::types::MediaAssets,
    active_days: Option<u32>,
}

fn extract_fields(doc: &Html, container: &ElementRef) -> ExtractedFields {
    let raw_text: String = container.text().collect();
    ExtractedFields {
        advertiser: advertiser::extract(container),
        text: text::extract(container),
        library_id: library_id::extract(doc, container),
        landing: landing_url::extract(container),
        cta: cta::extract(container),
        media: media::extract(container),
        active_days: active_days::extract(&raw_text),
    }
}

/// Classify a page's containers into ad records plus a rejection histogram.
/// Always succeeds: zero ads with a populated histogram is a valid outcome.
pub fn classify_page(html: &str, ctx: &ExtractContext) -> ExtractionResult {
    let doc = Html::parse_document(html);
    let mut debug = DiagnosticsBundle {
        page_url: ctx.page_url.clone(),
        page_title: ctx.page_title.clone(),
        ..Default::default()
    };

    let candidates = gather_candidates(&doc);
    debug.total_containers = candidates.len();

    let mut ads: Vec<AdRecord> = Vec::new();
    // Nested sweep selectors surface the same ad many times; content
    // fingerprints keep one record per creative.
    let mut seen_content: HashSet<String> = HashSet::new();

    for (index, container) in candidates.into_iter().enumerate() {
        if ads.len() >= ctx.max_ads {
            break;
        }
        if !plausible_ad_container(&container) {
            debug.count_rejection(REJECT_NO_MEDIA_OR_TEXT);
            continue;
        }
        debug.candidate_containers += 1;

        let fields = match catch_unwind(AssertUnwindSafe(|| extract_fields(&doc, &container))) {
            Ok(f) => f,
            Err(_) => {
                debug.errors.push(ContainerError {
                    index,
                    message: "field extraction panicked".to_string(),
                });
                continue;
            }
        };

        if fields.text.ui_rejected > 0 {
            *debug
                .rejections
                .entry(REJECT_UI_ELEMENT.to_string())
                .or_insert(0) += fields.text.ui_rejected;
        }

        let Some(advertiser_name) = fields.advertiser else {
            debug.count_rejection(REJECT_NO_ADVERTISER);
            continue;
        };
        let Some(ad_text) = fields.text.text else {
            debug.count_rejection(REJECT_NO_TEXT);
            continue;
        };

        if let Some(days) = fields.active_days {
            if days < ctx.min_active_days {
                debug.count_rejection(REJECT_TOO_YOUNG);
                continue;
            }
        }

        let fingerprint = format!(
            "{}|{}",
            advertiser_name,
            ad_text.chars().take(100).collect::<String>()
        );
        if !seen_content.insert(fingerprint) {
            debug.count_rejection(REJECT_DUPLICATE);
            continue;
        }

        let ad_text: String = ad_text.chars().take(AD_TEXT_MAX_CHARS).collect();
        let library_id = fields.library_id.as_ref().map(|(id, _)| id.clone());
        let (ad_id, fallback_id) = match &library_id {
            Some(id) => (id.clone(), false),
            None => (
                format!("discovered_{}_{}", ctx.scraped_at.timestamp_millis(), index),
                true,
            ),
        };

        if debug.samples.len() < SAMPLE_LIMIT {
            debug.samples.push(SampleExtraction {
                index,
                advertiser: advertiser_name.clone(),
                text_len: ad_text.chars().count(),
                text_preview: ad_text.chars().take(TEXT_PREVIEW_LEN).collect(),
                active_days: fields.active_days,
                images: fields.media.images.len(),
                videos: fields.media.videos.len(),
                landing_page_url: fields.landing.url.clone(),
                landing_page_strategy: fields.landing.strategy.map(str::to_string),
                cta_button: fields.cta.clone(),
            });
        }

        ads.push(AdRecord {
            ad_id,
            fallback_id,
            library_id,
            advertiser_name,
            ad_text,
            landing_page_url: fields.landing.url,
            landing_page_strategy: fields.landing.strategy.map(str::to_string),
            cta_button_text: fields.cta,
            media_assets: fields.media,
            active_days: fields.active_days,
            discovery_method: ctx.discovery_method,
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
        });
    }

    ExtractionResult {
        ads,
        method: ExtractionMethod::DomScraping,
        success: true,
        debug,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DiscoveryMethod;
    use chrono::Utc;

    fn ctx() -> ExtractContext {
        ExtractContext {
            search_term: "coding class".into(),
            competitor_name: None,
            min_active_days: 7,
            max_ads: 100,
            discovery_method: DiscoveryMethod::SearchTerm,
            scraped_at: Utc::now(),
            page_url: "https://www.facebook.com/ads/library/".into(),
            page_title: "Ad Library".into(),
        }
    }

    const AD_CARD: &str = r#"
        <article>
          <span data-testid="page_name">Acme Tutoring</span>
          <p>Sponsored · Started running 20 days ago</p>
          <p>Weekend coding classes for kids aged 7 to 15. Real projects from week one, taught live by working engineers.</p>
          <img src="https://scontent.xx.fbcdn.net/v/t39/417_creative_main_image_x.jpg" width="600" height="600">
          <a role="button" href="https://acme.example/enroll">Learn More</a>
        </article>"#;

    #[test]
    fn accepts_a_plausible_ad_card() {
        let html = format!("<html><body>{AD_CARD}</body></html>");
        let result = classify_page(&html, &ctx());
        assert_eq!(result.ads.len(), 1);
        let ad = &result.ads[0];
        assert_eq!(ad.advertiser_name, "Acme Tutoring");
        assert_eq!(ad.active_days, Some(20));
        assert!(ad.fallback_id);
        assert!(ad.ad_id.starts_with("discovered_"));
        assert_eq!(ad.cta_button_text.as_deref(), Some("Learn More"));
        assert_eq!(ad.landing_page_url.as_deref(), Some("https://acme.example/enroll"));
        assert!(result.success);
    }

    #[test]
    fn too_young_ads_are_counted_not_kept() {
        let card = AD_CARD.replace("20 days ago", "2 days ago");
        let html = format!("<html><body>{card}</body></html>");
        let result = classify_page(&html, &ctx());
        assert!(result.ads.is_empty());
        assert_eq!(result.debug.rejections.get(REJECT_TOO_YOUNG), Some(&1));
    }

    #[test]
    fn chrome_container_is_rejected_with_reason() {
        let html = r#"<html><body>
            <div data-testid="search_results_filter">
              <img src="https://static.example/assets/long-ui-chrome-illustration-banner.png" width="600" height="600">
              <span>Sponsored</span>
              <p>Filter ads by category, country and date to narrow your search results down quickly.</p>
            </div>
        </body></html>"#;
        let result = classify_page(html, &ctx());
        assert!(result.ads.is_empty());
        assert!(result.debug.total_rejections() > 0);
    }
}
