//! Ad ↔ organic-post matching. A matched post means the ad is a boosted
//! organic post and its public engagement numbers apply; no match at all
//! is the signature of a dark post (ad-only creative with no organic
//! counterpart).

pub mod organic;
pub mod similarity;

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use crate::core::types::{AdRecord, OrganicPost};

// Signal weights. Text dominates; the rest break ties.
pub const WEIGHT_TEXT: f64 = 0.50;
pub const WEIGHT_IMAGE: f64 = 0.25;
pub const WEIGHT_SEMANTIC: f64 = 0.15;
pub const WEIGHT_TIME: f64 = 0.10;

// Tier thresholds, inclusive lower bounds.
pub const THRESHOLD_MATCHED: f64 = 0.65;
pub const THRESHOLD_PARTIAL: f64 = 0.40;
pub const THRESHOLD_WEAK: f64 = 0.20;

// engagement_source labels.
pub const SOURCE_ORGANIC: &str = "organic_post";
pub const SOURCE_PARTIAL: &str = "partial_match_possible_dark_post";
pub const SOURCE_WEAK: &str = "weak_match_likely_dark_post";
pub const SOURCE_NONE: &str = "no_match_confirmed_dark_post";
pub const SOURCE_NOT_ATTEMPTED: &str = "not_attempted";
pub const SOURCE_PAGE_NOT_ACCESSIBLE: &str = "page_not_accessible";
pub const SOURCE_ERROR: &str = "error_during_matching";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Matched,
    Partial,
    Weak,
    None,
}

impl MatchTier {
    pub fn classify(score: f64) -> Self {
        if score >= THRESHOLD_MATCHED {
            MatchTier::Matched
        } else if score >= THRESHOLD_PARTIAL {
            MatchTier::Partial
        } else if score >= THRESHOLD_WEAK {
            MatchTier::Weak
        } else {
            MatchTier::None
        }
    }
}

/// Weighted combination of the four signals for one ad/post pair.
/// An ad with unknown active_days contributes zero on the time signal.
pub fn pair_score(ad: &AdRecord, post: &OrganicPost, now: DateTime<Utc>) -> f64 {
    let text = similarity::text_similarity(&ad.ad_text, &post.post_text);
    let image = similarity::image_similarity(&ad.media_assets.best_image_urls(), &post.images);
    let semantic = similarity::semantic_similarity(&ad.ad_text, &post.post_text);
    let time = match ad.active_days {
        Some(days) => {
            let ad_started = now - chrono::Duration::days(days as i64);
            let diff_hours = (post.posted_at - ad_started).num_minutes().abs() as f64 / 60.0;
            similarity::time_similarity(diff_hours)
        }
        None => 0.0,
    };
    text * WEIGHT_TEXT + image * WEIGHT_IMAGE + semantic * WEIGHT_SEMANTIC + time * WEIGHT_TIME
}

/// Match every ad against the post set, writing the match fields in place.
///
/// Tier semantics:
/// * Matched — engagement copied, `engagement_matched = true`.
/// * Partial — engagement copied as an estimate, `engagement_matched = false`.
/// * Weak / None — no engagement fields; the score and source label alone
///   record how close the nearest post came.
pub fn match_ads_to_posts(
    ads: &mut [AdRecord],
    posts: &[OrganicPost],
    now: DateTime<Utc>,
    cancel: &AtomicBool,
) {
    let candidates: Vec<&OrganicPost> = posts.iter().filter(|p| !p.is_sponsored).collect();

    let mut matched = 0usize;
    for ad in ads.iter_mut() {
        if cancel.load(Ordering::Relaxed) {
            info!("matching cancelled after {} ads", matched);
            break;
        }

        let best = candidates
            .iter()
            .map(|p| (pair_score(ad, p, now), *p))
            .max_by(|(a, _), (b, _)| a.total_cmp(b));

        let Some((score, post)) = best else {
            ad.match_score = Some(0.0);
            ad.engagement_matched = false;
            ad.engagement_source = Some(SOURCE_NONE.to_string());
            continue;
        };

        ad.match_score = Some(score);
        match MatchTier::classify(score) {
            MatchTier::Matched => {
                ad.engagement_matched = true;
                ad.engagement_source = Some(SOURCE_ORGANIC.to_string());
                ad.reactions_total = Some(post.reactions_total);
                ad.comments_total = Some(post.comments_total);
                ad.shares_total = Some(post.shares_total);
                ad.organic_post_url = Some(post.post_url.clone());
                matched += 1;
            }
            MatchTier::Partial => {
                ad.engagement_matched = false;
                ad.engagement_source = Some(SOURCE_PARTIAL.to_string());
                ad.reactions_total = Some(post.reactions_total);
                ad.comments_total = Some(post.comments_total);
                ad.shares_total = Some(post.shares_total);
                ad.organic_post_url = Some(post.post_url.clone());
            }
            MatchTier::Weak => {
                ad.engagement_matched = false;
                ad.engagement_source = Some(SOURCE_WEAK.to_string());
            }
            MatchTier::None => {
                ad.engagement_matched = false;
                ad.engagement_source = Some(SOURCE_NONE.to_string());
            }
        }
    }
    info!(
        total = ads.len(),
        matched, "engagement matching finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DiscoveryMethod, MediaAssets};

    fn ad(text: &str, days: Option<u32>) -> AdRecord {
        AdRecord {
            ad_id: "1".into(),
            fallback_id: false,
            library_id: Some("1".into()),
            advertiser_name: "Acme".into(),
            ad_text: text.into(),
            landing_page_url: None,
            landing_page_strategy: None,
            cta_button_text: None,
            media_assets: MediaAssets::default(),
            active_days: days,
            discovery_method: DiscoveryMethod::DomScraping,
            search_term: "q".into(),
            competitor_name: None,
            scraped_at: Utc::now(),
            match_score: None,
            engagement_matched: false,
            engagement_source: None,
            reactions_total: None,
            comments_total: None,
            shares_total: None,
            organic_post_url: None,
            validation: None,
        }
    }

    fn post(text: &str, reactions: u64, sponsored: bool) -> OrganicPost {
        OrganicPost {
            post_text: text.into(),
            post_url: "https://www.facebook.com/acme/posts/123".into(),
            images: vec![],
            reactions_total: reactions,
            comments_total: 5,
            shares_total: 2,
            is_sponsored: sponsored,
            posted_at: Utc::now(),
        }
    }

    #[test]
    fn tier_boundaries_are_inclusive() {
        assert_eq!(MatchTier::classify(0.65), MatchTier::Matched);
        assert_eq!(MatchTier::classify(0.649999), MatchTier::Partial);
        assert_eq!(MatchTier::classify(0.40), MatchTier::Partial);
        assert_eq!(MatchTier::classify(0.399999), MatchTier::Weak);
        assert_eq!(MatchTier::classify(0.20), MatchTier::Weak);
        assert_eq!(MatchTier::classify(0.199999), MatchTier::None);
    }

    #[test]
    fn identical_recent_text_yields_full_match() {
        let text = "Weekend coding classes for kids aged 7 to 15, first session free";
        let mut ads = vec![ad(text, Some(0))];
        let posts = vec![post(text, 120, false)];
        let cancel = AtomicBool::new(false);
        match_ads_to_posts(&mut ads, &posts, Utc::now(), &cancel);
        let a = &ads[0];
        assert!(a.engagement_matched);
        assert_eq!(a.engagement_source.as_deref(), Some(SOURCE_ORGANIC));
        assert_eq!(a.reactions_total, Some(120));
        assert!(a.match_score.unwrap() >= THRESHOLD_MATCHED);
    }

    #[test]
    fn unrelated_post_confirms_dark_post() {
        let mut ads = vec![ad(
            "Weekend coding classes for kids aged 7 to 15, first session free",
            Some(90),
        )];
        let posts = vec![post("Fresh sourdough bread delivered daily across town", 9, false)];
        let cancel = AtomicBool::new(false);
        match_ads_to_posts(&mut ads, &posts, Utc::now(), &cancel);
        let a = &ads[0];
        assert!(!a.engagement_matched);
        assert_eq!(a.engagement_source.as_deref(), Some(SOURCE_NONE));
        assert!(a.reactions_total.is_none());
    }

    #[test]
    fn sponsored_posts_are_skipped() {
        let text = "Weekend coding classes for kids aged 7 to 15, first session free";
        let mut ads = vec![ad(text, Some(0))];
        let posts = vec![post(text, 999, true)];
        let cancel = AtomicBool::new(false);
        match_ads_to_posts(&mut ads, &posts, Utc::now(), &cancel);
        let a = &ads[0];
        assert!(!a.engagement_matched);
        assert_eq!(a.engagement_source.as_deref(), Some(SOURCE_NONE));
        assert_eq!(a.match_score, Some(0.0));
    }

    #[test]
    fn unknown_active_days_zeroes_the_time_signal() {
        let text = "Weekend coding classes for kids aged 7 to 15, first session free";
        let with_days = pair_score(&ad(text, Some(0)), &post(text, 1, false), Utc::now());
        let without = pair_score(&ad(text, None), &post(text, 1, false), Utc::now());
        assert!((with_days - without - WEIGHT_TIME).abs() < 1e-6);
    }
}
