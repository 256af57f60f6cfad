//! Post-hoc validation of finished ad records. Rules only ever lower
//! confidence; a record starts at high and earns its way down.

use tracing::debug;

use crate::core::types::{AdRecord, Confidence, Validation};

// Warning labels (stable strings — dashboards group on them).
pub const WARN_LANDING_IS_PLATFORM: &str = "landing_page_points_to_fb_or_ig";
pub const WARN_LANDING_MALFORMED: &str = "invalid_landing_page_url_format";
pub const WARN_NO_LANDING: &str = "no_landing_page_url";
pub const WARN_NO_CTA: &str = "no_cta_button";
pub const WARN_SHORT_TEXT: &str = "short_or_missing_ad_text";
pub const WARN_NO_MEDIA: &str = "no_media_assets";
pub const WARN_LOW_MATCH_SCORE: &str = "low_match_score_for_engagement";

const MIN_TEXT_CHARS: usize = 20;
/// Matched engagement below this score is suspect.
const ENGAGEMENT_SCORE_FLOOR: f64 = 0.70;
/// More warnings than this and the record is rejected outright.
const MAX_WARNINGS: usize = 3;

/// Score one record. Warning severities:
/// * downgrade — platform-pointing landing page, malformed landing URL,
///   short text, sub-threshold matched engagement.
/// * advisory — missing landing URL, missing CTA, missing media.
/// Two or more warnings cap confidence at medium; more than three reject
/// the record.
pub fn validate_record(ad: &AdRecord) -> Validation {
    let mut warnings = Vec::new();
    let mut confidence = Confidence::High;

    match &ad.landing_page_url {
        Some(url) => {
            let lower = url.to_lowercase();
            if lower.contains("facebook.com") || lower.contains("instagram.com") {
                warnings.push(WARN_LANDING_IS_PLATFORM.to_string());
                confidence = confidence.capped_at(Confidence::Medium);
            } else if url::Url::parse(url).is_err() {
                warnings.push(WARN_LANDING_MALFORMED.to_string());
                confidence = Confidence::Low;
            }
        }
        None => warnings.push(WARN_NO_LANDING.to_string()),
    }

    if ad.cta_button_text.is_none() {
        warnings.push(WARN_NO_CTA.to_string());
    }

    if ad.ad_text.chars().count() < MIN_TEXT_CHARS {
        warnings.push(WARN_SHORT_TEXT.to_string());
        confidence = confidence.downgraded();
    }

    if ad.media_assets.is_empty() {
        warnings.push(WARN_NO_MEDIA.to_string());
    }

    if ad.engagement_matched {
        if let Some(score) = ad.match_score {
            if score < ENGAGEMENT_SCORE_FLOOR {
                warnings.push(WARN_LOW_MATCH_SCORE.to_string());
                confidence = confidence.downgraded();
            }
        }
    }

    let is_valid = warnings.len() <= MAX_WARNINGS;
    if !is_valid {
        confidence = Confidence::Low;
    } else if warnings.len() >= 2 {
        confidence = confidence.capped_at(Confidence::Medium);
    }

    if !warnings.is_empty() {
        debug!(ad_id = %ad.ad_id, warnings = warnings.len(), "record validated with warnings");
    }

    Validation {
        is_valid,
        warnings,
        confidence,
    }
}

/// Attach validation results to every record in place.
pub fn annotate(ads: &mut [AdRecord]) {
    for ad in ads.iter_mut() {
        ad.validation = Some(validate_record(ad));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{
        AdImage, DiscoveryMethod, ImageFormat, ImageShape, MediaAssets,
    };
    use chrono::Utc;

    fn base_ad() -> AdRecord {
        AdRecord {
            ad_id: "1234567890123".into(),
            fallback_id: false,
            library_id: Some("1234567890123".into()),
            advertiser_name: "Acme Tutoring".into(),
            ad_text: "Weekend coding classes for kids aged 7 to 15.".into(),
            landing_page_url: Some("https://acme.example/enroll".into()),
            landing_page_strategy: Some("direct_href".into()),
            cta_button_text: Some("Learn More".into()),
            media_assets: MediaAssets {
                images: vec![AdImage {
                    url: "https://scontent.xx.fbcdn.net/v/creative.jpg".into(),
                    alt: String::new(),
                    width: 600,
                    height: 600,
                    aspect_ratio: Some(1.0),
                    is_high_res: true,
                    position: 0,
                    shape: ImageShape::Square,
                    format: ImageFormat::Jpeg,
                }],
                videos: vec![],
                thumbnails: vec![],
            },
            active_days: Some(20),
            discovery_method: DiscoveryMethod::SearchTerm,
            search_term: "coding class".into(),
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

    #[test]
    fn clean_record_is_high_confidence() {
        let v = validate_record(&base_ad());
        assert!(v.is_valid);
        assert!(v.warnings.is_empty());
        assert_eq!(v.confidence, Confidence::High);
    }

    #[test]
    fn platform_landing_page_caps_at_medium() {
        let mut ad = base_ad();
        ad.landing_page_url = Some("https://www.facebook.com/acme".into());
        let v = validate_record(&ad);
        assert!(v.is_valid);
        assert_eq!(v.warnings, vec![WARN_LANDING_IS_PLATFORM.to_string()]);
        assert_eq!(v.confidence, Confidence::Medium);
    }

    #[test]
    fn low_match_score_downgrades_matched_engagement() {
        let mut ad = base_ad();
        ad.engagement_matched = true;
        ad.match_score = Some(0.66);
        let v = validate_record(&ad);
        assert_eq!(v.warnings, vec![WARN_LOW_MATCH_SCORE.to_string()]);
        assert_eq!(v.confidence, Confidence::Medium);
    }

    #[test]
    fn four_warnings_reject_the_record() {
        let mut ad = base_ad();
        ad.landing_page_url = None;
        ad.cta_button_text = None;
        ad.ad_text = "Too short".into();
        ad.media_assets = MediaAssets::default();
        let v = validate_record(&ad);
        assert_eq!(v.warnings.len(), 4);
        assert!(!v.is_valid);
        assert_eq!(v.confidence, Confidence::Low);
    }

    #[test]
    fn two_advisory_warnings_cap_at_medium() {
        let mut ad = base_ad();
        ad.landing_page_url = None;
        ad.cta_button_text = None;
        let v = validate_record(&ad);
        assert!(v.is_valid);
        assert_eq!(v.warnings.len(), 2);
        assert_eq!(v.confidence, Confidence::Medium);
    }
}
