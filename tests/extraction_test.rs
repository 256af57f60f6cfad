//! End-to-end extraction over a synthetic results page: three plausible ad
//! cards mixed with library chrome. The classifier must keep exactly the
//! ads and explain every rejection by name.

use chrono::Utc;

use adscout::core::types::{DiscoveryMethod, ExtractionMethod};
use adscout::extract::{extract_ads, ExtractContext};

fn ctx(min_active_days: u32) -> ExtractContext {
    ExtractContext {
        search_term: "coding class".into(),
        competitor_name: None,
        min_active_days,
        max_ads: 100,
        discovery_method: DiscoveryMethod::SearchTerm,
        scraped_at: Utc::now(),
        page_url: "https://www.facebook.com/ads/library/?q=coding+class".into(),
        page_title: "Ad Library".into(),
    }
}

fn results_page() -> String {
    let card = |name: &str, slug: &str, days_line: &str, body: &str, cta: &str| {
        format!(
            r#"<article>
                 <h3><a href="https://facebook.com/{slug}">{name}</a></h3>
                 <p>Sponsored · {days_line}</p>
                 <p>{body}</p>
                 <img src="https://scontent.xx.fbcdn.net/v/t39.35426-6/{slug}_creative_main.jpg" width="600" height="600">
                 <a role="button" href="https://{slug}.example/enroll">{cta}</a>
               </article>"#
        )
    };

    format!(
        r#"<html><body>
            {ad1}
            <div data-testid="country_selector">
              <span>Select country</span>
              <span>Afghanistan Albania Algeria Argentina Australia Austria Bangladesh</span>
            </div>
            {ad2}
            <div data-testid="results_toolbar">
              <img src="https://static.xx.fbcdn.net/rsrc.php/v3/toolbar_illustration_wide_banner.png" width="600" height="600">
              <a href="https://facebook.com/help">Meta Ad Library Help</a>
              <p>Filter ads by category, country and date to narrow your search results down quickly.</p>
            </div>
            {ad3}
        </body></html>"#,
        ad1 = card(
            "Acme Tutoring",
            "acmetutoring",
            "Started running 20 days ago",
            "Weekend coding classes for kids aged 7 to 15. Real projects from week one, taught live by working engineers.",
            "Learn More",
        ),
        ad2 = card(
            "Brightpath Academy",
            "brightpath",
            "Started running 30 days ago",
            "Small-group math coaching that turns exam anxiety into confidence. Book a free diagnostic session this week.",
            "Book Now",
        ),
        ad3 = card(
            "Lingua Kids",
            "linguakids",
            "Active advertisement",
            "Bilingual storytime and conversation practice for ages 4 to 10, led by native speakers every afternoon.",
            "Daftar Sekarang",
        ),
    )
}

#[test]
fn keeps_ads_and_explains_rejections() {
    let result = extract_ads(&results_page(), &ctx(7));

    assert!(result.success);
    assert_eq!(result.method, ExtractionMethod::DomScraping);
    assert_eq!(result.ads.len(), 3);

    let advertisers: Vec<&str> = result
        .ads
        .iter()
        .map(|a| a.advertiser_name.as_str())
        .collect();
    assert!(advertisers.contains(&"Acme Tutoring"));
    assert!(advertisers.contains(&"Brightpath Academy"));
    assert!(advertisers.contains(&"Lingua Kids"));

    // Five containers swept, four past the prefilter (three ads + toolbar).
    assert_eq!(result.debug.total_containers, 5);
    assert_eq!(result.debug.candidate_containers, 4);

    // Both chrome containers must be rejected for a reason, not silently
    // lost: the country picker has no media, the toolbar has no plausible
    // advertiser name.
    let rejections = &result.debug.rejections;
    assert_eq!(rejections.get("failed_prefilter"), Some(&1));
    assert_eq!(rejections.get("no_advertiser_name"), Some(&1));
    assert_eq!(
        rejections.get("failed_prefilter").unwrap_or(&0)
            + rejections.get("no_advertiser_name").unwrap_or(&0),
        2
    );
    // The toolbar's filter copy is additionally discarded as UI text.
    assert_eq!(rejections.get("ui_element"), Some(&1));
}

#[test]
fn field_level_outcomes_survive_the_pipeline() {
    let result = extract_ads(&results_page(), &ctx(7));
    let acme = result
        .ads
        .iter()
        .find(|a| a.advertiser_name == "Acme Tutoring")
        .expect("acme record present");

    assert_eq!(acme.active_days, Some(20));
    assert_eq!(acme.cta_button_text.as_deref(), Some("Learn More"));
    assert_eq!(
        acme.landing_page_url.as_deref(),
        Some("https://acmetutoring.example/enroll")
    );
    assert_eq!(acme.landing_page_strategy.as_deref(), Some("direct_href"));
    assert_eq!(acme.media_assets.images.len(), 1);
    assert!(acme.media_assets.images[0].is_high_res);
    // No library ID anywhere in the markup: synthesized, and flagged as such.
    assert!(acme.fallback_id);
    assert!(acme.ad_id.starts_with("discovered_"));

    // The no-date card keeps an unknown (never guessed) active_days.
    let lingua = result
        .ads
        .iter()
        .find(|a| a.advertiser_name == "Lingua Kids")
        .expect("lingua record present");
    assert_eq!(lingua.active_days, None);
}

#[test]
fn min_active_days_filters_known_values_only() {
    let result = extract_ads(&results_page(), &ctx(25));

    // 20-day ad dropped, 30-day ad kept, unknown-age ad kept.
    let advertisers: Vec<&str> = result
        .ads
        .iter()
        .map(|a| a.advertiser_name.as_str())
        .collect();
    assert!(!advertisers.contains(&"Acme Tutoring"));
    assert!(advertisers.contains(&"Brightpath Academy"));
    assert!(advertisers.contains(&"Lingua Kids"));
    assert!(
        result
            .debug
            .rejections
            .get("below_min_active_days")
            .copied()
            .unwrap_or(0)
            >= 1
    );
}

#[test]
fn samples_are_bounded_diagnostics() {
    let result = extract_ads(&results_page(), &ctx(7));
    assert!(!result.debug.samples.is_empty());
    assert!(result.debug.samples.len() <= 3);
    let sample = &result.debug.samples[0];
    assert!(sample.text_len > 30);
    assert!(!sample.advertiser.is_empty());
}
