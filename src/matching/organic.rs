//! Organic-post extraction from an advertiser's public profile page.
//! Same philosophy as the ad-container classifier: selector-list first,
//! engagement-pattern sweep as fallback, and every field survives missing
//! markup.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

use crate::core::types::OrganicPost;

const POST_SELECTORS: &[&str] = &[
    r#"[role="article"]"#,
    r#"div[data-ad-preview]"#,
    r#"[data-testid*="post"]"#,
    r#"[data-testid*="story"]"#,
];

const TEXT_SELECTORS: &[&str] = &[
    r#"[data-ad-comet-preview="message"]"#,
    r#"[data-ad-preview="message"]"#,
    "p",
    "span",
];

const MIN_POST_TEXT: usize = 50;
const MAX_POST_TEXT: usize = 600;

fn engagement_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[\d.,]+\s*[KM]?\s*(reactions?|likes?|comments?|shares?|suka|komentar|dibagikan|нравится|комментар|поделил)")
            .expect("static regex")
    })
}

fn comments_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([\d.,]+\s*[KM]?)\s*(?:comments?|komentar|комментар)").expect("static regex")
    })
}

fn shares_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([\d.,]+\s*[KM]?)\s*(?:shares?|dibagikan|поделил)").expect("static regex")
    })
}

fn reactions_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([\d.,]+\s*[KM]?)\s*(?:reactions?|likes?|suka|нравится)").expect("static regex")
    })
}

fn relative_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d+)\s*(min|mins|minute|minutes|h|hr|hrs|hour|hours|d|day|days|w|wk|week|weeks)\b")
            .expect("static regex")
    })
}

/// `1.2K` → 1200, `3M` → 3000000, `1,2` (decimal comma) → 1.2 scaled.
pub fn parse_metric(raw: &str) -> Option<u64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    let (number_part, multiplier) = match cleaned.chars().last()? {
        'K' | 'k' => (&cleaned[..cleaned.len() - 1], 1_000.0),
        'M' | 'm' => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };
    let value: f64 = number_part.parse().ok()?;
    (value >= 0.0).then(|| (value * multiplier).round() as u64)
}

fn metric_from(text: &str, re: &Regex) -> u64 {
    re.captures(text)
        .and_then(|c| parse_metric(&c[1]))
        .unwrap_or(0)
}

/// Convert a relative timestamp ("5 hr", "2 d", "1 w") to an absolute one,
/// anchored at `now`. No pattern means "just now".
pub fn parse_relative_time(text: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(c) = relative_time_re().captures(text) else {
        return now;
    };
    let Ok(n) = c[1].parse::<i64>() else {
        return now;
    };
    let unit = c[2].to_ascii_lowercase();
    let delta = if unit.starts_with("min") {
        Duration::minutes(n)
    } else if unit.starts_with('h') {
        Duration::hours(n)
    } else if unit.starts_with('d') {
        Duration::days(n)
    } else {
        Duration::weeks(n)
    };
    now - delta
}

fn is_sponsored(container: &ElementRef, text: &str) -> bool {
    let lower = text.to_lowercase();
    if lower.contains("sponsored") || lower.contains("bersponsor") || lower.contains("реклама") {
        return true;
    }
    let Ok(sel) = Selector::parse("[data-ad-rendering-role]") else {
        return false;
    };
    container.select(&sel).next().is_some()
}

fn post_text(container: &ElementRef) -> Option<String> {
    let mut best: Option<String> = None;
    for sel_str in TEXT_SELECTORS {
        let Ok(sel) = Selector::parse(sel_str) else {
            continue;
        };
        for el in container.select(&sel) {
            let text = el
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if text.chars().count() <= MIN_POST_TEXT {
                continue;
            }
            if best.as_ref().map(|b| text.len() > b.len()).unwrap_or(true) {
                best = Some(text);
            }
        }
        if best.is_some() {
            break;
        }
    }
    best.map(|t| t.chars().take(MAX_POST_TEXT).collect())
}

fn post_images(container: &ElementRef) -> Vec<String> {
    let Ok(sel) = Selector::parse("img[src]") else {
        return Vec::new();
    };
    container
        .select(&sel)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| src.contains("scontent") && !src.contains("/emoji/"))
        .map(str::to_string)
        .collect()
}

fn post_url(container: &ElementRef) -> Option<String> {
    let sel = Selector::parse(
        r#"a[href*="/posts/"], a[href*="/photos/"], a[href*="/videos/"]"#,
    )
    .ok()?;
    container
        .select(&sel)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .next()
}

fn gather_containers<'a>(doc: &'a Html) -> Vec<ElementRef<'a>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for sel_str in POST_SELECTORS {
        let Ok(sel) = Selector::parse(sel_str) else {
            continue;
        };
        for el in doc.select(&sel) {
            if seen.insert(el.id()) {
                out.push(el);
            }
        }
    }
    if !out.is_empty() {
        return out;
    }
    // Fallback sweep: any div whose text carries engagement wording.
    let Ok(div_sel) = Selector::parse("div") else {
        return out;
    };
    for el in doc.select(&div_sel) {
        let text: String = el.text().collect();
        if engagement_re().is_match(&text) && seen.insert(el.id()) {
            out.push(el);
        }
    }
    out
}

/// Extract up to `max` organic posts from a profile page's HTML.
/// Relative timestamps are resolved against `now`.
pub fn extract_posts(html: &str, max: usize, now: DateTime<Utc>) -> Vec<OrganicPost> {
    let doc = Html::parse_document(html);
    let containers = gather_containers(&doc);
    debug!(containers = containers.len(), "profile page container sweep");

    let mut posts = Vec::new();
    let mut seen_text: HashSet<String> = HashSet::new();
    for container in containers {
        if posts.len() >= max {
            break;
        }
        let Some(text) = post_text(&container) else {
            continue;
        };
        let fingerprint: String = text.chars().take(100).collect();
        if !seen_text.insert(fingerprint) {
            continue;
        }

        let raw: String = container.text().collect();
        posts.push(OrganicPost {
            is_sponsored: is_sponsored(&container, &raw),
            post_url: post_url(&container).unwrap_or_default(),
            images: post_images(&container),
            reactions_total: metric_from(&raw, reactions_re()),
            comments_total: metric_from(&raw, comments_re()),
            shares_total: metric_from(&raw, shares_re()),
            posted_at: parse_relative_time(&raw, now),
            post_text: text,
        });
    }
    posts
}
