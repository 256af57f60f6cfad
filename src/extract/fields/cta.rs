//! CTA button-text extraction. Pass one looks for button-like elements
//! whose text contains a known action keyword (multilingual); pass two
//! falls back to the first button-like element with sane-length text.

use scraper::{ElementRef, Selector};

use super::squash_ws;

const CTA_SELECTORS: &[&str] = &[
    r#"a[role="button"]"#,
    r#"div[role="button"]"#,
    r#"span[role="button"]"#,
    "button",
    r#"[data-testid*="cta"]"#,
    r#"[data-testid*="button"]"#,
    r#"[aria-label*="Learn"]"#,
    r#"[aria-label*="Sign"]"#,
    r#"[aria-label*="Get"]"#,
];

/// Action keywords, English / Indonesian / Russian, lowercase.
const CTA_KEYWORDS: &[&str] = &[
    "learn", "sign", "get", "join", "start", "shop", "buy", "call", "apply",
    "register", "book", "subscribe", "trial", "demo", "download", "more",
    "now", "today", "free",
    // id
    "daftar", "gabung", "mulai", "lihat", "hubungi",
    // ru
    "узнать", "записаться", "подробнее", "заказать",
];

const MIN_CTA_LEN: usize = 2;
const MAX_CTA_LEN: usize = 80;

fn candidates<'a>(container: &'a ElementRef) -> Vec<String> {
    let mut out = Vec::new();
    for sel_str in CTA_SELECTORS {
        let Ok(sel) = Selector::parse(sel_str) else {
            continue;
        };
        for el in container.select(&sel) {
            let text = squash_ws(&el.text().collect::<String>());
            let len = text.chars().count();
            if len < MIN_CTA_LEN || len > MAX_CTA_LEN {
                continue;
            }
            // "See more" is the text-expander, not a CTA.
            if text.eq_ignore_ascii_case("see more") {
                continue;
            }
            out.push(text);
        }
    }
    out
}

pub fn extract(container: &ElementRef) -> Option<String> {
    let candidates = candidates(container);
    // Pass 1: keyword-bearing candidates.
    for c in &candidates {
        let lower = c.to_lowercase();
        if CTA_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return Some(c.clone());
        }
    }
    // Pass 2: first button-like text at all.
    candidates.into_iter().next()
}
