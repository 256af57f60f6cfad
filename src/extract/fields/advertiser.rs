//! Advertiser-name extraction. The library UI surrounds each ad with page
//! chrome whose text looks name-like, so candidates are filtered against a
//! keyword denylist and length bounds before being accepted.

use aho_corasick::AhoCorasick;
use scraper::{ElementRef, Selector};
use std::sync::OnceLock;

use super::squash_ws;

/// Ordered candidate selectors, most specific first.
const NAME_SELECTORS: &[&str] = &[
    r#"[data-testid*="page_name"]"#,
    r#"[data-testid*="advertiser"]"#,
    r#"a[href*="facebook.com/"][role="link"]"#,
    "h3 a",
    "h2 a",
    "h4 a",
    r#"a[href*="facebook.com/"]:not([href*="ads"])"#,
];

/// Text that marks a candidate as UI chrome rather than a page name.
const CHROME_KEYWORDS: &[&str] = &["sponsored", "ad library", "meta", "facebook"];

fn chrome_matcher() -> &'static AhoCorasick {
    static AC: OnceLock<AhoCorasick> = OnceLock::new();
    AC.get_or_init(|| {
        AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(CHROME_KEYWORDS)
            .expect("static keyword patterns")
    })
}

/// Is this candidate a plausible advertiser name (not chrome, sane length)?
fn plausible_name(candidate: &str) -> bool {
    let len = candidate.chars().count();
    if len < 2 || len >= 100 {
        return false;
    }
    !chrome_matcher().is_match(candidate)
}

/// Extract the advertiser name from an ad container. `None` means no
/// plausible name was found; callers treat that as a rejection, never as
/// an empty string.
pub fn extract(container: &ElementRef) -> Option<String> {
    for sel_str in NAME_SELECTORS {
        let Ok(sel) = Selector::parse(sel_str) else {
            continue;
        };
        for el in container.select(&sel) {
            let text = squash_ws(&el.text().collect::<String>());
            if plausible_name(&text) {
                return Some(text);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first_div(html: &Html) -> ElementRef {
        let sel = Selector::parse("div").unwrap();
        html.select(&sel).next().unwrap()
    }

    #[test]
    fn picks_page_name_over_generic_links() {
        let doc = Html::parse_fragment(
            r#"<div>
                <a href="https://facebook.com/somepage">Generic Link Co</a>
                <span data-testid="page_name_badge">Acme Tutoring</span>
            </div>"#,
        );
        assert_eq!(extract(&first_div(&doc)).as_deref(), Some("Acme Tutoring"));
    }

    #[test]
    fn rejects_chrome_text() {
        let doc = Html::parse_fragment(
            r#"<div><span data-testid="page_name">Sponsored</span></div>"#,
        );
        assert_eq!(extract(&first_div(&doc)), None);
    }

    #[test]
    fn rejects_degenerate_lengths() {
        assert!(!plausible_name("x"));
        assert!(!plausible_name(&"a".repeat(100)));
        assert!(plausible_name("Acme"));
    }
}
