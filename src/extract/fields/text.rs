//! Ad-creative text extraction. The hard part is not finding text — it is
//! refusing the library's own UI strings (filter bars, country pickers,
//! navigation) which frequently outscore the actual creative in length.

use aho_corasick::AhoCorasick;
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::OnceLock;

use super::squash_ws;

const TEXT_SELECTORS: &[&str] = &[
    r#"[data-testid*="text"]"#,
    r#"[data-testid*="body"]"#,
    "p",
    "span",
    "div",
];

/// Known UI phrases. Matched case-insensitively against the whole candidate.
const UI_PHRASES: &[&str] = &[
    "select country",
    "select ad category",
    "current location",
    "all ads",
    "issues, elections or politics",
    "alladsissues",
    "allafghanistan",
    "ad library",
    "show more ads",
    "see more ads",
    "filter ads",
    "sort by",
];

/// Country names whose concatenation marks the library's country dropdown.
const COUNTRY_TOKENS: &[&str] = &[
    "afghanistan", "albania", "algeria", "argentina", "australia", "austria",
    "bangladesh", "belgium", "brazil", "canada", "chile", "china", "colombia",
    "denmark", "egypt", "finland", "france", "germany", "greece", "india",
    "indonesia", "ireland", "italy", "japan", "kenya", "malaysia", "mexico",
    "netherlands", "nigeria", "norway", "pakistan", "philippines", "poland",
    "portugal", "russia", "singapore", "spain", "sweden", "switzerland",
    "thailand", "turkey", "ukraine", "united kingdom", "united states",
    "vietnam",
];

fn ui_matcher() -> &'static AhoCorasick {
    static AC: OnceLock<AhoCorasick> = OnceLock::new();
    AC.get_or_init(|| {
        AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(UI_PHRASES)
            .expect("static phrase patterns")
    })
}

fn country_matcher() -> &'static AhoCorasick {
    static AC: OnceLock<AhoCorasick> = OnceLock::new();
    AC.get_or_init(|| {
        AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(COUNTRY_TOKENS)
            .expect("static country tokens")
    })
}

fn caps_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Z]{10,}").expect("static regex"))
}

/// Classify a text candidate as library UI chrome.
///
/// Signals, any of which rejects the candidate:
/// - contains a known UI phrase
/// - long unbroken uppercase run (mashed-together filter labels)
/// - dense country-name list (>5 distinct country tokens within 500 chars)
/// - short text dominated by UI vocabulary
pub fn is_ui_chrome(text: &str) -> bool {
    if ui_matcher().is_match(text) {
        return true;
    }
    if caps_run_re().is_match(text) {
        return true;
    }
    let lower = text.to_ascii_lowercase();
    if lower.len() < 500 {
        let country_hits = country_matcher().find_iter(&lower).count();
        if country_hits > 5 {
            return true;
        }
    }
    if lower.len() < 80 {
        for kw in ["filter", "category", "country", "location", "library"] {
            if lower.contains(kw) {
                return true;
            }
        }
    }
    false
}

/// Outcome of text extraction: the chosen text (if any) plus how many
/// candidates were discarded as UI chrome, for the rejection histogram.
#[derive(Debug, Default)]
pub struct AdTextExtraction {
    pub text: Option<String>,
    pub ui_rejected: usize,
}

const MIN_TEXT_LEN: usize = 50;
const MAX_TEXT_LEN: usize = 5000;

/// Pick the longest plausible creative text inside a container.
pub fn extract(container: &ElementRef) -> AdTextExtraction {
    let mut out = AdTextExtraction::default();
    let mut best: Option<String> = None;

    for sel_str in TEXT_SELECTORS {
        let Ok(sel) = Selector::parse(sel_str) else {
            continue;
        };
        for el in container.select(&sel) {
            let text = squash_ws(&el.text().collect::<String>());
            let len = text.chars().count();
            if len < MIN_TEXT_LEN || len >= MAX_TEXT_LEN {
                continue;
            }
            if is_ui_chrome(&text) {
                out.ui_rejected += 1;
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

    out.text = best;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn rejects_country_dropdown_blob() {
        let blob = "Afghanistan Albania Algeria Argentina Australia Austria \
                    Bangladesh Belgium Brazil Canada";
        assert!(is_ui_chrome(blob));
    }

    #[test]
    fn rejects_mashed_caps_filter_labels() {
        assert!(is_ui_chrome("ALLADSISSUES ELECTIONSPOLITICS something"));
    }

    #[test]
    fn accepts_plain_creative_text() {
        let text = "Join thousands of parents who trust our weekend coding \
                    classes. Your child builds real projects from week one.";
        assert!(!is_ui_chrome(text));
    }

    #[test]
    fn minimum_length_candidate_is_accepted() {
        let body = "Join our weekend coding class for kids aged seven.";
        assert_eq!(body.chars().count(), MIN_TEXT_LEN);
        let html = format!("<div><p>{body}</p></div>");
        let doc = Html::parse_fragment(&html);
        let sel = Selector::parse("div").unwrap();
        let container = doc.select(&sel).next().unwrap();
        assert_eq!(extract(&container).text.as_deref(), Some(body));
    }

    #[test]
    fn extract_prefers_creative_over_chrome() {
        let html = format!(
            r#"<div>
                <p>{}</p>
                <p>Join thousands of parents who trust our weekend coding classes. Your child builds real projects from week one.</p>
            </div>"#,
            "Show more ads from this advertiser and filter ads by category here"
        );
        let doc = Html::parse_fragment(&html);
        let sel = Selector::parse("div").unwrap();
        let container = doc.select(&sel).next().unwrap();
        let got = extract(&container);
        assert!(got.text.as_deref().unwrap().starts_with("Join thousands"));
        assert!(got.ui_rejected >= 1);
    }
}
