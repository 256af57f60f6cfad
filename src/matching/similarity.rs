//! Similarity primitives for ad ↔ organic-post matching. Each function
//! returns a score in `[0, 1]` and tolerates empty or malformed input by
//! scoring it zero rather than failing.

use std::collections::HashSet;
use url::Url;

const TEXT_PREFIX_CHARS: usize = 300;
const STEM_TRUNCATE: usize = 8;
const IMAGE_PAIR_LIMIT: usize = 3;
const KEYWORD_LIMIT: usize = 10;
const MIN_KEYWORD_LEN: usize = 3;
/// One week, in hours. Posts older than this relative to the ad score zero
/// on the time signal.
pub const TIME_DECAY_HOURS: f64 = 168.0;

/// English + Indonesian stopwords, enough to keep keyword sets meaningful.
const STOPWORDS: &[&str] = &[
    // en
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "her",
    "was", "one", "our", "out", "his", "has", "have", "this", "that", "with",
    "they", "from", "will", "would", "there", "their", "what", "about",
    "which", "when", "your", "more", "been", "were", "into", "than", "them",
    // id
    "yang", "dan", "di", "ke", "dari", "untuk", "pada", "dengan", "ini",
    "itu", "atau", "juga", "akan", "ada", "tidak", "bisa", "kami", "kita",
    "anda", "saya", "sudah", "belum", "agar", "karena", "seperti",
];

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Lowercase, strip non-word characters, collapse whitespace, keep the
/// first `TEXT_PREFIX_CHARS` characters.
fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(TEXT_PREFIX_CHARS)
        .collect()
}

/// Crude suffix stemmer: strip one common suffix, then truncate. Good
/// enough to make "tutoring"/"tutors"/"tutored" collide.
fn stem(word: &str) -> String {
    let mut w = word;
    for suffix in ["ing", "ed", "s", "ly", "er"] {
        if let Some(stripped) = w.strip_suffix(suffix) {
            if !stripped.is_empty() {
                w = stripped;
                break;
            }
        }
    }
    w.chars().take(STEM_TRUNCATE).collect()
}

fn stemmed_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(stem).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Jaccard similarity over stemmed word sets of the normalized prefixes.
/// Identical normalized prefixes short-circuit to 1.0.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let na = normalize(a);
    let nb = normalize(b);
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }
    if na == nb {
        return 1.0;
    }
    jaccard(&stemmed_set(&na), &stemmed_set(&nb))
}

fn filename_of(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut s| s.next_back())
        .unwrap_or_default()
        .to_string()
}

fn pair_score(a: &Url, b: &Url) -> f64 {
    let fa = filename_of(a);
    let fb = filename_of(b);
    if !fa.is_empty() && fa == fb {
        return 1.0;
    }
    if a.host_str() == b.host_str() && a.path() == b.path() {
        return 0.9;
    }
    if !fa.is_empty() && !fb.is_empty() && (fa.contains(&fb) || fb.contains(&fa)) {
        return 0.7;
    }
    0.0
}

/// Best pairwise URL score over the first few images on each side.
/// CDN URLs carry volatile query strings, so only host/path/filename count.
pub fn image_similarity(ad_urls: &[String], post_urls: &[String]) -> f64 {
    let parse_ok = |urls: &[String]| -> Vec<Url> {
        urls.iter()
            .take(IMAGE_PAIR_LIMIT)
            .filter_map(|u| Url::parse(u).ok())
            .collect()
    };
    let a = parse_ok(ad_urls);
    let b = parse_ok(post_urls);
    let mut best: f64 = 0.0;
    for ua in &a {
        for ub in &b {
            best = best.max(pair_score(ua, ub));
        }
    }
    best
}

fn keywords(text: &str) -> HashSet<String> {
    normalize(text)
        .split_whitespace()
        .filter(|w| w.chars().count() > MIN_KEYWORD_LEN && !is_stopword(w))
        .take(KEYWORD_LIMIT)
        .map(str::to_string)
        .collect()
}

/// Jaccard over the leading content keywords of each text.
pub fn semantic_similarity(a: &str, b: &str) -> f64 {
    jaccard(&keywords(a), &keywords(b))
}

/// Linear decay from 1.0 at zero hours difference to 0.0 at one week.
pub fn time_similarity(diff_hours: f64) -> f64 {
    if diff_hours <= 0.0 {
        return 1.0;
    }
    (1.0 - diff_hours / TIME_DECAY_HOURS).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_identity_scores_one() {
        let t = "Weekend coding classes for kids, first session free!";
        assert_eq!(text_similarity(t, t), 1.0);
    }

    #[test]
    fn text_similarity_is_symmetric_and_bounded() {
        let a = "Weekend coding classes for kids aged 7 to 15";
        let b = "Our coding class runs every weekend for children";
        let ab = text_similarity(a, b);
        let ba = text_similarity(b, a);
        assert_eq!(ab, ba);
        assert!((0.0..=1.0).contains(&ab));
        assert!(ab > 0.0);
    }

    #[test]
    fn unrelated_texts_score_low() {
        let a = "Weekend coding classes for kids aged 7 to 15";
        let b = "Fresh sourdough bread delivered daily across town";
        assert!(text_similarity(a, b) < 0.2);
    }

    #[test]
    fn stemming_collides_inflections() {
        assert_eq!(stem("tutoring"), stem("tutors"));
        assert_eq!(stem("tutoring"), stem("tutored"));
    }

    #[test]
    fn image_filename_match_beats_containment() {
        let exact = image_similarity(
            &["https://scontent.a.fbcdn.net/v/creative_01.jpg?x=1".into()],
            &["https://scontent.b.fbcdn.net/t/creative_01.jpg?y=2".into()],
        );
        assert_eq!(exact, 1.0);

        let contained = image_similarity(
            &["https://cdn.example/a/creative_01.jpg".into()],
            &["https://cdn.example/b/01.jpg".into()],
        );
        assert_eq!(contained, 0.7);

        let none = image_similarity(
            &["https://cdn.example/a/one.jpg".into()],
            &["https://cdn.example/b/two.jpg".into()],
        );
        assert_eq!(none, 0.0);
    }

    #[test]
    fn malformed_image_urls_are_skipped() {
        assert_eq!(
            image_similarity(&["not a url".into()], &["also bad".into()]),
            0.0
        );
    }

    #[test]
    fn time_decay_boundaries() {
        assert_eq!(time_similarity(0.0), 1.0);
        assert!((time_similarity(84.0) - 0.5).abs() < 1e-9);
        assert_eq!(time_similarity(168.0), 0.0);
        assert_eq!(time_similarity(500.0), 0.0);
    }

    #[test]
    fn semantic_ignores_stopwords() {
        let a = "the best coding bootcamp for the children";
        let b = "coding bootcamp children enrollment open";
        assert!(semantic_similarity(a, b) > 0.3);
    }
}
