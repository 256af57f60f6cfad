//! Library-ID extraction. The transparency library renders the ID in
//! several inconsistent places (anchor query params, data attributes,
//! visible "Library ID:" labels, aria labels), and sometimes only outside
//! the ad container itself. Strategies run in order of trustworthiness;
//! the winning strategy name is kept for diagnostics.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::OnceLock;

use super::{first_success, Strategy};

fn href_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[?&])(?:id|ad_id|library_id)=(\d{10,})").expect("static regex")
    })
}

fn label_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)library\s*id[:\s]*(\d{10,})").expect("static regex"))
}

fn bare_digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{13,})\b").expect("static regex"))
}

fn id_from_href(href: &str) -> Option<String> {
    href_id_re()
        .captures(href)
        .map(|c| c[1].to_string())
}

/// 1. Query parameter of any anchor inside the container.
fn from_anchor_query(container: &ElementRef) -> Option<String> {
    let sel = Selector::parse("a[href]").ok()?;
    container
        .select(&sel)
        .filter_map(|a| a.value().attr("href"))
        .find_map(id_from_href)
}

/// 2. ID-bearing data attributes on the container or its descendants.
fn from_data_attrs(container: &ElementRef) -> Option<String> {
    let digit_run = |v: &str| {
        let trimmed = v.trim();
        (trimmed.len() >= 10 && trimmed.bytes().all(|b| b.is_ascii_digit()))
            .then(|| trimmed.to_string())
    };
    let interesting = |name: &str| {
        matches!(
            name,
            "data-ad-id" | "data-adid" | "data-library-id" | "data-id" | "data-ad-archive-id"
        )
    };
    for (name, value) in container.value().attrs() {
        if interesting(name) {
            if let Some(id) = digit_run(value) {
                return Some(id);
            }
        }
    }
    let sel = Selector::parse("[data-ad-id], [data-adid], [data-library-id], [data-id], [data-ad-archive-id]").ok()?;
    for el in container.select(&sel) {
        for (name, value) in el.value().attrs() {
            if interesting(name) {
                if let Some(id) = digit_run(value) {
                    return Some(id);
                }
            }
        }
    }
    None
}

/// 3. Visible text: explicit "Library ID: N" label, else a bare 13+ digit run.
fn from_text(container: &ElementRef) -> Option<String> {
    let text: String = container.text().collect();
    if let Some(c) = label_id_re().captures(&text) {
        return Some(c[1].to_string());
    }
    bare_digits_re().captures(&text).map(|c| c[1].to_string())
}

/// 4. Digit runs inside aria-labels.
fn from_aria_label(container: &ElementRef) -> Option<String> {
    let sel = Selector::parse("[aria-label]").ok()?;
    for el in container.select(&sel) {
        if let Some(label) = el.value().attr("aria-label") {
            if let Some(c) = bare_digits_re().captures(label) {
                return Some(c[1].to_string());
            }
        }
    }
    None
}

/// 5. Anchors on the parent element or the container's siblings — the
/// library sometimes hangs the permalink just outside the card markup.
fn from_parent_or_siblings(container: &ElementRef) -> Option<String> {
    let parent = container.parent().and_then(ElementRef::wrap)?;
    if let Some(href) = parent.value().attr("href") {
        if let Some(id) = id_from_href(href) {
            return Some(id);
        }
    }
    let sel = Selector::parse("a[href]").ok()?;
    for a in parent.select(&sel) {
        if let Some(id) = a.value().attr("href").and_then(id_from_href) {
            return Some(id);
        }
    }
    None
}

/// 6. Whole-page proximity: find every `/ads/library/?id=` permalink in the
/// document and take the one closest to the container in document order.
/// Static HTML has no layout geometry, so node order stands in for it.
fn from_document_proximity(doc: &Html, container: &ElementRef) -> Option<String> {
    let positions: HashMap<_, _> = doc
        .tree
        .nodes()
        .enumerate()
        .map(|(i, n)| (n.id(), i))
        .collect();
    let container_pos = *positions.get(&container.id())?;

    let sel = Selector::parse(r#"a[href*="/ads/library/?id="]"#).ok()?;
    let mut best: Option<(usize, String)> = None;
    for a in doc.select(&sel) {
        let Some(id) = a.value().attr("href").and_then(id_from_href) else {
            continue;
        };
        let pos = match positions.get(&a.id()) {
            Some(p) => *p,
            None => continue,
        };
        let dist = pos.abs_diff(container_pos);
        if best.as_ref().map(|(d, _)| dist < *d).unwrap_or(true) {
            best = Some((dist, id));
        }
    }
    best.map(|(_, id)| id)
}

/// Run the full chain. Returns the ID and the strategy that found it.
pub fn extract(doc: &Html, container: &ElementRef) -> Option<(String, &'static str)> {
    let chain = [
        Strategy { name: "anchor_query", run: from_anchor_query },
        Strategy { name: "data_attr", run: from_data_attrs },
        Strategy { name: "text_label", run: from_text },
        Strategy { name: "aria_label", run: from_aria_label },
        Strategy { name: "parent_sibling", run: from_parent_or_siblings },
    ];
    first_success(&chain, container)
        .or_else(|| from_document_proximity(doc, container).map(|id| (id, "document_proximity")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container<'a>(doc: &'a Html, sel: &'a Selector) -> ElementRef<'a> {
        doc.select(sel).next().unwrap()
    }

    #[test]
    fn anchor_query_wins_first() {
        let doc = Html::parse_document(
            r#"<div class="card">
                 <a href="https://www.facebook.com/ads/library/?id=1234567890123">permalink</a>
                 <span>Library ID: 9999999999999</span>
               </div>"#,
        );
        let sel = Selector::parse("div.card").unwrap();
        let (id, strat) = extract(&doc, &container(&doc, &sel)).unwrap();
        assert_eq!(id, "1234567890123");
        assert_eq!(strat, "anchor_query");
    }

    #[test]
    fn text_label_fallback() {
        let doc = Html::parse_document(
            r#"<div class="card"><span>Library ID: 1234567890123</span></div>"#,
        );
        let sel = Selector::parse("div.card").unwrap();
        let (id, strat) = extract(&doc, &container(&doc, &sel)).unwrap();
        assert_eq!(id, "1234567890123");
        assert_eq!(strat, "text_label");
    }

    #[test]
    fn document_proximity_picks_nearest_permalink() {
        let doc = Html::parse_document(
            r#"<body>
                 <a href="/ads/library/?id=1111111111111">far</a>
                 <div><p>spacer</p><p>spacer</p><p>spacer</p></div>
                 <section><div class="card"><p>no id in here</p></div></section>
                 <a href="/ads/library/?id=2222222222222">near</a>
               </body>"#,
        );
        let sel = Selector::parse("div.card").unwrap();
        let (id, strat) = extract(&doc, &container(&doc, &sel)).unwrap();
        assert_eq!(id, "2222222222222");
        assert_eq!(strat, "document_proximity");
    }

    #[test]
    fn short_digit_runs_are_ignored() {
        let doc = Html::parse_document(
            r#"<div class="card"><span>Posted 123456 times</span></div>"#,
        );
        let sel = Selector::parse("div.card").unwrap();
        assert!(extract(&doc, &container(&doc, &sel)).is_none());
    }
}
