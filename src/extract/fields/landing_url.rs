//! Landing-page URL extraction. Ads route outbound clicks through the
//! platform's redirector, tracking attributes, or inline handlers, so the
//! chain tries progressively less reliable sources and records which one
//! produced the value.

use percent_encoding::percent_decode_str;
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::OnceLock;
use url::Url;

use super::{first_success, Strategy};

/// Hosts that never count as an external landing page.
const PLATFORM_HOSTS: &[&str] = &["facebook.com", "instagram.com", "fb.me", "fb.com"];
const CDN_MARKERS: &[&str] = &["fbcdn.net", "scontent"];

#[derive(Debug, Default, Clone)]
pub struct LandingPage {
    pub url: Option<String>,
    pub strategy: Option<&'static str>,
}

fn redirect_param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?&]u=([^&]+)").expect("static regex"))
}

fn onclick_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s"'\\)]+"#).expect("static regex"))
}

/// True when `candidate` parses as an absolute URL pointing off-platform.
/// Bare `www.`-prefixed domains are tolerated (scheme prepended).
pub fn is_external_url(candidate: &str) -> bool {
    let candidate = candidate.trim();
    let normalized = if candidate.starts_with("www.") {
        format!("https://{candidate}")
    } else {
        candidate.to_string()
    };
    let Ok(parsed) = Url::parse(&normalized) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    if PLATFORM_HOSTS.iter().any(|p| host == *p || host.ends_with(&format!(".{p}"))) {
        return false;
    }
    !CDN_MARKERS.iter().any(|m| host.contains(m))
}

/// Normalize a raw candidate into the stored form, or reject it.
fn accept(candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    if !is_external_url(candidate) {
        return None;
    }
    if candidate.starts_with("www.") {
        Some(format!("https://{candidate}"))
    } else {
        Some(candidate.to_string())
    }
}

/// Decode the platform redirector: `l.php?u=<pct-encoded-target>`, or the
/// `facebook.com/redirect/` and `fb.me/` shapes which carry the target in
/// `data-lynx-uri` instead.
fn from_redirect(container: &ElementRef) -> Option<String> {
    let sel = Selector::parse("a[href]").ok()?;
    for a in container.select(&sel) {
        let href = a.value().attr("href")?;
        if href.contains("l.php") {
            if let Some(c) = redirect_param_re().captures(href) {
                let decoded = percent_decode_str(&c[1]).decode_utf8().ok()?;
                if let Some(url) = accept(&decoded) {
                    return Some(url);
                }
            }
        }
        if href.contains("facebook.com/redirect/") || href.contains("fb.me/") {
            if let Some(lynx) = a.value().attr("data-lynx-uri") {
                if let Some(url) = accept(lynx) {
                    return Some(url);
                }
            }
        }
    }
    None
}

/// Plain external href on any anchor.
fn from_direct_href(container: &ElementRef) -> Option<String> {
    let sel = Selector::parse("a[href]").ok()?;
    container
        .select(&sel)
        .filter_map(|a| a.value().attr("href"))
        .find_map(accept)
}

/// `data-lynx-uri` tracking attribute anywhere in the container.
fn from_tracking_attr(container: &ElementRef) -> Option<String> {
    let sel = Selector::parse("[data-lynx-uri]").ok()?;
    container
        .select(&sel)
        .filter_map(|el| el.value().attr("data-lynx-uri"))
        .find_map(accept)
}

/// URL buried in an inline click handler.
fn from_onclick(container: &ElementRef) -> Option<String> {
    let sel = Selector::parse("[onclick]").ok()?;
    for el in container.select(&sel) {
        let handler = el.value().attr("onclick")?;
        for m in onclick_url_re().find_iter(handler) {
            if let Some(url) = accept(m.as_str()) {
                return Some(url);
            }
        }
    }
    None
}

/// Last resort: a URL-shaped token in the visible text.
fn from_text(container: &ElementRef) -> Option<String> {
    let text: String = container.text().collect();
    onclick_url_re()
        .find_iter(&text)
        .find_map(|m| accept(m.as_str()))
}

/// Run the chain in order of reliability.
pub fn extract(container: &ElementRef) -> LandingPage {
    let chain = [
        Strategy { name: "redirect_decode", run: from_redirect },
        Strategy { name: "direct_href", run: from_direct_href },
        Strategy { name: "tracking_attr", run: from_tracking_attr },
        Strategy { name: "onclick", run: from_onclick },
        Strategy { name: "text_regex", run: from_text },
    ];
    match first_success(&chain, container) {
        Some((url, name)) => LandingPage { url: Some(url), strategy: Some(name) },
        None => LandingPage::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn card<'a>(doc: &'a Html, sel: &'a Selector) -> ElementRef<'a> {
        doc.select(sel).next().unwrap()
    }

    #[test]
    fn redirect_param_is_decoded() {
        let doc = Html::parse_document(
            r#"<div class="card">
                 <a href="https://l.facebook.com/l.php?u=https%3A%2F%2Fexample.com%2Fcourse%3Fref%3Dad&h=xyz">Learn More</a>
               </div>"#,
        );
        let sel = Selector::parse("div.card").unwrap();
        let got = extract(&card(&doc, &sel));
        assert_eq!(got.url.as_deref(), Some("https://example.com/course?ref=ad"));
        assert_eq!(got.strategy, Some("redirect_decode"));
    }

    #[test]
    fn platform_hosts_are_never_external() {
        assert!(!is_external_url("https://www.facebook.com/somepage"));
        assert!(!is_external_url("https://instagram.com/someone"));
        assert!(!is_external_url("https://scontent.xx.fbcdn.net/v/img.jpg"));
        assert!(is_external_url("https://example.com/landing"));
        assert!(is_external_url("www.example.com/landing"));
    }

    #[test]
    fn direct_href_when_no_redirector() {
        let doc = Html::parse_document(
            r#"<div class="card">
                 <a href="https://www.facebook.com/advertiser">Page</a>
                 <a href="https://shop.example.com/sale">Shop Now</a>
               </div>"#,
        );
        let sel = Selector::parse("div.card").unwrap();
        let got = extract(&card(&doc, &sel));
        assert_eq!(got.url.as_deref(), Some("https://shop.example.com/sale"));
        assert_eq!(got.strategy, Some("direct_href"));
    }

    #[test]
    fn none_when_everything_is_internal() {
        let doc = Html::parse_document(
            r#"<div class="card"><a href="https://www.facebook.com/x">x</a></div>"#,
        );
        let sel = Selector::parse("div.card").unwrap();
        let got = extract(&card(&doc, &sel));
        assert!(got.url.is_none());
        assert!(got.strategy.is_none());
    }
}
