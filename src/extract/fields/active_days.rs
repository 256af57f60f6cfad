//! Active-days estimation from visible text. No pattern match means the
//! value is unknown and stays `None` — it is never guessed or randomized,
//! so two runs over the same markup always agree.

use regex::Regex;
use std::sync::OnceLock;

fn patterns() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?i)(\d+)\s*days?\s*ago",
            r"(?i)(\d+)\s*hari\s*yang\s*lalu",
            r"(?i)active\s*for\s*(\d+)\s*days?",
            r"(?i)running\s*for\s*(\d+)\s*days?",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static regex"))
        .collect()
    })
}

/// First day-count pattern found in `text`, else `None`.
pub fn extract(text: &str) -> Option<u32> {
    for re in patterns() {
        if let Some(c) = re.captures(text) {
            if let Ok(days) = c[1].parse() {
                return Some(days);
            }
        }
    }
    None
}
