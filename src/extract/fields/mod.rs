//! Per-field extractors. Each field is pulled out of an ad container by an
//! ordered chain of strategies; the first strategy that yields a value wins
//! and its name is recorded for diagnostics.

pub mod active_days;
pub mod advertiser;
pub mod cta;
pub mod landing_url;
pub mod library_id;
pub mod media;
pub mod text;

/// One named attempt at extracting a value from an input.
pub struct Strategy<I: ?Sized, T> {
    pub name: &'static str,
    pub run: fn(&I) -> Option<T>,
}

/// Run strategies in order; return the first hit together with the
/// strategy name that produced it.
pub fn first_success<I: ?Sized, T>(
    strategies: &[Strategy<I, T>],
    input: &I,
) -> Option<(T, &'static str)> {
    for s in strategies {
        if let Some(v) = (s.run)(input) {
            return Some((v, s.name));
        }
    }
    None
}

/// Collapse whitespace runs and trim. Shared by every text-bearing field.
pub fn squash_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_success_is_ordered() {
        let chain: Vec<Strategy<str, u32>> = vec![
            Strategy { name: "never", run: |_| None },
            Strategy { name: "len", run: |s: &str| Some(s.len() as u32) },
            Strategy { name: "shadowed", run: |_| Some(0) },
        ];
        let (v, name) = first_success(&chain, "abcd").unwrap();
        assert_eq!(v, 4);
        assert_eq!(name, "len");
    }

    #[test]
    fn squash_ws_collapses_runs() {
        assert_eq!(squash_ws("  a\n\t b   c "), "a b c");
    }
}
