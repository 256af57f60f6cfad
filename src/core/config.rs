use std::path::Path;

// ---------------------------------------------------------------------------
// ScoutConfig — file-based config loader (adscout.json) with env-var fallback
// ---------------------------------------------------------------------------

/// One competitor target (mirrors the `competitors` entries in adscout.json).
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
pub struct CompetitorTarget {
    pub name: String,
    /// Ad-library URL for this competitor's page.
    pub url: String,
    /// Public profile page for engagement matching. When absent, one is
    /// derived from `name` (see `profile_page_url`).
    pub page_url: Option<String>,
}

impl CompetitorTarget {
    /// Profile-page URL for organic-post scraping: explicit `page_url`
    /// when configured, else `https://www.facebook.com/<name-no-spaces>`.
    pub fn profile_page_url(&self) -> String {
        if let Some(u) = &self.page_url {
            if !u.trim().is_empty() {
                return u.clone();
            }
        }
        format!(
            "https://www.facebook.com/{}",
            self.name.replace(char::is_whitespace, "")
        )
    }
}

/// Top-level config loaded from `adscout.json`.
#[derive(serde::Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ScoutConfig {
    /// Keyword searches run against the ad library.
    pub search_terms: Vec<String>,
    /// Direct competitor ad-library pages.
    pub competitors: Vec<CompetitorTarget>,
    /// Two-letter country filter for search-term targets.
    pub country: String,
    /// Minimum estimated active days; ads with a *known* value below this
    /// are dropped. Unknown values always pass.
    pub min_active_days: u32,
    /// Whether to visit profile pages and match ads to organic posts.
    pub enable_engagement_matching: bool,
    /// Hard bound on scroll-controller iterations per page.
    pub max_scroll_iterations: usize,
    /// Cap on records kept per target.
    pub max_ads_per_target: usize,
    /// Fixed settle delay between browser actions, in milliseconds.
    pub settle_ms: u64,
    /// Output path for the JSONL dataset.
    pub output_path: String,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            search_terms: Vec::new(),
            competitors: Vec::new(),
            country: "ID".to_string(),
            min_active_days: 7,
            enable_engagement_matching: false,
            max_scroll_iterations: 30,
            max_ads_per_target: 100,
            settle_ms: 2000,
            output_path: "ads_dataset.jsonl".to_string(),
        }
    }
}

/// Load `adscout.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `ADSCOUT_CONFIG` env var path
/// 2. `./adscout.json`  (process cwd)
/// 3. `../adscout.json` (one level up — repo root when running from a subdir)
///
/// Missing file → `ScoutConfig::default()` (silent, env-var fallbacks apply).
/// Parse error → log a warning, return `ScoutConfig::default()`.
pub fn load_scout_config() -> ScoutConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("adscout.json"),
            std::path::PathBuf::from("../adscout.json"),
        ];
        if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<ScoutConfig>(&contents) {
                Ok(mut cfg) => {
                    tracing::info!("adscout.json loaded from {}", path.display());
                    apply_env_overrides(&mut cfg);
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "adscout.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    let mut cfg = ScoutConfig::default();
                    apply_env_overrides(&mut cfg);
                    return cfg;
                }
            },
            Err(_) => continue, // file not found at this path — try next
        }
    }

    let mut cfg = ScoutConfig::default();
    apply_env_overrides(&mut cfg);
    cfg
}

fn apply_env_overrides(cfg: &mut ScoutConfig) {
    if let Ok(v) = std::env::var("ADSCOUT_SEARCH_TERMS") {
        let terms: Vec<String> = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !terms.is_empty() {
            cfg.search_terms = terms;
        }
    }
    if let Ok(v) = std::env::var("ADSCOUT_COUNTRY") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.country = v.to_ascii_uppercase();
        }
    }
    if let Ok(v) = std::env::var("ADSCOUT_MIN_ACTIVE_DAYS") {
        if let Ok(n) = v.trim().parse() {
            cfg.min_active_days = n;
        }
    }
    if let Ok(v) = std::env::var("ADSCOUT_OUTPUT") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.output_path = v.to_string();
        }
    }
}

// ---------------------------------------------------------------------------

pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";
pub const ENV_CONFIG_PATH: &str = "ADSCOUT_CONFIG";

/// Optional override for the Chromium-family browser executable.
///
/// Default behavior is **auto-discovery** (see `scraping::browser::find_chrome_executable()`).
/// This function only returns a value when `CHROME_EXECUTABLE` is set to an existing path.
pub fn chrome_executable_override() -> Option<String> {
    let p = std::env::var(ENV_CHROME_EXECUTABLE).ok()?;
    let p = p.trim();
    if p.is_empty() {
        return None;
    }
    if Path::new(p).exists() {
        Some(p.to_string())
    } else {
        None
    }
}
