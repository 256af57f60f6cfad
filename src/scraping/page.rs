//! The thin browser seam. Everything the scroll controller and per-target
//! handler need from a live tab sits behind `AdLibraryPage`, so both can be
//! tested against a scripted fake without a browser process.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::Page;
use std::time::Duration;
use tracing::debug;

use super::scroll::ScrollSignals;

#[async_trait]
pub trait AdLibraryPage: Send + Sync {
    /// Marshal the rendered document out of the tab.
    async fn html(&self) -> Result<String>;
    async fn title(&self) -> Result<String>;
    async fn url(&self) -> String;

    /// Capture the signal triple the scroll controller steers by.
    async fn scroll_signals(&self) -> Result<ScrollSignals>;
    /// One downward scroll step.
    async fn scroll_step(&self) -> Result<()>;
    /// Click a visible "load more" control if one exists. Returns whether
    /// a click happened.
    async fn click_load_more(&self) -> Result<bool>;

    /// Send Escape to the page (closes most login prompts).
    async fn press_escape(&self) -> Result<()>;
    /// Hide dialog/modal overlays. Returns how many were hidden.
    async fn dismiss_overlays(&self) -> Result<u64>;

    /// Fixed settle delay between actions.
    async fn settle(&self, ms: u64);
}

/// Live chromiumoxide-backed implementation.
pub struct LivePage {
    page: Page,
}

impl LivePage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    async fn eval_json(&self, js: &str) -> Result<serde_json::Value> {
        self.page
            .evaluate(js)
            .await
            .map_err(|e| anyhow!("evaluate failed: {}", e))?
            .into_value::<serde_json::Value>()
            .map_err(|e| anyhow!("evaluate result decode failed: {}", e))
    }
}

const SCROLL_STEP_PX: u32 = 600;

/// Counts elements that look ad-shaped without waiting for full extraction.
const JS_SCROLL_SIGNALS: &str = r#"(() => {
    const adLike = document.querySelectorAll(
        '[data-testid*="ad"], [data-testid*="result"], article'
    ).length;
    return JSON.stringify({
        page_height: Math.max(document.body.scrollHeight, document.documentElement.scrollHeight),
        scroll_offset: window.scrollY,
        ad_like_count: adLike
    });
})()"#;

const JS_CLICK_LOAD_MORE: &str = r#"(() => {
    const nodes = document.querySelectorAll('div[role="button"], a[role="button"], button');
    for (const n of nodes) {
        const t = (n.textContent || '').trim().toLowerCase();
        if (!/see more|show more|load more/.test(t)) continue;
        if (n.offsetParent === null) continue; // hidden
        n.click();
        return true;
    }
    return false;
})()"#;

const JS_PRESS_ESCAPE: &str = r#"(() => {
    document.dispatchEvent(new KeyboardEvent('keydown', {key: 'Escape', keyCode: 27, bubbles: true}));
    document.dispatchEvent(new KeyboardEvent('keyup', {key: 'Escape', keyCode: 27, bubbles: true}));
    return true;
})()"#;

const JS_DISMISS_OVERLAYS: &str = r#"(() => {
    const overlays = document.querySelectorAll(
        '[role="dialog"], .modal, [data-testid*="modal"], [data-testid*="login"], [data-testid*="signup"]'
    );
    let hidden = 0;
    for (const el of overlays) {
        el.style.display = 'none';
        hidden += 1;
    }
    return hidden;
})()"#;

#[async_trait]
impl AdLibraryPage for LivePage {
    async fn html(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| anyhow!("Failed to get page content: {}", e))
    }

    async fn title(&self) -> Result<String> {
        Ok(self
            .page
            .get_title()
            .await
            .map_err(|e| anyhow!("Failed to get page title: {}", e))?
            .unwrap_or_default())
    }

    async fn url(&self) -> String {
        self.page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    async fn scroll_signals(&self) -> Result<ScrollSignals> {
        let raw = self.eval_json(JS_SCROLL_SIGNALS).await?;
        let json = raw
            .as_str()
            .ok_or_else(|| anyhow!("scroll signals: expected JSON string"))?;
        let signals: ScrollSignals = serde_json::from_str(json)?;
        Ok(signals)
    }

    async fn scroll_step(&self) -> Result<()> {
        self.page
            .evaluate(format!("window.scrollBy(0, {SCROLL_STEP_PX});"))
            .await
            .map_err(|e| anyhow!("scroll step failed: {}", e))?;
        Ok(())
    }

    async fn click_load_more(&self) -> Result<bool> {
        let clicked = self
            .eval_json(JS_CLICK_LOAD_MORE)
            .await?
            .as_bool()
            .unwrap_or(false);
        if clicked {
            debug!("clicked load-more control");
        }
        Ok(clicked)
    }

    async fn press_escape(&self) -> Result<()> {
        self.eval_json(JS_PRESS_ESCAPE).await?;
        Ok(())
    }

    async fn dismiss_overlays(&self) -> Result<u64> {
        Ok(self
            .eval_json(JS_DISMISS_OVERLAYS)
            .await?
            .as_u64()
            .unwrap_or(0))
    }

    async fn settle(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
