//! Scroll/load controller. The results feed lazy-loads on scroll and
//! sometimes gates on a "see more" button; the controller drives both and
//! stops as soon as the page stops producing, instead of burning the full
//! iteration budget on an exhausted feed.

use anyhow::Result;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use super::page::AdLibraryPage;

/// Signal triple captured before and after each iteration.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ScrollSignals {
    pub page_height: u64,
    pub scroll_offset: u64,
    pub ad_like_count: u64,
}

#[derive(Debug, Clone)]
pub struct ScrollOptions {
    pub max_iterations: usize,
    /// Consecutive no-growth iterations tolerated before early exit.
    pub stagnation_threshold: usize,
    pub settle_ms: u64,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            stagnation_threshold: 3,
            settle_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScrollOutcome {
    pub iterations: usize,
    pub final_ad_like_count: u64,
    pub stopped_early: bool,
}

/// Drive the page until the feed is exhausted, the iteration budget runs
/// out, or `cancel` is raised.
///
/// Stagnation counting: an iteration with no ad-count growth AND no scroll
/// movement increments the counter; growth or a load-more click resets it.
pub async fn drive(
    page: &dyn AdLibraryPage,
    opts: &ScrollOptions,
    cancel: &AtomicBool,
) -> Result<ScrollOutcome> {
    let mut stagnant = 0usize;
    let mut last = page.scroll_signals().await.unwrap_or_default();
    let mut iterations = 0usize;
    let mut stopped_early = false;

    while iterations < opts.max_iterations {
        if cancel.load(Ordering::Relaxed) {
            info!("scroll cancelled after {} iterations", iterations);
            stopped_early = true;
            break;
        }
        iterations += 1;

        let clicked = page.click_load_more().await.unwrap_or(false);
        if clicked {
            // A gated feed just got a new batch queued; give it a chance.
            stagnant = 0;
        } else {
            page.scroll_step().await?;
        }
        page.settle(opts.settle_ms).await;

        let now = page.scroll_signals().await.unwrap_or(last);
        let grew = now.ad_like_count > last.ad_like_count;
        let moved = now.scroll_offset != last.scroll_offset || now.page_height != last.page_height;

        if grew {
            stagnant = 0;
        } else if !clicked && !moved {
            stagnant += 1;
            debug!(
                iteration = iterations,
                stagnant, "no growth and no movement"
            );
            if stagnant >= opts.stagnation_threshold {
                info!(
                    iterations,
                    count = now.ad_like_count,
                    "feed exhausted — stopping scroll early"
                );
                stopped_early = true;
                last = now;
                break;
            }
        }
        last = now;
    }

    Ok(ScrollOutcome {
        iterations,
        final_ad_like_count: last.ad_like_count,
        stopped_early,
    })
}
