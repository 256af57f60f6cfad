use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use adscout::core::config::load_scout_config;
use adscout::core::types::RunRecord;
use adscout::discover::{self, DatasetSink, JsonlSink, Target};
use adscout::scraping::browser::ScoutBrowser;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_scout_config();

    let mut targets: Vec<Target> = Vec::new();
    targets.extend(config.search_terms.iter().cloned().map(Target::SearchTerm));
    targets.extend(config.competitors.iter().cloned().map(Target::Competitor));
    if targets.is_empty() {
        bail!(
            "No targets configured. Add search_terms or competitors to adscout.json \
             (or set ADSCOUT_SEARCH_TERMS)."
        );
    }
    info!(
        targets = targets.len(),
        country = %config.country,
        min_active_days = config.min_active_days,
        engagement = config.enable_engagement_matching,
        "starting discovery run"
    );

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received — finishing current step and shutting down");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let browser = ScoutBrowser::launch().await?;
    let mut sink = JsonlSink::open(&config.output_path)?;

    let mut total_ads = 0usize;
    let mut failed_targets = 0usize;
    for target in &targets {
        if cancel.load(Ordering::Relaxed) {
            warn!("run cancelled — skipping remaining targets");
            break;
        }
        let records = discover::process_target(&browser, target, &config, &cancel).await;
        for record in &records {
            match record {
                RunRecord::Ad(_) => total_ads += 1,
                RunRecord::Error(_) => failed_targets += 1,
                RunRecord::NoAds(_) => {}
            }
            if let Err(e) = sink.write(record) {
                error!("dataset write failed: {}", e);
            }
        }
        if let Err(e) = sink.flush() {
            error!("dataset flush failed: {}", e);
        }
    }

    browser.close().await;
    info!(
        ads = total_ads,
        failed = failed_targets,
        output = %config.output_path,
        "discovery run complete"
    );
    Ok(())
}
