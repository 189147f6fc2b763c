//! Browser-based snapshot capture.
//!
//! Uses chromiumoxide (CDP) with one browser and one shared page visited
//! sequentially, which bounds resource usage for large sites. Navigation
//! failures are per-route: they land in the batch failure list and never
//! abort the run.

use std::collections::HashMap;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::artifacts::ArtifactStore;
use crate::config::Settings;
use crate::models::{BatchOutcome, RouteContract, RouteKind, Snapshot};

/// Errors from the capture backend.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Content read failed: {0}")]
    Content(String),
}

/// A launched browser with its single shared page.
pub struct BrowserCapturer {
    browser: Browser,
    page: Page,
    timeout: Duration,
    settle: Duration,
}

impl BrowserCapturer {
    /// Launch the browser and open the shared page.
    pub async fn launch(settings: &Settings) -> Result<Self, CaptureError> {
        let capture = &settings.capture;
        info!("Launching browser (headless={})", capture.headless);

        let mut builder = BrowserConfig::builder();
        // with_head means NOT headless, confusingly
        if !capture.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(CaptureError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CaptureError::Launch(e.to_string()))?;

        tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::Launch(e.to_string()))?;

        Ok(Self {
            browser,
            page,
            timeout: Duration::from_secs(capture.timeout_secs),
            settle: Duration::from_millis(capture.settle_ms),
        })
    }

    /// Navigate the shared page to a URL and return its rendered HTML.
    pub async fn capture_html(&self, url: &str) -> Result<String, CaptureError> {
        debug!("Navigating to {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| CaptureError::Navigation(e.to_string()))?;

        // Wait for readiness via document.readyState instead of a fixed
        // delay; fall through on timeout since some pages never settle
        let ready_script = r#"
            new Promise((resolve) => {
                if (document.readyState === 'complete' || document.readyState === 'interactive') {
                    resolve(document.readyState);
                } else {
                    document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
                    setTimeout(() => resolve('timeout'), 10000);
                }
            })
        "#;
        match tokio::time::timeout(self.timeout, self.page.evaluate(ready_script.to_string())).await
        {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => debug!("Could not check ready state: {}", e),
            Err(_) => warn!("Timeout waiting for page ready state on {}", url),
        }

        // Small additional delay for late-rendering content
        tokio::time::sleep(self.settle).await;

        self.page
            .content()
            .await
            .map_err(|e| CaptureError::Content(e.to_string()))
    }

    pub async fn close(mut self) {
        let _ = self.browser.close().await;
    }
}

/// Capture every HTML route of the contract into the snapshot store.
///
/// Sequential by design; statuses come from the discovery probe table.
pub async fn run_capture(
    settings: &Settings,
    store: &ArtifactStore,
    contract: &RouteContract,
    statuses: &HashMap<String, u16>,
    limit: usize,
) -> anyhow::Result<BatchOutcome<String>> {
    let internal_hosts = settings.site.internal_hosts();
    let media_hosts = settings.assets.media_hosts.clone();
    let max_pages = if limit > 0 {
        limit
    } else if settings.capture.max_pages > 0 {
        settings.capture.max_pages
    } else {
        usize::MAX
    };

    let capturer = BrowserCapturer::launch(settings)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    let html_routes: Vec<_> = contract
        .ok_routes()
        .filter(|r| r.kind == RouteKind::Html)
        .collect();
    let progress = ProgressBar::new(html_routes.len().min(max_pages) as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("static progress template"),
    );

    let mut outcome = BatchOutcome::new();
    for route in html_routes {
        if outcome.succeeded.len() >= max_pages {
            break;
        }
        progress.set_message(route.path.clone());
        match capturer.capture_html(&route.source_url).await {
            Ok(html) => {
                let snapshot: Snapshot = super::build_snapshot(
                    &route.source_url,
                    &route.path,
                    html,
                    statuses,
                    &internal_hosts,
                    &media_hosts,
                );
                match super::write_snapshot(store, &snapshot) {
                    Ok(_) => outcome.push_ok(route.path.clone()),
                    Err(e) => outcome.push_failure(route.path.clone(), e.to_string()),
                }
            }
            Err(e) => {
                warn!("Capture failed for {}: {}", route.source_url, e);
                outcome.push_failure(route.source_url.clone(), e.to_string());
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    capturer.close().await;
    info!("Capture finished: {}", outcome.summary());
    Ok(outcome)
}
