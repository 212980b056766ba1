use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::info;

/// Rendered-page access. Implementations navigate, wait for the page to
/// settle, and hand back the final HTML as plain text so everything
/// downstream stays browser-free.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Headless-Chrome driver. One tab, reused sequentially for the whole run.
pub struct ChromeDriver {
    _browser: Browser,
    tab: Arc<Tab>,
    settle_delay: Duration,
}

impl ChromeDriver {
    pub fn new(nav_timeout: Duration, settle_delay: Duration) -> Result<Self> {
        info!("Launching headless Chrome...");
        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .context("Failed to build launch options")?;
        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab()?;
        tab.set_default_timeout(nav_timeout);
        Ok(Self {
            _browser: browser,
            tab,
            settle_delay,
        })
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.tab
            .navigate_to(url)
            .with_context(|| format!("Failed to navigate to {}", url))?;
        self.tab.wait_until_navigated()?;

        // Listing and detail content is injected after load; give the page a
        // fixed window to settle before snapshotting.
        tokio::time::sleep(self.settle_delay).await;

        let result = self
            .tab
            .evaluate("document.documentElement.outerHTML", false)?;
        result
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("Empty HTML snapshot for {}", url))
    }
}
