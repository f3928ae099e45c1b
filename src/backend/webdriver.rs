use super::Backend;
use crate::error::Result;
use crate::types::{BackendKind, ScrapeResult, TargetOptions};
use async_trait::async_trait;
use std::time::Duration;

/// Full browser automation through a WebDriver server (chromedriver, geckodriver).
pub struct WebDriverBackend {
    #[cfg_attr(not(feature = "webdriver"), allow(dead_code))]
    server_url: String,
}

impl WebDriverBackend {
    pub fn new(server_url: String) -> Self {
        Self { server_url }
    }
}

#[async_trait]
impl Backend for WebDriverBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Browser
    }

    #[cfg(feature = "webdriver")]
    async fn fetch(
        &self,
        url: &str,
        target: &TargetOptions,
        timeout: Duration,
    ) -> Result<ScrapeResult> {
        use crate::error::Error;
        use crate::extract::extract_page_text;

        match tokio::time::timeout(timeout, driver::render(&self.server_url, url)).await {
            Ok(Ok((html, title))) => {
                let text = extract_page_text(&html, &target.selectors);
                Ok(ScrapeResult::new(url, text.content, title.clone())
                    .with_metadata("page_title", title))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Timeout(timeout)),
        }
    }

    #[cfg(not(feature = "webdriver"))]
    async fn fetch(
        &self,
        _url: &str,
        _target: &TargetOptions,
        _timeout: Duration,
    ) -> Result<ScrapeResult> {
        Err(crate::error::Error::BackendUnavailable(BackendKind::Browser))
    }
}

#[cfg(feature = "webdriver")]
mod driver {
    use crate::error::{Error, Result};
    use thirtyfour::ChromiumLikeCapabilities;
    use thirtyfour::prelude::*;

    fn browser_err(e: WebDriverError) -> Error {
        Error::Browser(e.to_string())
    }

    pub async fn render(server_url: &str, url: &str) -> Result<(String, String)> {
        let mut caps = DesiredCapabilities::chrome();
        caps.set_headless().map_err(browser_err)?;
        caps.set_no_sandbox().map_err(browser_err)?;
        caps.set_disable_gpu().map_err(browser_err)?;
        caps.set_disable_dev_shm_usage().map_err(browser_err)?;

        let driver = WebDriver::new(server_url, caps).await.map_err(browser_err)?;

        let result = async {
            driver.goto(url).await?;
            driver.find(By::Tag("body")).await?;
            let title = driver.title().await?;
            let html = driver.source().await?;
            Ok::<_, WebDriverError>((html, title))
        }
        .await;

        if let Err(e) = driver.quit().await {
            log::debug!("quitting webdriver session: {}", e);
        }
        result.map_err(browser_err)
    }
}
