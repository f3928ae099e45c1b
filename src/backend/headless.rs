use super::Backend;
use crate::error::Result;
use crate::types::{BackendKind, ScrapeResult, TargetOptions};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Subresources the headless page refuses to load.
#[cfg_attr(not(feature = "headless"), allow(dead_code))]
const BLOCKED_RESOURCES: &[&str] = &[
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.svg", "*.webp", "*.css", "*.woff", "*.woff2",
    "*.ttf",
];

/// Headless Chrome over the DevTools protocol.
pub struct HeadlessBackend {
    #[cfg_attr(not(feature = "headless"), allow(dead_code))]
    chrome_executable: Option<PathBuf>,
}

impl HeadlessBackend {
    pub fn new(chrome_executable: Option<PathBuf>) -> Self {
        Self { chrome_executable }
    }
}

#[async_trait]
impl Backend for HeadlessBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Headless
    }

    #[cfg(feature = "headless")]
    async fn fetch(
        &self,
        url: &str,
        target: &TargetOptions,
        timeout: Duration,
    ) -> Result<ScrapeResult> {
        use crate::error::Error;
        use crate::extract::extract_page_text;

        match tokio::time::timeout(timeout, chrome::render(url, self.chrome_executable.as_ref())).await {
            Ok(Ok(page)) => {
                let text = extract_page_text(&page.html, &target.selectors);
                let title = page.title.unwrap_or(text.title);
                Ok(ScrapeResult::new(url, text.content, title.clone())
                    .with_metadata("page_title", title))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Timeout(timeout)),
        }
    }

    #[cfg(not(feature = "headless"))]
    async fn fetch(
        &self,
        _url: &str,
        _target: &TargetOptions,
        _timeout: Duration,
    ) -> Result<ScrapeResult> {
        Err(crate::error::Error::BackendUnavailable(BackendKind::Headless))
    }
}

/// Counts requests opened on `started` and closed on `settled` until `window`
/// passes with none open, or `max_wait` runs out. Returns how many were still open.
#[cfg_attr(not(feature = "headless"), allow(dead_code))]
async fn network_idle<S, D>(started: S, settled: D, window: Duration, max_wait: Duration) -> usize
where
    S: Stream,
    D: Stream,
{
    tokio::pin!(started, settled);
    let deadline = Instant::now() + max_wait;
    let mut in_flight: usize = 0;
    loop {
        tokio::select! {
            Some(_) = started.next() => in_flight += 1,
            Some(_) = settled.next() => in_flight = in_flight.saturating_sub(1),
            _ = sleep(window) => {
                if in_flight == 0 {
                    return 0;
                }
            }
        }
        if Instant::now() >= deadline {
            return in_flight;
        }
    }
}

#[cfg(feature = "headless")]
mod chrome {
    use super::{network_idle, PathBuf, BLOCKED_RESOURCES};
    use crate::backend::USER_AGENT;
    use crate::error::{Error, Result};
    use chromiumoxide::listeners::EventStream;
    use chromiumoxide::Page;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::network::{
        EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
        SetBlockedUrLsParams,
    };
    use futures::StreamExt;
    use std::time::Duration;

    /// The network counts as idle after this long with no request in flight.
    const IDLE_WINDOW: Duration = Duration::from_millis(500);
    /// Pages that keep connections busy (polling, streaming) stop waiting here.
    const MAX_IDLE_WAIT: Duration = Duration::from_secs(10);

    pub struct RenderedPage {
        pub html: String,
        pub title: Option<String>,
    }

    fn browser_err(e: impl std::fmt::Display) -> Error {
        Error::Browser(e.to_string())
    }

    pub async fn render(url: &str, chrome_executable: Option<&PathBuf>) -> Result<RenderedPage> {
        let mut builder = BrowserConfig::builder().args([
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            format!("--user-agent={}", USER_AGENT),
        ]);
        if let Some(path) = chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(browser_err)?;

        let (mut browser, mut handler) = Browser::launch(config).await.map_err(browser_err)?;
        let handle = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let result = async {
            let page = browser.new_page("about:blank").await.map_err(browser_err)?;
            page.execute(EnableParams::default()).await.map_err(browser_err)?;
            page.execute(SetBlockedUrLsParams::new(
                BLOCKED_RESOURCES.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            ))
            .await
            .map_err(browser_err)?;

            let events = NetworkEvents::listen(&page).await?;
            page.goto(url).await.map_err(browser_err)?;
            page.wait_for_navigation().await.map_err(browser_err)?;
            events.idle().await;

            let title = page.get_title().await.map_err(browser_err)?;
            let html = page.content().await.map_err(browser_err)?;
            Ok(RenderedPage { html, title })
        }
        .await;

        if let Err(e) = browser.close().await {
            log::debug!("closing browser: {}", e);
        }
        handle.abort();
        result
    }

    struct NetworkEvents {
        sent: EventStream<EventRequestWillBeSent>,
        finished: EventStream<EventLoadingFinished>,
        failed: EventStream<EventLoadingFailed>,
    }

    impl NetworkEvents {
        /// Subscribes before navigation so no request goes uncounted.
        async fn listen(page: &Page) -> Result<Self> {
            Ok(Self {
                sent: page.event_listener().await.map_err(browser_err)?,
                finished: page.event_listener().await.map_err(browser_err)?,
                failed: page.event_listener().await.map_err(browser_err)?,
            })
        }

        async fn idle(self) {
            let settled = futures::stream::select(self.finished.map(drop), self.failed.map(drop));
            let open = network_idle(self.sent, settled, IDLE_WINDOW, MAX_IDLE_WAIT).await;
            if open > 0 {
                log::debug!("network still busy ({} requests), reading page anyway", open);
            }
        }
    }
}
