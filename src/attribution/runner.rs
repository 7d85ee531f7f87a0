//! Headless automation runner.
//!
//! Opens an invisible browser tab on a reverse-image-search URL, waits for
//! the page to truly settle (see [`super::settle`]), polls the rendered
//! document until the engine's readiness probe passes, then parses. The
//! whole invocation is bounded by the engine's hard ceiling and always
//! resolves; internal failures and timeouts degrade to an empty list.
//!
//! Exactly one tab/browser is owned per invocation and is closed on every
//! exit path.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    EventFrameStartedLoading, EventFrameStoppedLoading,
};
use chromiumoxide::listeners::EventStream;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::time::{sleep, sleep_until, timeout, Instant};
use tracing::{debug, warn};

use super::config::AttributionConfig;
use super::engines::ReverseEngine;
use super::error::AttributionError;
use super::settle::{NavEvent, SettleMachine, TimerAction};
use super::types::CandidateRecord;

/// How often the rendered document is re-captured during the poll phase.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Host-side view of one automated tab: its navigation lifecycle events and
/// the currently rendered document. The production implementation wraps a
/// CDP page; tests script one.
#[async_trait]
pub trait TabDriver: Send {
    /// Next navigation event. `None` means the tab is gone.
    async fn next_event(&mut self) -> Option<NavEvent>;
    /// Rendered HTML of the document right now.
    async fn content(&mut self) -> Result<String, AttributionError>;
}

/// Wait for settle, poll for results, parse. Driver-agnostic so the timing
/// behavior is testable without a browser; callers bound it with the
/// engine's hard ceiling.
pub async fn drive(
    driver: &mut (impl TabDriver + ?Sized),
    engine: ReverseEngine,
    settle: Duration,
    poll_budget: Duration,
) -> Vec<CandidateRecord> {
    let mut machine = SettleMachine::new();
    let mut settle_deadline: Option<Instant> = None;

    // Phase 1: quiescence. A settle timer only counts when no new load
    // started after it was armed.
    loop {
        tokio::select! {
            event = driver.next_event() => match event {
                Some(event) => match machine.on_event(event) {
                    TimerAction::Cancel => settle_deadline = None,
                    TimerAction::Restart => settle_deadline = Some(Instant::now() + settle),
                },
                None => {
                    debug!(engine = engine.name(), "Tab closed before settling");
                    return Vec::new();
                }
            },
            () = wait_for(settle_deadline) => {
                if machine.is_settle_valid() {
                    break;
                }
                settle_deadline = None;
            }
        }
    }

    // Phase 2: poll the rendered document until results populate, within
    // the poll budget. Parsing happens either way: a partially populated
    // page still beats nothing.
    let poll_deadline = Instant::now() + poll_budget;
    loop {
        match driver.content().await {
            Ok(html) if engine.ready(&html) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(engine = engine.name(), "Failed to read tab content: {e}");
                return Vec::new();
            }
        }
        if Instant::now() >= poll_deadline {
            debug!(engine = engine.name(), "Poll budget exhausted, parsing anyway");
            break;
        }
        sleep(POLL_INTERVAL).await;
    }

    // Phase 3: small fixed buffer for lazy-loaded tiles, then parse.
    sleep(engine.lazy_buffer()).await;
    match driver.content().await {
        Ok(html) => engine.parse(&html),
        Err(e) => {
            warn!(engine = engine.name(), "Failed to read tab content: {e}");
            Vec::new()
        }
    }
}

/// Sleeps until the deadline, or forever when none is armed.
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Seam the pipeline uses to invoke reverse-image automation, so tests can
/// inject scripted engines instead of a live browser.
#[async_trait]
pub trait TabSearcher: Send + Sync {
    /// Run one engine against one image. Never fails; worst case is empty.
    async fn search(&self, engine: ReverseEngine, image_url: &str) -> Vec<CandidateRecord>;
}

#[async_trait]
impl TabSearcher for HeadlessRunner {
    async fn search(&self, engine: ReverseEngine, image_url: &str) -> Vec<CandidateRecord> {
        self.run(engine, image_url).await
    }
}

/// Production runner driving a real headless Chromium tab.
pub struct HeadlessRunner {
    config: AttributionConfig,
}

impl HeadlessRunner {
    /// Create a runner with the given configuration.
    #[must_use]
    pub const fn new(config: AttributionConfig) -> Self {
        Self { config }
    }

    /// Run one reverse-image search. Always resolves within the engine's
    /// hard ceiling; every failure mode degrades to an empty list.
    pub async fn run(&self, engine: ReverseEngine, image_url: &str) -> Vec<CandidateRecord> {
        let total = engine.total(&self.config);
        let started = Instant::now();

        let launched = match timeout(total, self.open_tab(engine, image_url)).await {
            Ok(Ok(launched)) => launched,
            Ok(Err(e)) => {
                warn!(engine = engine.name(), "Browser launch failed: {e}");
                return Vec::new();
            }
            Err(_) => {
                warn!(engine = engine.name(), "Hard timeout during browser launch");
                return Vec::new();
            }
        };
        let (mut browser, handler_task, mut driver) = launched;

        let remaining = total.saturating_sub(started.elapsed());
        let settle = engine.settle(&self.config);
        let records = match timeout(
            remaining,
            drive(&mut driver, engine, settle, self.config.poll_budget),
        )
        .await
        {
            Ok(records) => records,
            Err(_) => {
                warn!(engine = engine.name(), "Hard timeout, returning empty");
                Vec::new()
            }
        };

        // Cleanup on every path; close failures are not interesting.
        if let Err(e) = browser.close().await {
            debug!("Browser close error (non-fatal): {e}");
        }
        handler_task.abort();
        records
    }

    async fn open_tab(
        &self,
        engine: ReverseEngine,
        image_url: &str,
    ) -> Result<(Browser, tokio::task::JoinHandle<()>, CdpTabDriver), AttributionError> {
        let exe = find_chrome_executable().ok_or(AttributionError::BrowserUnavailable)?;
        let config = BrowserConfig::builder()
            .chrome_executable(exe)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--hide-scrollbars")
            .arg("--mute-audio")
            .arg(format!("--user-agent={}", self.config.random_user_agent()))
            .build()
            .map_err(AttributionError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AttributionError::Browser(e.to_string()))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler error: {e}");
                }
            }
        });

        let target = engine.target_url(image_url);
        let result = async {
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| AttributionError::Browser(e.to_string()))?;
            // Listeners must exist before navigation so the first "loading"
            // is not missed.
            let started = page
                .event_listener::<EventFrameStartedLoading>()
                .await
                .map_err(|e| AttributionError::Browser(e.to_string()))?;
            let stopped = page
                .event_listener::<EventFrameStoppedLoading>()
                .await
                .map_err(|e| AttributionError::Browser(e.to_string()))?;
            page.goto(target.as_str())
                .await
                .map_err(|e| AttributionError::Browser(e.to_string()))?;
            Ok(CdpTabDriver {
                page,
                started,
                stopped,
            })
        }
        .await;

        match result {
            Ok(driver) => Ok((browser, handler_task, driver)),
            Err(e) => {
                handler_task.abort();
                Err(e)
            }
        }
    }
}

/// [`TabDriver`] over a live CDP page.
struct CdpTabDriver {
    page: Page,
    started: EventStream<EventFrameStartedLoading>,
    stopped: EventStream<EventFrameStoppedLoading>,
}

#[async_trait]
impl TabDriver for CdpTabDriver {
    async fn next_event(&mut self) -> Option<NavEvent> {
        tokio::select! {
            event = self.started.next() => event.map(|_| NavEvent::Loading),
            event = self.stopped.next() => event.map(|_| NavEvent::Complete),
        }
    }

    async fn content(&mut self) -> Result<String, AttributionError> {
        self.page
            .content()
            .await
            .map_err(|e| AttributionError::Browser(e.to_string()))
    }
}

/// Find a usable Chromium-family executable: explicit env override first,
/// then a PATH scan, then well-known install locations.
fn find_chrome_executable() -> Option<String> {
    if let Ok(path) = std::env::var("CHROME_EXECUTABLE") {
        if Path::new(&path).exists() {
            return Some(path);
        }
    }

    let candidates = [
        "chromium",
        "chromium-browser",
        "google-chrome",
        "chrome",
        "brave-browser",
    ];
    if let Ok(path_var) = std::env::var("PATH") {
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    let known = [
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/usr/bin/google-chrome",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];
    known
        .iter()
        .find(|c| Path::new(c).exists())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Fixture with enough off-Google anchors for the Lens readiness probe.
    const READY_HTML: &str = r#"
        <a href="https://x.com/alice/status/1"><h3>Post by Alice Doe on X</h3></a>
        <a href="https://site-a.example.com/1">Artwork one</a>
        <a href="https://site-b.example.com/2">Artwork two</a>
        <a href="https://site-c.example.com/3">Artwork three</a>
    "#;

    /// Driver that replays a scripted event timeline, then stays open.
    struct ScriptedDriver {
        events: VecDeque<(Duration, NavEvent)>,
        html: &'static str,
    }

    impl ScriptedDriver {
        fn new(events: Vec<(Duration, NavEvent)>, html: &'static str) -> Self {
            Self {
                events: events.into(),
                html,
            }
        }
    }

    #[async_trait]
    impl TabDriver for ScriptedDriver {
        async fn next_event(&mut self) -> Option<NavEvent> {
            match self.events.pop_front() {
                Some((delay, event)) => {
                    sleep(delay).await;
                    Some(event)
                }
                // A real tab's event stream stays open until the tab closes.
                None => std::future::pending().await,
            }
        }

        async fn content(&mut self) -> Result<String, AttributionError> {
            Ok(self.html.to_string())
        }
    }

    const SETTLE: Duration = Duration::from_secs(2);
    const POLL: Duration = Duration::from_secs(8);

    #[tokio::test(start_paused = true)]
    async fn test_drive_waits_out_settle_window() {
        let mut driver =
            ScriptedDriver::new(vec![(Duration::ZERO, NavEvent::Complete)], READY_HTML);

        let started = Instant::now();
        let records = drive(&mut driver, ReverseEngine::Lens, SETTLE, POLL).await;

        assert!(!records.is_empty());
        // Settle window plus the lazy-load buffer must both have elapsed.
        assert!(started.elapsed() >= SETTLE + ReverseEngine::Lens.lazy_buffer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_reload_defers_to_second_settle_window() {
        // complete@0 arms t=2s; reload@1s cancels; complete@1.5s re-arms
        // t=3.5s. Parsing must not happen before the second window.
        let mut driver = ScriptedDriver::new(
            vec![
                (Duration::ZERO, NavEvent::Complete),
                (Duration::from_secs(1), NavEvent::Loading),
                (Duration::from_millis(500), NavEvent::Complete),
            ],
            READY_HTML,
        );

        let started = Instant::now();
        let records = drive(&mut driver, ReverseEngine::Lens, SETTLE, POLL).await;

        assert!(!records.is_empty());
        assert!(started.elapsed() >= Duration::from_millis(3500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_never_settling_target_hits_ceiling_empty() {
        // Loading forever: the caller's hard ceiling is the only way out.
        let mut driver =
            ScriptedDriver::new(vec![(Duration::ZERO, NavEvent::Loading)], READY_HTML);

        let ceiling = Duration::from_secs(25);
        let records = timeout(ceiling, drive(&mut driver, ReverseEngine::Lens, SETTLE, POLL))
            .await
            .unwrap_or_default();

        assert!(records.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_parses_after_poll_budget_even_if_never_ready() {
        let mut driver = ScriptedDriver::new(
            vec![(Duration::ZERO, NavEvent::Complete)],
            "<html><body>interstitial</body></html>",
        );

        let started = Instant::now();
        let records = drive(&mut driver, ReverseEngine::Lens, SETTLE, POLL).await;

        // Nothing to extract, but the call still resolved after the budget.
        assert!(records.is_empty());
        assert!(started.elapsed() >= SETTLE + POLL);
    }

    #[test]
    fn test_headless_runner_usable_behind_searcher_seam() {
        use crate::attribution::config::AttributionConfig;
        use std::sync::Arc;

        let runner = HeadlessRunner::new(AttributionConfig::default());
        let _searcher: Arc<dyn TabSearcher> = Arc::new(runner);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_closed_tab_resolves_empty() {
        struct ClosedDriver;

        #[async_trait]
        impl TabDriver for ClosedDriver {
            async fn next_event(&mut self) -> Option<NavEvent> {
                None
            }
            async fn content(&mut self) -> Result<String, AttributionError> {
                Err(AttributionError::Browser("tab gone".to_string()))
            }
        }

        let records = drive(&mut ClosedDriver, ReverseEngine::Lens, SETTLE, POLL).await;
        assert!(records.is_empty());
    }
}
