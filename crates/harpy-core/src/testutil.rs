//! Test utilities: a scriptable mock browser engine.
//!
//! Handwritten mocks for dependency injection in unit tests, shaped like
//! the real engine implementation. All shared state sits behind
//! `Arc<Mutex<_>>` or atomics so tests can assert on recorded calls.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::oneshot;

use crate::error::AppError;
use crate::traits::{BrowserInstance, BrowserPage, EngineLauncher, ResponseStream};

// ---------------------------------------------------------------------------
// PageScript
// ---------------------------------------------------------------------------

/// Scripted behavior for one visit to one target URL.
///
/// The default script is an idle page: navigation settles immediately and
/// no responses are ever observed.
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    /// (gap, url) emissions; each gap is relative to the previous emission,
    /// starting when navigation begins.
    responses: Vec<(Duration, String)>,
    nav_delay: Duration,
    nav_error: Option<String>,
}

impl PageScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a response URL `gap` after the previous emission.
    pub fn emit_after(mut self, gap: Duration, url: &str) -> Self {
        self.responses.push((gap, url.to_string()));
        self
    }

    /// Navigation settles only after `delay`.
    pub fn nav_after(mut self, delay: Duration) -> Self {
        self.nav_delay = delay;
        self
    }

    /// Navigation fails with this message instead of settling.
    pub fn nav_error(mut self, message: &str) -> Self {
        self.nav_error = Some(message.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// MockEngine
// ---------------------------------------------------------------------------

#[derive(Default)]
struct EngineState {
    /// Per-target script queues; one script consumed per visit. Visits with
    /// no queued script observe an idle page.
    scripts: Mutex<HashMap<String, VecDeque<PageScript>>>,
    /// Each pending failure makes one launch call fail.
    launch_failures: Mutex<VecDeque<AppError>>,
    /// Each pending failure makes one page-open call fail, across instances.
    page_open_failures: Mutex<VecDeque<AppError>>,
    fail_instance_close: AtomicBool,
    fail_page_close: AtomicBool,

    launched: AtomicUsize,
    instances_closed: AtomicUsize,
    pages_open: AtomicUsize,
    max_pages_open: AtomicUsize,
    pages_closed: AtomicUsize,
    pages_per_instance: Mutex<HashMap<usize, usize>>,
    visits: Mutex<HashMap<String, usize>>,
}

/// Mock browser engine with scriptable pages and recorded calls.
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<EngineState>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a script for the next visit to `target`.
    pub fn script(self, target: &str, script: PageScript) -> Self {
        self.state
            .scripts
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .push_back(script);
        self
    }

    /// Make one launch call fail with `error`.
    pub fn with_launch_failure(self, error: AppError) -> Self {
        self.state.launch_failures.lock().unwrap().push_back(error);
        self
    }

    /// Make one page-open call fail with `error`.
    pub fn with_page_open_failure(self, error: AppError) -> Self {
        self.state.page_open_failures.lock().unwrap().push_back(error);
        self
    }

    /// Make every instance close fail.
    pub fn with_instance_close_failure(self) -> Self {
        self.state.fail_instance_close.store(true, Ordering::SeqCst);
        self
    }

    /// Make every page close fail.
    pub fn with_page_close_failure(self) -> Self {
        self.state.fail_page_close.store(true, Ordering::SeqCst);
        self
    }

    /// Instances launched successfully so far.
    pub fn launched(&self) -> usize {
        self.state.launched.load(Ordering::SeqCst)
    }

    pub fn instances_closed(&self) -> usize {
        self.state.instances_closed.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.state.pages_closed.load(Ordering::SeqCst)
    }

    /// High-water mark of simultaneously open pages.
    pub fn max_open_pages(&self) -> usize {
        self.state.max_pages_open.load(Ordering::SeqCst)
    }

    /// Pages ever opened on the instance with the given launch index.
    pub fn pages_for_instance(&self, index: usize) -> usize {
        self.state
            .pages_per_instance
            .lock()
            .unwrap()
            .get(&index)
            .copied()
            .unwrap_or(0)
    }

    /// Navigations performed against `target`, over all attempts.
    pub fn visits(&self, target: &str) -> usize {
        self.state
            .visits
            .lock()
            .unwrap()
            .get(target)
            .copied()
            .unwrap_or(0)
    }
}

impl EngineLauncher for MockEngine {
    type Instance = MockInstance;

    async fn launch(&self) -> Result<MockInstance, AppError> {
        if let Some(error) = self.state.launch_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let index = self.state.launched.fetch_add(1, Ordering::SeqCst);
        Ok(MockInstance {
            state: Arc::clone(&self.state),
            index,
        })
    }
}

// ---------------------------------------------------------------------------
// MockInstance
// ---------------------------------------------------------------------------

/// One mock browser instance.
pub struct MockInstance {
    state: Arc<EngineState>,
    index: usize,
}

impl MockInstance {
    /// Launch-order identity of this instance within its engine.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl BrowserInstance for MockInstance {
    type Page = MockPage;

    async fn new_page(&self) -> Result<MockPage, AppError> {
        if let Some(error) = self.state.page_open_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        *self
            .state
            .pages_per_instance
            .lock()
            .unwrap()
            .entry(self.index)
            .or_insert(0) += 1;
        let open = self.state.pages_open.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_pages_open.fetch_max(open, Ordering::SeqCst);

        let (script_tx, script_rx) = oneshot::channel();
        Ok(MockPage {
            state: Arc::clone(&self.state),
            script_tx: Mutex::new(Some(script_tx)),
            script_rx: Mutex::new(Some(script_rx)),
        })
    }

    async fn close(self) -> Result<(), AppError> {
        self.state.instances_closed.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_instance_close.load(Ordering::SeqCst) {
            return Err(AppError::BrowserError("instance close refused".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockPage
// ---------------------------------------------------------------------------

/// One mock page.
///
/// The script for a visit is only known once `navigate` sees the target
/// URL, so the response stream handed out earlier waits on a channel for it
/// before emitting, mirroring a real page where traffic follows navigation.
pub struct MockPage {
    state: Arc<EngineState>,
    script_tx: Mutex<Option<oneshot::Sender<PageScript>>>,
    script_rx: Mutex<Option<oneshot::Receiver<PageScript>>>,
}

impl BrowserPage for MockPage {
    async fn responses(&self) -> Result<ResponseStream, AppError> {
        let script_rx = self.script_rx.lock().unwrap().take();
        let stream = futures::stream::once(async move {
            let script = match script_rx {
                Some(rx) => rx.await.unwrap_or_default(),
                None => PageScript::default(),
            };
            futures::stream::iter(script.responses).then(|(gap, url)| async move {
                tokio::time::sleep(gap).await;
                url
            })
        })
        .flatten()
        .boxed();
        Ok(stream)
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AppError> {
        let script = self
            .state
            .scripts
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_default();
        *self
            .state
            .visits
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(0) += 1;

        if let Some(tx) = self.script_tx.lock().unwrap().take() {
            let _ = tx.send(script.clone());
        }

        if script.nav_delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(AppError::NavigationError(format!(
                "navigation to {url} did not settle within {}ms",
                timeout.as_millis()
            )));
        }
        tokio::time::sleep(script.nav_delay).await;
        match script.nav_error {
            Some(message) => Err(AppError::NavigationError(message)),
            None => Ok(()),
        }
    }

    async fn close(self) -> Result<(), AppError> {
        self.state.pages_open.fetch_sub(1, Ordering::SeqCst);
        self.state.pages_closed.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_page_close.load(Ordering::SeqCst) {
            return Err(AppError::BrowserError("page close refused".into()));
        }
        Ok(())
    }
}
