use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::{EnableParams, EventResponseReceived};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use harpy_core::{AppError, BrowserInstance, BrowserPage, EngineLauncher, LaunchProfile, ResponseStream};
use tokio::task::JoinHandle;

/// Launches headless Chromium instances over the Chrome DevTools Protocol.
///
/// One launcher is cloned into every pool slot; each [`launch`] call starts
/// an independent Chromium process with its own CDP connection, so pages on
/// different instances never share a renderer.
///
/// [`launch`]: EngineLauncher::launch
#[derive(Clone)]
pub struct ChromiumLauncher {
    profile: LaunchProfile,
}

impl ChromiumLauncher {
    pub fn new(profile: LaunchProfile) -> Self {
        Self { profile }
    }

    fn build_config(&self) -> Result<BrowserConfig, AppError> {
        let mut builder = BrowserConfig::builder().disable_default_args();

        if let Some(bin) = self
            .profile
            .executable
            .clone()
            .or_else(Self::find_chrome_binary)
        {
            tracing::debug!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        if self.profile.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        builder
            .args(self.profile.args.clone())
            .build()
            .map_err(|e| AppError::BrowserError(format!("browser config: {e}")))
    }

    /// Tries to locate the real Chrome/Chromium binary.
    ///
    /// On systems where Chromium is installed via **snap**, the wrapper at
    /// `/snap/bin/chromium` strips unknown CLI flags, breaking headless
    /// mode. We look for the real binary inside the snap first, then fall
    /// back to well-known system paths. If nothing is found we return
    /// `None` and let `chromiumoxide` do its own lookup.
    fn find_chrome_binary() -> Option<PathBuf> {
        // An explicit override always wins.
        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        let candidates: &[&str] = &[
            // Snap (Ubuntu default)
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            // Flatpak
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            // Common apt / manual installs
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ];

        candidates.iter().map(PathBuf::from).find(|p| p.exists())
    }
}

impl EngineLauncher for ChromiumLauncher {
    type Instance = ChromiumInstance;

    async fn launch(&self) -> Result<ChromiumInstance, AppError> {
        let config = self.build_config()?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::BrowserError(format!("failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to
        // work; the loop ends once the browser disconnects.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!(error = %e, "Browser CDP handler error");
                    break;
                }
            }
        });

        Ok(ChromiumInstance {
            browser,
            handler_task,
        })
    }
}

/// One running Chromium process plus its CDP message pump.
pub struct ChromiumInstance {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserInstance for ChromiumInstance {
    type Page = ChromiumPage;

    async fn new_page(&self) -> Result<ChromiumPage, AppError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::PageOpenError(e.to_string()))?;
        Ok(ChromiumPage { page })
    }

    async fn close(mut self) -> Result<(), AppError> {
        let closed = self.browser.close().await;
        // Reap the child process so a slow shutdown cannot leave a zombie.
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        closed
            .map(|_| ())
            .map_err(|e| AppError::BrowserError(format!("failed to close browser: {e}")))
    }
}

/// An isolated tab on one Chromium instance.
pub struct ChromiumPage {
    page: Page,
}

impl BrowserPage for ChromiumPage {
    async fn responses(&self) -> Result<ResponseStream, AppError> {
        // The Network domain is off by default; without it no response
        // events are delivered at all.
        self.page
            .execute(EnableParams::default())
            .await
            .map_err(|e| AppError::PageOpenError(format!("network domain: {e}")))?;

        let events = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| AppError::PageOpenError(format!("response listener: {e}")))?;

        Ok(events.map(|event| event.response.url.clone()).boxed())
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AppError> {
        let settled = tokio::time::timeout(timeout, async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await;

        match settled {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(AppError::NavigationError(e.to_string())),
            Err(_) => Err(AppError::NavigationError(format!(
                "did not settle within {}ms",
                timeout.as_millis()
            ))),
        }
    }

    async fn close(self) -> Result<(), AppError> {
        self.page
            .close()
            .await
            .map_err(|e| AppError::BrowserError(format!("failed to close page: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_profile_builds_a_config() {
        let launcher = ChromiumLauncher::new(LaunchProfile::default());
        // Config assembly must not require a reachable binary.
        launcher.build_config().unwrap();
    }

    #[test]
    fn explicit_executable_is_honoured() {
        let profile = LaunchProfile::default().with_executable("/opt/chrome/chrome");
        let launcher = ChromiumLauncher::new(profile);
        launcher.build_config().unwrap();
    }

    /// Requires a local Chromium install. Run with:
    ///   cargo test -p harpy-client -- --ignored
    #[tokio::test]
    #[ignore]
    async fn live_launch_navigate_and_observe() {
        let launcher = ChromiumLauncher::new(LaunchProfile::default());
        let instance = launcher.launch().await.unwrap();

        let page = instance.new_page().await.unwrap();
        let mut responses = page.responses().await.unwrap();
        page.navigate("https://example.com", Duration::from_secs(20))
            .await
            .unwrap();

        let first = tokio::time::timeout(Duration::from_secs(10), responses.next())
            .await
            .expect("a response event within 10s")
            .expect("stream still open");
        assert!(first.starts_with("http"));

        page.close().await.unwrap();
        instance.close().await.unwrap();
    }
}
