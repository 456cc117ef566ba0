use std::future::Future;
use std::time::Duration;

use futures::stream::BoxStream;

use crate::error::AppError;

/// Stream of resolved URLs for the network responses a page observes.
pub type ResponseStream = BoxStream<'static, String>;

/// Launches browser instances (execution contexts).
///
/// The one seam between the orchestration engine and a concrete browser.
/// Implementations carry their own launch options and must be cheap to
/// clone.
pub trait EngineLauncher: Send + Sync + Clone {
    type Instance: BrowserInstance;

    fn launch(&self) -> impl Future<Output = Result<Self::Instance, AppError>> + Send;
}

/// One running browser instance, reusable across many isolated pages.
pub trait BrowserInstance: Send + Sync {
    type Page: BrowserPage;

    /// Open a fresh, isolated page on this instance.
    fn new_page(&self) -> impl Future<Output = Result<Self::Page, AppError>> + Send;

    /// Shut the instance down, releasing its OS resources.
    fn close(self) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// An isolated browsing unit within an instance. One per task.
pub trait BrowserPage: Send + Sync {
    /// Subscribe to the URLs of network responses observed on this page.
    ///
    /// Must be called before [`navigate`](Self::navigate) so a response
    /// arriving early in the page load is not missed.
    fn responses(&self) -> impl Future<Output = Result<ResponseStream, AppError>> + Send;

    /// Drive the page to `url` and wait for a quiescent network state,
    /// bounded by `timeout`.
    fn navigate(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Discard the page and its per-page resources.
    fn close(self) -> impl Future<Output = Result<(), AppError>> + Send;
}
