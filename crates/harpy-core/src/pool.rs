use futures::future;

use crate::error::AppError;
use crate::traits::{BrowserInstance, EngineLauncher};

/// Fixed-size set of ready browser instances.
///
/// Owned by the extractor. Tasks borrow instances by index for the duration
/// of one extraction and never take ownership; instances are destroyed only
/// at pool teardown.
pub struct ContextPool<I> {
    instances: Vec<I>,
}

impl<I: BrowserInstance> ContextPool<I> {
    pub fn new() -> Self {
        Self {
            instances: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Borrow the instance owning pool slot `task_index % len`.
    ///
    /// Panics on an empty pool; callers initialize first.
    pub fn slot(&self, task_index: usize) -> &I {
        &self.instances[task_index % self.instances.len()]
    }

    /// Launch exactly `size` instances concurrently and store them.
    ///
    /// Reuses the existing set when the pool is already up. All-or-nothing
    /// otherwise: if any launch fails, the instances that did come up are
    /// closed best-effort, the pool stays empty, and the first error is
    /// returned wrapped as a pool initialization failure.
    pub async fn initialize<E>(&mut self, launcher: &E, size: usize) -> Result<(), AppError>
    where
        E: EngineLauncher<Instance = I>,
    {
        if !self.instances.is_empty() {
            tracing::debug!(size = self.instances.len(), "Reusing initialized pool");
            return Ok(());
        }

        tracing::debug!(size, "Launching browser instances");
        let launches = future::join_all((0..size).map(|_| launcher.launch())).await;

        let mut instances = Vec::with_capacity(size);
        let mut first_error = None;
        for result in launches {
            match result {
                Ok(instance) => instances.push(instance),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => tracing::debug!(error = %e, "Additional launch failure"),
            }
        }

        if let Some(error) = first_error {
            tracing::warn!(
                launched = instances.len(),
                requested = size,
                error = %error,
                "Pool initialization failed, rolling back partial set"
            );
            Self::close_all(instances).await;
            return Err(AppError::PoolInitError(error.to_string()));
        }

        self.instances = instances;
        Ok(())
    }

    /// Close every instance concurrently and clear the pool.
    ///
    /// Individual close failures are logged and swallowed so one dead
    /// instance cannot hold the rest of the pool open.
    pub async fn close(&mut self) {
        if self.instances.is_empty() {
            return;
        }
        let instances = std::mem::take(&mut self.instances);
        tracing::debug!(count = instances.len(), "Closing context pool");
        Self::close_all(instances).await;
    }

    async fn close_all(instances: Vec<I>) {
        future::join_all(instances.into_iter().map(|instance| async {
            if let Err(e) = instance.close().await {
                tracing::warn!(error = %e, "Failed to close browser instance");
            }
        }))
        .await;
    }
}

impl<I: BrowserInstance> Default for ContextPool<I> {
    fn default() -> Self {
        Self::new()
    }
}
