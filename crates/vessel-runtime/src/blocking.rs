use std::future::Future;
use std::sync::mpsc;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::{VesselError, VesselResult};

/// Bridges async vessel operations to synchronous call sites.
///
/// The operation runs to completion on the bridge's runtime; only the
/// calling thread blocks, parked on a single-completion channel. The
/// async executor itself is never blocked, so the bridge cannot deadlock
/// the operations it is driving. Success and failure pass through
/// unchanged — the caller sees the exact error the async operation
/// produced.
///
/// There is no timeout: a blocking call waits as long as its async
/// counterpart runs.
pub struct BlockingBridge {
    handle: Handle,
    // Owned runtime, if the bridge was not given an external handle.
    runtime: Option<Runtime>,
}

impl BlockingBridge {
    /// Create a bridge with its own single-worker runtime.
    pub fn new() -> VesselResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("vessel-bridge")
            .enable_all()
            .build()
            .map_err(|e| VesselError::Bridge(e.to_string()))?;
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    /// Create a bridge that spawns onto an existing runtime.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle,
            runtime: None,
        }
    }

    /// Run `fut` to completion and block until its result is available.
    ///
    /// Refuses to block a runtime worker thread unless `allow_nested` is
    /// set: parking a worker starves the very executor that cooperative
    /// callers share, the async-world version of blocking the main thread.
    /// With `allow_nested` on a bridge built from an external handle, the
    /// caller must not be the bridge runtime's only worker, or the parked
    /// thread is the one the spawned future needs.
    pub(crate) fn run<T, F>(&self, allow_nested: bool, fut: F) -> VesselResult<T>
    where
        T: Send + 'static,
        F: Future<Output = VesselResult<T>> + Send + 'static,
    {
        if !allow_nested && Handle::try_current().is_ok() {
            return Err(VesselError::Bridge(
                "blocking call from inside an async context; \
                 use the async API or enable allow_blocking_in_async"
                    .to_string(),
            ));
        }

        let (tx, rx) = mpsc::sync_channel(1);
        self.handle.spawn(async move {
            let _ = tx.send(fut.await);
        });
        rx.recv()
            .map_err(|_| VesselError::Bridge("operation dropped before completion".to_string()))?
    }
}

impl Drop for BlockingBridge {
    fn drop(&mut self) {
        // An owned runtime cannot be dropped from inside an async context;
        // shut it down without waiting instead.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for BlockingBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingBridge")
            .field("owned_runtime", &self.runtime.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vessel_codec::CodecError;

    #[test]
    fn runs_future_and_returns_result() {
        let bridge = BlockingBridge::new().unwrap();
        let out = bridge.run(false, async { Ok(21 * 2) }).unwrap();
        assert_eq!(out, 42);
    }

    #[test]
    fn preserves_error_kind() {
        let bridge = BlockingBridge::new().unwrap();
        let result: VesselResult<()> = bridge.run(false, async {
            Err(VesselError::Codec(CodecError::Malformed("bad".into())))
        });
        assert!(matches!(
            result,
            Err(VesselError::Codec(CodecError::Malformed(_)))
        ));
    }

    #[test]
    fn waits_for_slow_operations() {
        let bridge = BlockingBridge::new().unwrap();
        let out = bridge
            .run(false, async {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok("done")
            })
            .unwrap();
        assert_eq!(out, "done");
    }

    #[tokio::test]
    async fn refuses_nested_blocking_by_default() {
        let bridge = BlockingBridge::new().unwrap();
        let result: VesselResult<()> = bridge.run(false, async { Ok(()) });
        assert!(matches!(result, Err(VesselError::Bridge(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn nested_blocking_can_be_allowed() {
        let bridge = BlockingBridge::new().unwrap();
        let out = bridge.run(true, async { Ok(7) }).unwrap();
        assert_eq!(out, 7);
    }

    #[test]
    fn with_handle_spawns_on_external_runtime() {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let bridge = BlockingBridge::with_handle(runtime.handle().clone());
        let out = bridge.run(false, async { Ok(1) }).unwrap();
        assert_eq!(out, 1);
    }
}
