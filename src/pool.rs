//! Shared connection and worker pool, reference counted.
//!
//! Creating a target store client is expensive (it typically owns a bundle of
//! transport connections), so every sink instance in the process shares one
//! client and one worker pool through a [`ResourceRegistry`]. The registry is
//! an explicit object constructed once per process and passed by reference;
//! tests build a fresh one instead of touching global state.
//!
//! Lifecycle: resources are built lazily on the first [`acquire`] and torn
//! down when the reference count returns to zero - the pool is drained with a
//! bounded grace period, then the connection is closed best-effort. All
//! transitions happen under one lock, so acquire/release races are fully
//! serialized and the invariant holds that the shared resources exist exactly
//! while the count is positive.
//!
//! [`acquire`]: ResourceRegistry::acquire

use crate::config::SinkConfig;
use crate::error::{Result, SinkError};
use crate::metrics;
use crate::target::TargetStore;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Grace period for draining the worker pool on final release.
const POOL_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

type Connector<S> = Box<dyn Fn(&SinkConfig) -> Result<S> + Send + Sync>;

/// Reference-counted holder of the shared target client and worker pool.
pub struct ResourceRegistry<S: TargetStore> {
    connector: Connector<S>,
    inner: Mutex<RegistryInner<S>>,
}

struct RegistryInner<S> {
    refs: usize,
    shared: Option<PoolState<S>>,
}

/// The resources themselves. Exists iff the reference count is positive.
struct PoolState<S> {
    runtime: Runtime,
    workers: Arc<Semaphore>,
    store: Arc<S>,
}

impl<S> PoolState<S> {
    fn handle(&self) -> SharedHandle<S> {
        SharedHandle {
            store: Arc::clone(&self.store),
            spawner: self.runtime.handle().clone(),
            workers: Arc::clone(&self.workers),
        }
    }
}

/// Cloneable view of the shared resources held by one acquirer.
///
/// Holding a handle does not pin the resources: the reference count does. A
/// handle used after the final [`release`](ResourceRegistry::release) will
/// see its spawned tasks cancelled rather than run.
pub struct SharedHandle<S> {
    store: Arc<S>,
    spawner: tokio::runtime::Handle,
    workers: Arc<Semaphore>,
}

impl<S> std::fmt::Debug for SharedHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedHandle").finish_non_exhaustive()
    }
}

impl<S> Clone for SharedHandle<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            spawner: self.spawner.clone(),
            workers: Arc::clone(&self.workers),
        }
    }
}

impl<S> SharedHandle<S> {
    /// The shared target store client.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Worker-slot semaphore bounding concurrently running batch writes.
    pub fn workers(&self) -> Arc<Semaphore> {
        Arc::clone(&self.workers)
    }

    /// Submit work to the shared pool.
    ///
    /// The queue is unbounded; the semaphore inside the spawned task is what
    /// limits actual parallelism. If the pool has already been torn down the
    /// task is cancelled and the returned handle resolves to a join error,
    /// which callers fold into a failed result.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.spawner.spawn(fut)
    }
}

impl<S: TargetStore> ResourceRegistry<S> {
    /// Create a registry. The connector builds the target store client on
    /// first acquire (and again after a full release/re-acquire cycle).
    pub fn new(connector: impl Fn(&SinkConfig) -> Result<S> + Send + Sync + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            inner: Mutex::new(RegistryInner {
                refs: 0,
                shared: None,
            }),
        }
    }

    /// Take a reference to the shared resources, constructing them if this is
    /// the first acquire.
    ///
    /// Construction failures propagate and leave the count untouched, so a
    /// later acquire retries from scratch.
    pub fn acquire(&self, config: &SinkConfig) -> Result<SharedHandle<S>> {
        let mut inner = self.lock();

        if inner.shared.is_none() {
            let threads = config.sink_threads;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(threads)
                .thread_name("replication-sink-worker")
                .enable_all()
                .build()
                .map_err(|e| SinkError::Pool(format!("failed to build worker pool: {e}")))?;
            let store = Arc::new((self.connector)(config)?);
            info!(
                endpoint = %config.endpoint,
                cluster_id = %config.cluster_id,
                threads,
                "created shared target connection and worker pool"
            );
            inner.shared = Some(PoolState {
                runtime,
                workers: Arc::new(Semaphore::new(threads)),
                store,
            });
        }

        inner.refs += 1;
        metrics::set_pool_refs(inner.refs);
        debug!(refs = inner.refs, "acquired shared resources");

        let state = inner
            .shared
            .as_ref()
            .ok_or_else(|| SinkError::Internal("pool state missing after construction".into()))?;
        Ok(state.handle())
    }

    /// Give back one reference. The final release tears the resources down.
    ///
    /// Blocks up to the drain grace period while the pool shuts down; call it
    /// from the host's lifecycle thread, never from a worker task. The caller
    /// is responsible for having drained its own in-flight batches first (a
    /// `replicate()` call only returns once its batches completed, so this
    /// holds whenever release follows the last replicate).
    pub fn release(&self) {
        let mut inner = self.lock();

        if inner.refs == 0 {
            warn!("release called with no outstanding acquires");
            return;
        }

        inner.refs -= 1;
        metrics::set_pool_refs(inner.refs);
        if inner.refs > 0 {
            debug!(refs = inner.refs, "released shared resources");
            return;
        }

        // Teardown runs under the lock: a racing acquire waits and then
        // constructs fresh resources.
        if let Some(state) = inner.shared.take() {
            teardown(state);
        }
    }

    /// Outstanding reference count.
    pub fn ref_count(&self) -> usize {
        self.lock().refs
    }

    /// Whether the shared resources currently exist.
    pub fn is_active(&self) -> bool {
        self.lock().shared.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner<S>> {
        // A poisoning panic can only have happened outside a state update
        // (refs and shared are each written in one step), so the data is
        // still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Best-effort teardown: nothing here propagates, there is no recovery path.
fn teardown<S: TargetStore>(state: PoolState<S>) {
    info!("closing shared target connection and worker pool");
    let PoolState {
        runtime,
        workers,
        store,
    } = state;

    // Wake queued tasks so they fail fast instead of parking forever.
    workers.close();

    let started = Instant::now();
    runtime.shutdown_timeout(POOL_DRAIN_TIMEOUT);
    if started.elapsed() >= POOL_DRAIN_TIMEOUT {
        warn!(
            timeout_secs = POOL_DRAIN_TIMEOUT.as_secs(),
            "worker pool did not drain within the grace period"
        );
    }

    if let Err(e) = store.close() {
        warn!(error = %e, "failed to close target store connection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::NoOpTargetStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_config() -> SinkConfig {
        SinkConfig::for_testing(1024, 1024)
    }

    #[test]
    fn test_acquire_builds_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let built_clone = Arc::clone(&built);
        let registry = ResourceRegistry::new(move |_| {
            built_clone.fetch_add(1, Ordering::SeqCst);
            Ok(NoOpTargetStore)
        });

        let _a = registry.acquire(&test_config()).unwrap();
        let _b = registry.acquire(&test_config()).unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(registry.ref_count(), 2);
        assert!(registry.is_active());
    }

    #[test]
    fn test_release_keeps_resources_until_last_reference() {
        let registry = ResourceRegistry::new(|_| Ok(NoOpTargetStore));

        for _ in 0..3 {
            registry.acquire(&test_config()).unwrap();
        }
        registry.release();
        registry.release();
        assert!(registry.is_active());
        assert_eq!(registry.ref_count(), 1);

        registry.release();
        assert!(!registry.is_active());
        assert_eq!(registry.ref_count(), 0);
    }

    #[test]
    fn test_reacquire_constructs_fresh_resources() {
        let built = Arc::new(AtomicUsize::new(0));
        let built_clone = Arc::clone(&built);
        let registry = ResourceRegistry::new(move |_| {
            built_clone.fetch_add(1, Ordering::SeqCst);
            Ok(NoOpTargetStore)
        });

        registry.acquire(&test_config()).unwrap();
        registry.release();
        registry.acquire(&test_config()).unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
        registry.release();
    }

    #[test]
    fn test_connector_failure_propagates_and_leaves_registry_reusable() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);
        let registry = ResourceRegistry::new(move |_| {
            if attempts_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(SinkError::Connect("target unreachable".to_string()))
            } else {
                Ok(NoOpTargetStore)
            }
        });

        let err = registry.acquire(&test_config()).unwrap_err();
        assert!(matches!(err, SinkError::Connect(_)));
        assert_eq!(registry.ref_count(), 0);
        assert!(!registry.is_active());

        // Second attempt succeeds with a fresh construction.
        assert!(registry.acquire(&test_config()).is_ok());
        assert_eq!(registry.ref_count(), 1);
        registry.release();
    }

    #[test]
    fn test_release_without_acquire_is_ignored() {
        let registry = ResourceRegistry::new(|_| Ok(NoOpTargetStore));
        registry.release();
        assert_eq!(registry.ref_count(), 0);

        // Registry still usable afterwards.
        registry.acquire(&test_config()).unwrap();
        assert_eq!(registry.ref_count(), 1);
        registry.release();
    }

    #[test]
    fn test_spawned_work_runs_on_pool() {
        let registry = ResourceRegistry::new(|_| Ok(NoOpTargetStore));
        let handle = registry.acquire(&test_config()).unwrap();

        let join = handle.spawn(async { 6 * 7 });
        let result = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(join)
            .unwrap();
        assert_eq!(result, 42);
        registry.release();
    }

    #[test]
    fn test_workers_semaphore_sized_from_config() {
        let registry = ResourceRegistry::new(|_| Ok(NoOpTargetStore));
        let handle = registry.acquire(&test_config()).unwrap();
        assert_eq!(handle.workers().available_permits(), 2);
        registry.release();
    }
}
