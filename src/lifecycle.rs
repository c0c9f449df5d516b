//! Ownership and bring-up of the single shared engine instance.
//!
//! ```text
//! Uninitialized -> Loading -> Ready
//!                     ^   \
//!                     |    v
//!                     +-- Failed      (after the retry delay)
//! ```
//!
//! Only one loader runs at a time. The instance slot is guarded by a FIFO
//! mutex that queries hold across the foreign call, so teardown never races
//! an in-flight analysis.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::binding::{EngineAssets, EngineBinding, InstanceHandle};
use crate::constants::LIFECYCLE_EVENT_CAPACITY;
use crate::error::{MecabError, Result};
use crate::gate::ReadinessGate;
use crate::locator::{AssetKind, Location, ResourceLocator};
use crate::types::RetryPolicy;

/// Lifecycle state of the shared engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// No load has been attempted.
    Uninitialized,
    /// A load attempt is running.
    Loading,
    /// An instance exists and accepts queries.
    Ready,
    /// The last attempt failed; a retry may be pending.
    Failed,
}

/// Snapshot published to readiness waiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    /// Current state.
    pub state: EngineState,
    /// Attempts made by the current (or last) loader run.
    pub attempts: u32,
    /// Whether a loader is active.
    pub loading: bool,
    /// Message of the most recent load failure, cleared on success.
    pub last_error: Option<String>,
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self {
            state: EngineState::Uninitialized,
            attempts: 0,
            loading: false,
            last_error: None,
        }
    }
}

/// Advisory notifications for observers such as UI layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A load attempt started.
    Loading {
        /// 1-based attempt number within the loader run.
        attempt: u32,
    },
    /// The engine became ready.
    Ready {
        /// Attempt that succeeded.
        attempt: u32,
    },
    /// A load attempt failed.
    Failed {
        /// Attempt that failed.
        attempt: u32,
        /// Failure message.
        error: String,
        /// Delay before the next attempt; `None` when the loader gave up.
        retry_in: Option<Duration>,
    },
    /// The instance was destroyed by a reload or shutdown.
    Destroyed,
}

/// Resets the loader flag if a loader run ends without reaching a verdict,
/// for example when its task is aborted mid-attempt.
struct LoaderGuard<'a> {
    status: &'a watch::Sender<EngineStatus>,
}

impl<'a> LoaderGuard<'a> {
    fn new(status: &'a watch::Sender<EngineStatus>) -> Self {
        Self { status }
    }
}

impl Drop for LoaderGuard<'_> {
    fn drop(&mut self) {
        self.status.send_if_modified(|status| {
            if !status.loading {
                return false;
            }
            status.loading = false;
            if status.state == EngineState::Loading {
                status.state = EngineState::Failed;
            }
            true
        });
    }
}

/// Read-only view of the instance slot for the duration of one query.
pub(crate) struct InstanceGuard<'a> {
    slot: MutexGuard<'a, Option<InstanceHandle>>,
    ready: bool,
    binding: &'a dyn EngineBinding,
}

impl InstanceGuard<'_> {
    /// The instance, only while the lifecycle is [`EngineState::Ready`].
    pub(crate) fn instance(&self) -> Option<InstanceHandle> {
        if self.ready {
            *self.slot
        } else {
            None
        }
    }

    pub(crate) fn binding(&self) -> &dyn EngineBinding {
        self.binding
    }
}

/// Owns the engine instance and drives it to [`EngineState::Ready`].
pub struct EngineLifecycle {
    binding: Arc<dyn EngineBinding>,
    locator: Arc<dyn ResourceLocator>,
    create_args: String,
    retry: RetryPolicy,
    slot: Mutex<Option<InstanceHandle>>,
    status: watch::Sender<EngineStatus>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl EngineLifecycle {
    /// Creates an uninitialized lifecycle. Nothing is loaded until
    /// [`Self::start`], [`Self::load`] or [`Self::reload`] runs.
    pub fn new(
        binding: Arc<dyn EngineBinding>,
        locator: Arc<dyn ResourceLocator>,
        create_args: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        let (status, _) = watch::channel(EngineStatus::default());
        let (events, _) = broadcast::channel(LIFECYCLE_EVENT_CAPACITY);
        Self {
            binding,
            locator,
            create_args: create_args.into(),
            retry,
            slot: Mutex::new(None),
            status,
            events,
        }
    }

    /// Current state.
    pub fn state(&self) -> EngineState {
        self.status.borrow().state
    }

    /// Current status snapshot.
    pub fn status(&self) -> EngineStatus {
        self.status.borrow().clone()
    }

    /// Subscribes to lifecycle events. Events sent before subscribing are
    /// not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Gate that resolves once the engine is ready.
    pub fn readiness(&self) -> ReadinessGate {
        ReadinessGate::new(self.status.subscribe())
    }

    /// Version reported by the binding, if any.
    pub fn engine_version(&self) -> Option<String> {
        self.binding.version()
    }

    /// Spawns the loader on the current tokio runtime.
    ///
    /// Returns `None` when the engine is already ready or another loader is
    /// active.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<Result<()>>> {
        if !self.claim(false) {
            debug!(state = ?self.state(), "engine start skipped");
            return None;
        }
        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            let guard = LoaderGuard::new(&this.status);
            this.drive(guard).await
        }))
    }

    /// Loads the engine inline, or waits for the active loader to settle.
    pub async fn load(&self) -> Result<()> {
        if self.claim(false) {
            return self.drive(LoaderGuard::new(&self.status)).await;
        }
        self.wait_settled().await
    }

    /// Destroys the current instance (best effort) and loads a fresh one.
    ///
    /// When a loader is already active this only waits for it.
    pub async fn reload(&self) -> Result<()> {
        if !self.claim(true) {
            return self.wait_settled().await;
        }
        let guard = LoaderGuard::new(&self.status);
        self.teardown().await;
        self.drive(guard).await
    }

    /// Destroys the current instance and returns to
    /// [`EngineState::Uninitialized`].
    pub async fn shutdown(&self) -> Result<()> {
        if !self.claim(true) {
            return Err(MecabError::InvalidArgument(
                "cannot shut down while a load is in progress".to_string(),
            ));
        }
        let _guard = LoaderGuard::new(&self.status);
        self.teardown().await;
        self.status.send_modify(|status| *status = EngineStatus::default());
        info!("engine shut down");
        Ok(())
    }

    /// Locks the slot. `Ready` is only published while the slot is locked,
    /// so the state read here cannot run ahead of the slot contents.
    pub(crate) async fn lock_instance(&self) -> InstanceGuard<'_> {
        let slot = self.slot.lock().await;
        let ready = self.status.borrow().state == EngineState::Ready;
        InstanceGuard {
            slot,
            ready,
            binding: self.binding.as_ref(),
        }
    }

    fn claim(&self, allow_ready: bool) -> bool {
        self.status.send_if_modified(|status| {
            if status.loading || (!allow_ready && status.state == EngineState::Ready) {
                return false;
            }
            status.loading = true;
            status.state = EngineState::Loading;
            status.attempts = 0;
            true
        })
    }

    async fn wait_settled(&self) -> Result<()> {
        let mut receiver = self.status.subscribe();
        let status = receiver
            .wait_for(|status| !status.loading)
            .await
            .map_err(|_| MecabError::Closed)?
            .clone();
        match status.state {
            EngineState::Ready => Ok(()),
            _ => Err(MecabError::LoadFailure(
                status
                    .last_error
                    .unwrap_or_else(|| format!("engine is {:?}", status.state)),
            )),
        }
    }

    async fn drive(&self, _guard: LoaderGuard<'_>) -> Result<()> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            self.status.send_modify(|status| {
                status.state = EngineState::Loading;
                status.attempts = attempts;
            });
            self.emit(LifecycleEvent::Loading { attempt: attempts });
            debug!(attempt = attempts, "loading engine");

            match self.try_load().await {
                Ok(instance) => {
                    let mut slot = self.slot.lock().await;
                    *slot = Some(instance);
                    self.status.send_modify(|status| {
                        status.state = EngineState::Ready;
                        status.loading = false;
                        status.last_error = None;
                    });
                    drop(slot);
                    self.emit(LifecycleEvent::Ready { attempt: attempts });
                    info!(attempt = attempts, ?instance, "engine ready");
                    return Ok(());
                }
                Err(error) => {
                    let message = error.to_string();
                    let retry_in = self
                        .retry
                        .allows_another_attempt(attempts)
                        .then_some(self.retry.delay);
                    self.status.send_modify(|status| {
                        status.state = EngineState::Failed;
                        status.last_error = Some(message.clone());
                        if retry_in.is_none() {
                            status.loading = false;
                        }
                    });
                    self.emit(LifecycleEvent::Failed {
                        attempt: attempts,
                        error: message.clone(),
                        retry_in,
                    });

                    let Some(delay) = retry_in else {
                        warn!(
                            attempt = attempts,
                            error = %message,
                            "engine load failed, giving up"
                        );
                        return Err(MecabError::RetriesExhausted {
                            attempts,
                            last_error: message,
                        });
                    };
                    warn!(
                        attempt = attempts,
                        error = %message,
                        retry_in_ms = delay.as_millis() as u64,
                        "engine load failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn try_load(&self) -> Result<InstanceHandle> {
        let binary = self
            .resolve(AssetKind::EngineBinary)
            .await?
            .ok_or_else(|| {
                MecabError::LoadFailure("no location for the engine binary".to_string())
            })?;
        let assets = EngineAssets {
            binary,
            data: self.resolve(AssetKind::DataBlob).await?,
            user_dictionary: self.resolve(AssetKind::UserDictionary).await?,
        };

        self.binding.load(&assets.binary).map_err(into_load_failure)?;
        let args = assets
            .create_args(&self.create_args)
            .map_err(into_load_failure)?;
        debug!(binary = %assets.binary, ?args, "creating engine instance");
        self.binding.create(&args).ok_or_else(|| {
            MecabError::LoadFailure(format!(
                "engine returned a null handle for arguments {args:?}"
            ))
        })
    }

    async fn resolve(&self, asset: AssetKind) -> Result<Option<Location>> {
        self.locator.resolve(asset).await.map_err(|error| {
            MecabError::LoadFailure(format!("failed to resolve {asset}: {error}"))
        })
    }

    async fn teardown(&self) {
        let mut slot = self.slot.lock().await;
        let Some(instance) = slot.take() else {
            return;
        };
        if let Err(error) = self.binding.destroy(instance) {
            warn!(%error, ?instance, "failed to destroy engine instance");
        }
        self.emit(LifecycleEvent::Destroyed);
        debug!(?instance, "engine instance destroyed");
    }

    fn emit(&self, event: LifecycleEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for EngineLifecycle {
    fn drop(&mut self) {
        if let Some(instance) = self.slot.get_mut().take() {
            if let Err(error) = self.binding.destroy(instance) {
                warn!(%error, ?instance, "failed to destroy engine instance on drop");
            }
        }
    }
}

fn into_load_failure(error: MecabError) -> MecabError {
    match error {
        MecabError::LoadFailure(_) => error,
        other => MecabError::LoadFailure(other.to_string()),
    }
}
