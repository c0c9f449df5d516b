use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::binding::EngineBinding;
use crate::decoder::OutputDecoder;
use crate::error::Result;
use crate::gate::ReadinessGate;
use crate::lifecycle::{EngineLifecycle, EngineState, EngineStatus, LifecycleEvent};
use crate::locator::{LocalResourceLocator, ResourceLocator};
use crate::model::QueryResult;
use crate::native::NativeEngine;
use crate::pipeline::QueryPipeline;
use crate::types::MecabConfig;

/// Shared MeCab client: one engine instance, many callers.
///
/// Cheap to clone; clones share the instance, the readiness signal and the
/// query queue.
#[derive(Clone)]
pub struct Mecab {
    lifecycle: Arc<EngineLifecycle>,
    pipeline: Arc<QueryPipeline>,
}

impl Mecab {
    /// Builds a client over an arbitrary binding and locator.
    ///
    /// Nothing is loaded yet; call [`Self::start`] or [`Self::load`].
    pub fn new(
        binding: Arc<dyn EngineBinding>,
        locator: Arc<dyn ResourceLocator>,
        config: MecabConfig,
    ) -> Result<Self> {
        config.validate()?;
        let lifecycle = Arc::new(EngineLifecycle::new(
            binding,
            locator,
            config.create_args,
            config.retry,
        ));
        let pipeline = Arc::new(QueryPipeline::new(
            lifecycle.clone(),
            config.buffer,
            OutputDecoder::new(config.decoder),
        ));
        Ok(Self {
            lifecycle,
            pipeline,
        })
    }

    /// Client over the system MeCab library, located through
    /// `MECAB_LIBRARY_PATH`, `MECAB_DICDIR` and `MECAB_USERDIC` or the
    /// platform defaults.
    pub fn native(config: MecabConfig) -> Result<Self> {
        Self::new(
            Arc::new(NativeEngine::new()),
            Arc::new(LocalResourceLocator),
            config,
        )
    }

    /// Native client with default configuration, loaded before returning.
    ///
    /// Gives up after the first failed attempt instead of retrying.
    pub async fn init() -> Result<Self> {
        let mecab = Self::native(MecabConfig::default().with_max_attempts(1))?;
        mecab.load().await?;
        Ok(mecab)
    }

    /// Spawns the background loader. Returns `None` if the engine is
    /// already ready or loading.
    pub fn start(&self) -> Option<JoinHandle<Result<()>>> {
        self.lifecycle.start()
    }

    /// Loads inline, or waits for the active loader.
    pub async fn load(&self) -> Result<()> {
        self.lifecycle.load().await
    }

    /// Waits until the engine is ready. See [`ReadinessGate::wait_ready`].
    pub async fn wait_ready(&self) -> Result<()> {
        self.readiness().wait_ready().await
    }

    /// Analyzes one text.
    ///
    /// ```no_run
    /// # async fn demo() -> mecab_rs::Result<()> {
    /// let mecab = mecab_rs::Mecab::native(Default::default())?;
    /// mecab.start();
    /// mecab.wait_ready().await?;
    /// let result = mecab.analyze("すもももももももものうち").await?;
    /// for token in &result.recognized {
    ///     println!("{}\t{}", token.surface, token.part_of_speech());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn analyze(&self, text: &str) -> Result<QueryResult> {
        self.pipeline.analyze(text).await
    }

    /// Destroys the current instance and loads a new one.
    pub async fn reload(&self) -> Result<()> {
        self.lifecycle.reload().await
    }

    /// Destroys the instance and returns to [`EngineState::Uninitialized`].
    pub async fn shutdown(&self) -> Result<()> {
        self.lifecycle.shutdown().await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.lifecycle.state()
    }

    /// Current status snapshot.
    pub fn status(&self) -> EngineStatus {
        self.lifecycle.status()
    }

    /// Subscribes to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.lifecycle.subscribe()
    }

    /// Readiness gate shared by all clones.
    pub fn readiness(&self) -> ReadinessGate {
        self.lifecycle.readiness()
    }

    /// Engine version, if the binding reports one.
    pub fn version(&self) -> Option<String> {
        self.lifecycle.engine_version()
    }
}

impl std::fmt::Debug for Mecab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mecab")
            .field("status", &self.lifecycle.status())
            .finish_non_exhaustive()
    }
}
