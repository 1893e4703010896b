//! Lazily loaded model state shared by every request of a service.
//!
//! The engine starts `Unloaded`. The first caller of [`InferenceEngine::ensure_ready`]
//! runs the loader on the blocking pool; concurrent callers wait on that same
//! attempt instead of starting their own. A failed load leaves the engine
//! `Unloaded` so the next request can try again. Once `Loaded`, it never goes back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::{Error, Result};

/// Builds a model. Called at most once per successful load, on a blocking thread.
pub trait ModelLoader<M: ?Sized>: Send + Sync + 'static {
    /// Identifier reported in responses and health checks
    fn model_name(&self) -> &str;

    fn load(&self) -> Result<Arc<M>>;
}

struct Loaded<M: ?Sized> {
    model: Arc<M>,
    loaded_at: DateTime<Utc>,
    load_duration: Duration,
}

/// Observable engine state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineState {
    Unloaded,
    Loaded {
        loaded_at: DateTime<Utc>,
        load_duration: Duration,
    },
}

impl EngineState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, EngineState::Loaded { .. })
    }
}

pub struct InferenceEngine<M: ?Sized> {
    inner: Arc<EngineInner<M>>,
}

struct EngineInner<M: ?Sized> {
    loader: Arc<dyn ModelLoader<M>>,
    model_name: String,
    state: OnceCell<Loaded<M>>,
}

impl<M: ?Sized + Send + Sync + 'static> InferenceEngine<M> {
    pub fn new(loader: Arc<dyn ModelLoader<M>>) -> Self {
        let model_name = loader.model_name().to_string();
        Self {
            inner: Arc::new(EngineInner {
                loader,
                model_name,
                state: OnceCell::new(),
            }),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.inner.model_name
    }

    pub fn state(&self) -> EngineState {
        match self.inner.state.get() {
            Some(loaded) => EngineState::Loaded {
                loaded_at: loaded.loaded_at,
                load_duration: loaded.load_duration,
            },
            None => EngineState::Unloaded,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.state.initialized()
    }

    /// Return the loaded model, loading it first if needed.
    ///
    /// The load runs on its own task, so a caller that gives up mid-load
    /// does not abandon it: the next caller picks up the same attempt.
    pub async fn ensure_ready(&self) -> Result<Arc<M>> {
        if let Some(loaded) = self.inner.state.get() {
            return Ok(loaded.model.clone());
        }

        let inner = self.inner.clone();
        tokio::spawn(async move { inner.load_once().await })
            .await
            .map_err(|e| Error::ModelLoad(format!("Task join error: {}", e)))?
    }
}

impl<M: ?Sized + Send + Sync + 'static> EngineInner<M> {
    async fn load_once(&self) -> Result<Arc<M>> {
        let loaded = self
            .state
            .get_or_try_init(|| async {
                info!("Loading model ({})...", self.model_name);
                let loader = self.loader.clone();
                let start = Instant::now();
                let model = match tokio::task::spawn_blocking(move || loader.load()).await {
                    Ok(Ok(model)) => Ok(model),
                    Ok(Err(Error::ModelLoad(msg))) => Err(Error::ModelLoad(msg)),
                    Ok(Err(other)) => Err(Error::ModelLoad(other.to_string())),
                    Err(e) => Err(Error::ModelLoad(format!("Task join error: {}", e))),
                };

                match model {
                    Ok(model) => {
                        let load_duration = start.elapsed();
                        info!(
                            "Model {} loaded in {:.1}s",
                            self.model_name,
                            load_duration.as_secs_f64()
                        );
                        Ok(Loaded {
                            model,
                            loaded_at: Utc::now(),
                            load_duration,
                        })
                    }
                    Err(e) => {
                        error!("Failed to load model {}: {}", self.model_name, e);
                        Err(e)
                    }
                }
            })
            .await?;

        Ok(loaded.model.clone())
    }
}
