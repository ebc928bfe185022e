//! Lazy, memoised engine acquisition.
//!
//! Binding pdfium loads a ~30 MB shared library and initialises it. That must
//! happen once per process, and never twice concurrently. The loader keeps a
//! single slot that moves through three states:
//!
//! ```text
//! Idle ──first call──▶ Loading(shared future) ──ok──▶ Ready(Arc<Engine>)
//!   ▲                          │
//!   └────────────err───────────┘
//! ```
//!
//! Every caller that arrives while the slot is `Loading` awaits a clone of
//! the same [`Shared`] future, so they all observe the same outcome. Only a
//! success is cached; after a failure the slot returns to `Idle` and the next
//! call starts a fresh attempt.
//!
//! The acquisition runs as its own task and settles the slot when it
//! finishes, so a caller that stops waiting (a timeout, a dropped request)
//! never leaves the slot stuck on a stale outcome.
//!
//! The mutex only guards the slot transitions and is never held across an
//! `.await`.

use super::{EngineFactory, RenderEngine};
use crate::error::LoadError;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

type LoadFuture<E> = Shared<BoxFuture<'static, Result<Arc<E>, LoadError>>>;

enum LoadState<E> {
    Idle,
    Loading(LoadFuture<E>),
    Ready(Arc<E>),
}

type Slot<E> = Arc<Mutex<LoadState<E>>>;

/// Memoises the engine produced by an [`EngineFactory`].
///
/// Construct one at start-up and hand it (behind an `Arc`) to every
/// [`crate::Converter`] that should share the engine.
pub struct EngineLoader<F: EngineFactory> {
    factory: Arc<F>,
    state: Slot<F::Engine>,
}

impl<F: EngineFactory> EngineLoader<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory: Arc::new(factory),
            state: Arc::new(Mutex::new(LoadState::Idle)),
        }
    }

    /// Return the engine, acquiring it on first use.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn ensure_loaded(&self) -> Result<Arc<F::Engine>, LoadError> {
        let pending = {
            let mut state = lock(&self.state);

            // An attempt whose task was cancelled (its runtime shut down)
            // completes with an error without settling the slot.
            if let LoadState::Loading(fut) = &*state {
                if let Some(Err(e)) = fut.peek() {
                    debug!("Discarding finished engine load ({}); retrying", e);
                    *state = LoadState::Idle;
                }
            }

            match &*state {
                LoadState::Ready(engine) => return Ok(Arc::clone(engine)),
                LoadState::Loading(fut) => {
                    debug!("Engine load already in flight; awaiting it");
                    fut.clone()
                }
                LoadState::Idle => {
                    let fut = self.start_acquisition();
                    *state = LoadState::Loading(fut.clone());
                    fut
                }
            }
        };

        pending.await
    }

    /// `true` once an engine has been loaded successfully.
    pub fn is_ready(&self) -> bool {
        matches!(&*lock(&self.state), LoadState::Ready(_))
    }

    /// Try to load the engine and report whether it is usable.
    pub async fn probe(&self) -> bool {
        match self.ensure_loaded().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Engine probe failed: {}", e);
                false
            }
        }
    }

    /// Name of the loaded engine, loading it if necessary.
    pub async fn engine_name(&self) -> Result<String, LoadError> {
        let engine = self.ensure_loaded().await?;
        Ok(engine.name().to_string())
    }

    fn start_acquisition(&self) -> LoadFuture<F::Engine> {
        let factory = Arc::clone(&self.factory);
        let slot = Arc::clone(&self.state);

        let task = tokio::spawn(async move {
            info!("Loading PDF engine");
            let outcome = match tokio::task::spawn_blocking(move || factory.acquire()).await {
                Ok(acquired) => acquired.map(Arc::new),
                Err(e) => Err(LoadError::new(format!(
                    "engine initialisation task failed: {e}"
                ))),
            };

            let mut state = lock(&slot);
            *state = match &outcome {
                Ok(engine) => {
                    info!("PDF engine ready: {}", engine.name());
                    LoadState::Ready(Arc::clone(engine))
                }
                Err(e) => {
                    warn!("PDF engine failed to load: {}", e);
                    LoadState::Idle
                }
            };
            outcome
        });

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(LoadError::new(format!("engine load task failed: {e}"))),
            }
        }
        .boxed()
        .shared()
    }
}

fn lock<E>(slot: &Mutex<LoadState<E>>) -> MutexGuard<'_, LoadState<E>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
