//! Single-flight async initialization guard.
//!
//! `AsyncInitializer` runs a setup action at most once successfully. Concurrent
//! callers that arrive while an attempt is running wait for that same attempt and
//! all receive its outcome; a failed attempt leaves the guard uninitialized so the
//! next `initialize` call starts a fresh one. Nothing is ever retried automatically.
//!
//! **Interaction**: Owned by `RemoteToolClient` (guards `connect`) and by
//! `ToolkitAdapter` (guards `initialize`), each with its own instance.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

type Outcome<E> = Option<Result<(), E>>;

enum Phase<E> {
    Uninitialized,
    Initializing(watch::Receiver<Outcome<E>>),
    Ready,
}

struct Inner<E> {
    phase: Phase<E>,
    /// Bumped by every new attempt and by `reset`; a finishing attempt only
    /// writes its result back if the generation is still its own.
    generation: u64,
}

enum Begin<E> {
    Done,
    Wait(watch::Receiver<Outcome<E>>),
    Lead(watch::Sender<Outcome<E>>, u64),
}

/// Identifies one initialization attempt; see [`AsyncInitializer::is_current`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    generation: u64,
}

/// Guard ensuring an async setup action runs once, is safe under concurrent
/// invocation, and may be retried after failure.
///
/// The error type must be `Clone` so one failed attempt can be reported to every
/// caller awaiting it.
///
/// # Examples
///
/// ```
/// use stripe_agent_toolkit::AsyncInitializer;
///
/// # #[tokio::main]
/// # async fn main() {
/// let init: AsyncInitializer<String> = AsyncInitializer::new();
/// init.initialize(|| async { Ok(()) }).await.unwrap();
/// assert!(init.is_initialized());
/// // Second call is a no-op; the action is not run.
/// init.initialize(|| async { Err("not called".to_string()) }).await.unwrap();
/// # }
/// ```
pub struct AsyncInitializer<E> {
    inner: Mutex<Inner<E>>,
}

impl<E> Default for AsyncInitializer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> AsyncInitializer<E> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                phase: Phase::Uninitialized,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether an attempt has completed successfully (and `reset` has not been called since).
    pub fn is_initialized(&self) -> bool {
        matches!(self.lock().phase, Phase::Ready)
    }

    /// Clears both the initialized flag and any in-flight marker.
    ///
    /// Intended for explicit teardown only. The caller must make sure no
    /// attempt is running: an attempt that finishes after `reset` does not
    /// mark the guard initialized, but callers already waiting on it still
    /// receive its outcome.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.phase = Phase::Uninitialized;
    }

    fn begin(&self) -> Begin<E> {
        let mut inner = self.lock();
        match &inner.phase {
            Phase::Ready => Begin::Done,
            Phase::Initializing(outcome) => Begin::Wait(outcome.clone()),
            Phase::Uninitialized => {
                let (tx, rx) = watch::channel(None);
                inner.generation += 1;
                inner.phase = Phase::Initializing(rx);
                Begin::Lead(tx, inner.generation)
            }
        }
    }

    /// Whether `attempt` is still the latest one, i.e. no newer attempt began
    /// and `reset` was not called since it started.
    pub fn is_current(&self, attempt: Attempt) -> bool {
        self.lock().generation == attempt.generation
    }

    /// Clears the initialized flag only if it is set. Returns whether it was.
    ///
    /// Unlike [`reset`](Self::reset), this leaves an in-flight attempt alone.
    pub fn reset_if_initialized(&self) -> bool {
        let mut inner = self.lock();
        if !matches!(inner.phase, Phase::Ready) {
            return false;
        }
        inner.generation += 1;
        inner.phase = Phase::Uninitialized;
        true
    }

    fn settle(&self, generation: u64, succeeded: bool) {
        let mut inner = self.lock();
        if inner.generation == generation {
            inner.phase = if succeeded {
                Phase::Ready
            } else {
                Phase::Uninitialized
            };
        }
    }
}

impl<E: Clone> AsyncInitializer<E> {
    /// Runs `action` unless already initialized or an attempt is in flight.
    ///
    /// - Already initialized: returns `Ok(())` without calling `action`.
    /// - Attempt in flight: waits for it and returns its outcome; `action` is not called.
    /// - Otherwise: runs `action`. On success the guard is marked initialized for good;
    ///   on failure the in-flight marker is cleared (side effects of `action` are not
    ///   undone) and the error is returned to this caller and every waiter.
    ///
    /// If the running attempt's future is dropped before finishing, waiters start
    /// a new attempt with their own action.
    pub async fn initialize<F, Fut>(&self, action: F) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        self.initialize_attempt(|_| action()).await
    }

    /// Like [`initialize`](Self::initialize), but hands the action its
    /// [`Attempt`] so it can check [`is_current`](Self::is_current) before
    /// publishing side effects.
    pub async fn initialize_attempt<F, Fut>(&self, action: F) -> Result<(), E>
    where
        F: FnOnce(Attempt) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let (tx, generation) = loop {
            match self.begin() {
                Begin::Done => return Ok(()),
                Begin::Lead(tx, generation) => break (tx, generation),
                Begin::Wait(mut rx) => {
                    if let Some(result) = wait_outcome(&mut rx).await {
                        return result;
                    }
                }
            }
        };

        let mut abandon = AbandonGuard {
            initializer: self,
            generation,
            armed: true,
        };
        let result = action(Attempt { generation }).await;
        abandon.armed = false;
        self.settle(generation, result.is_ok());
        let _ = tx.send(Some(result.clone()));
        result
    }
}

/// Waits for the leader's outcome; `None` when the leader was dropped before finishing.
async fn wait_outcome<E: Clone>(rx: &mut watch::Receiver<Outcome<E>>) -> Option<Result<(), E>> {
    match rx.wait_for(Option::is_some).await {
        Ok(outcome) => (*outcome).clone(),
        Err(_) => None,
    }
}

/// Clears the in-flight marker if the leading attempt is cancelled mid-await.
struct AbandonGuard<'a, E> {
    initializer: &'a AsyncInitializer<E>,
    generation: u64,
    armed: bool,
}

impl<E> Drop for AbandonGuard<'_, E> {
    fn drop(&mut self) {
        if self.armed {
            self.initializer.settle(self.generation, false);
        }
    }
}
