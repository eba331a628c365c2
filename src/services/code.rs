//! # Callback abstraction and closure-backed implementation.
//!
//! This module defines the [`Code`] trait (async, cancelable) and a
//! convenient closure-backed implementation [`CodeFn`]. The common handle
//! type is [`CodeRef`], an `Arc<dyn Code>` suitable for sharing across the
//! engine.
//!
//! A callback receives a [`WorkerContext`] and should watch it for
//! cancellation and signal notifications to stop cooperatively during
//! shutdown.

use std::{future::Future, sync::Arc, sync::Mutex};

use async_trait::async_trait;

use crate::error::CodeError;
use crate::services::context::WorkerContext;

/// # Shared handle to a service callback.
pub type CodeRef = Arc<dyn Code>;

/// # In-process service body.
///
/// `Code` is the callback side of a [`Service`](crate::Service): an async
/// routine invoked with the worker's [`WorkerContext`]. Returning `Ok` ends
/// the worker; returning `Err` makes the supervisor run it again while the
/// engine scope is live.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use procvisor::{Code, CodeError, WorkerContext};
///
/// struct Banner;
///
/// #[async_trait]
/// impl Code for Banner {
///     async fn call(&self, ctx: WorkerContext) -> Result<(), CodeError> {
///         ctx.println(format!("listening on {}", ctx.serve_addr()));
///         ctx.cancelled().await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Code: Send + Sync + 'static {
    /// Executes one run of the service body.
    async fn call(&self, ctx: WorkerContext) -> Result<(), CodeError>;
}

/// # Closure-backed callback implementation.
///
/// [`CodeFn`] wraps a closure `F: FnMut(WorkerContext) -> Fut`. The closure
/// sits behind a [`Mutex`] so `call(&self, ..)` can invoke an `FnMut`; the
/// lock is held only while the future is created, never while it runs.
/// Use [`CodeFn::arc`] for a one-liner that returns a [`CodeRef`].
///
/// If the closure captures state that the returned future also touches, that
/// state needs its own synchronization; the `CodeFn` mutex guards creation
/// only.
pub struct CodeFn<F, Fut>
where
    F: FnMut(WorkerContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), CodeError>> + Send + 'static,
{
    func: Mutex<F>,
}

impl<F, Fut> CodeFn<F, Fut>
where
    F: FnMut(WorkerContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), CodeError>> + Send + 'static,
{
    /// Creates a new closure-backed callback.
    ///
    /// Prefer [`CodeFn::arc`] when you immediately need a [`CodeRef`].
    pub fn new(func: F) -> Self {
        Self {
            func: Mutex::new(func),
        }
    }

    /// Creates the callback and returns it as a shared handle.
    pub fn arc(func: F) -> CodeRef {
        Arc::new(Self::new(func))
    }
}

#[async_trait]
impl<F, Fut> Code for CodeFn<F, Fut>
where
    F: FnMut(WorkerContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), CodeError>> + Send + 'static,
{
    async fn call(&self, ctx: WorkerContext) -> Result<(), CodeError> {
        let fut = {
            let mut f = self.func.lock().map_err(|_| CodeError::Fail {
                reason: "callback mutex poisoned".into(),
            })?;
            (f)(ctx)
        };
        fut.await
    }
}
