// src/dag/context.rs

//! Cancellation context shared by a run and every callback it invokes.
//!
//! The scheduler only reads it to stop launching new units; interrupting
//! work that is already running is up to the callback (the shell runner
//! kills its child process, for example).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct RunContext {
    cancel: Arc<watch::Sender<bool>>,
    parent: Option<Arc<RunContext>>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            cancel: Arc::new(tx),
            parent: None,
        }
    }

    /// A context that is cancelled when either it or `self` is cancelled.
    /// Cancelling the child does not affect `self`.
    pub fn child(&self) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            cancel: Arc::new(tx),
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Mark the context cancelled. Idempotent; visible to every clone and
    /// every child.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow() || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// Resolves once this context or one of its ancestors is cancelled.
    pub fn cancelled(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let own = async {
                let mut rx = self.cancel.subscribe();
                // The sender lives as long as `self`, so this only returns on cancel.
                let _ = rx.wait_for(|cancelled| *cancelled).await;
            };

            match &self.parent {
                Some(parent) => {
                    tokio::select! {
                        _ = own => {}
                        _ = parent.cancelled() => {}
                    }
                }
                None => own.await,
            }
        })
    }
}
