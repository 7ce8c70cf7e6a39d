//! The notification hub fans status changes out to registered listeners.
//!
//! Listeners run concurrently and are isolated from each other: an error or a
//! panic in one listener is recorded in the [`DispatchReport`] and never stops
//! the others or fails the dispatch itself.

use crate::core::{Listener, StatusChange};
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Construction options for a [`NotificationHub`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubOptions {
    /// Refuse to register a listener that is already registered.
    pub reject_duplicates: bool,
}

/// Why a single listener failed during a dispatch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    #[error("listener failed: {0}")]
    Failed(String),

    #[error("listener panicked: {0}")]
    Panicked(String),
}

/// The result of one listener's invocation.
#[derive(Debug, Clone)]
pub struct ListenerOutcome {
    pub listener: String,
    pub result: Result<(), ListenerError>,
}

/// Settled outcomes of every listener invoked by one dispatch.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<ListenerOutcome>,
}

impl DispatchReport {
    pub fn invoked(&self) -> usize {
        self.outcomes.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Returns the listeners that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ListenerError)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            Ok(()) => None,
            Err(e) => Some((o.listener.as_str(), e)),
        })
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

/// One `listener: ok` or `listener: error` line per outcome, in dispatch order.
impl fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            match &outcome.result {
                Ok(()) => writeln!(f, "{}: ok", outcome.listener)?,
                Err(e) => writeln!(f, "{}: {}", outcome.listener, e)?,
            }
        }
        Ok(())
    }
}

/// Holds the listener registry and dispatches status changes to it.
#[derive(Default)]
pub struct NotificationHub {
    listeners: RwLock<Vec<Arc<dyn Listener>>>,
    options: HubOptions,
}

impl NotificationHub {
    /// Creates an empty hub.
    pub fn new(options: HubOptions) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            options,
        }
    }

    /// Appends `listener` to the registry.
    ///
    /// Returns `false` only when the hub rejects duplicates and the same
    /// listener instance is already registered.
    pub fn register(&self, listener: Arc<dyn Listener>) -> bool {
        let mut listeners = self.write();
        if self.options.reject_duplicates && listeners.iter().any(|l| same_listener(l, &listener)) {
            debug!(listener = listener.name(), "Ignoring duplicate listener registration");
            return false;
        }
        debug!(listener = listener.name(), "Registering listener");
        listeners.push(listener);
        true
    }

    /// Removes the first registration of this listener instance, if any.
    pub fn deregister(&self, listener: &Arc<dyn Listener>) -> bool {
        let mut listeners = self.write();
        match listeners.iter().position(|l| same_listener(l, listener)) {
            Some(index) => {
                listeners.remove(index);
                debug!(listener = listener.name(), "Deregistered listener");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Invokes every registered listener with `change` and waits for all of them.
    ///
    /// The registry is snapshotted when the call starts; listeners registered
    /// while a dispatch is running are picked up by the next one.
    #[instrument(skip_all, fields(report_id = %change.report_id, new_status = %change.new_status))]
    pub async fn dispatch(&self, change: &StatusChange) -> DispatchReport {
        let snapshot: Vec<Arc<dyn Listener>> = self.read().clone();
        metrics::counter!("status_change_dispatches_total").increment(1);
        debug!(listeners = snapshot.len(), "Dispatching status change");

        let invocations = snapshot.into_iter().map(|listener| async move {
            let result = AssertUnwindSafe(async { listener.handle(change).await })
                .catch_unwind()
                .await;
            let result = match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ListenerError::Failed(format!("{:#}", e))),
                Err(panic) => Err(ListenerError::Panicked(panic_message(panic))),
            };
            if let Err(e) = &result {
                warn!(listener = listener.name(), error = %e, "Listener failed to handle status change");
                metrics::counter!("listener_failures_total", "listener" => listener.name().to_string())
                    .increment(1);
            }
            ListenerOutcome {
                listener: listener.name().to_string(),
                result,
            }
        });

        DispatchReport {
            outcomes: join_all(invocations).await,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn Listener>>> {
        // A listener can't panic while the lock is held, so poisoning carries no torn state.
        self.listeners.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Arc<dyn Listener>>> {
        self.listeners.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Reference identity on the data pointer, ignoring vtables.
fn same_listener(a: &Arc<dyn Listener>, b: &Arc<dyn Listener>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
