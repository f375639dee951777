//! Callback registry
//!
//! Scripts report their result by calling back into the client. Each pending
//! callback is a one-shot channel filed under the correlation id the script
//! was sent with.

use ferry_core::dto::script::CallbackDelivery;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

/// Pending one-shot callbacks, shared between a connection and its pollers
#[derive(Debug, Clone, Default)]
pub struct CallbackRegistry {
    pending: Arc<Mutex<HashMap<String, oneshot::Sender<CallbackDelivery>>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<CallbackDelivery>>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a callback and returns the receiving end
    ///
    /// Registering the same id twice replaces the earlier registration, whose
    /// receiver then observes a closed channel.
    pub fn register(&self, correlation_id: &str) -> oneshot::Receiver<CallbackDelivery> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(correlation_id.to_string(), tx);
        rx
    }

    /// Delivers a callback, consuming its registration
    ///
    /// Returns false when nothing was waiting for it.
    pub fn deliver(&self, correlation_id: &str, delivery: CallbackDelivery) -> bool {
        match self.lock().remove(correlation_id) {
            Some(tx) => tx.send(delivery).is_ok(),
            None => false,
        }
    }

    /// Drops a registration without delivering anything
    pub fn cancel(&self, correlation_id: &str) -> bool {
        self.lock().remove(correlation_id).is_some()
    }

    /// Whether a live receiver is still waiting on this id
    pub fn is_pending(&self, correlation_id: &str) -> bool {
        let mut pending = self.lock();
        match pending.get(correlation_id) {
            Some(tx) if tx.is_closed() => {
                pending.remove(correlation_id);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
