//! Sensor listener interface
//!
//! Defines the listener trait the controller loop notifies and the registry
//! that holds registered listeners.

use crate::data::{SensorId, SensorValue};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use uuid::Uuid;

/// Handle for a registered sensor listener.
///
/// Uniquely identifies a listener subscription. Can be used to unsubscribe
/// from change notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SensorListenerHandle(pub String);

/// Listener trait for value changes
///
/// Called synchronously from the controller loop, once per changed id per
/// loop iteration. Implementations must hand the value off (channel, queue)
/// instead of doing blocking work. A panicking listener is logged and skipped.
pub trait SensorListener: Send + Sync {
    /// Called when a published value changes
    fn on_sensor_changed(&self, id: SensorId, value: SensorValue);
}

impl<F> SensorListener for F
where
    F: Fn(SensorId, SensorValue) + Send + Sync,
{
    fn on_sensor_changed(&self, id: SensorId, value: SensorValue) {
        self(id, value)
    }
}

/// Shared set of registered listeners
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Arc<RwLock<HashMap<String, Arc<dyn SensorListener>>>>,
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and return its handle
    pub fn register(&self, listener: Arc<dyn SensorListener>) -> SensorListenerHandle {
        let id = Uuid::new_v4().to_string();
        let handle = SensorListenerHandle(id.clone());
        self.listeners.write().insert(id, listener);
        handle
    }

    /// Remove a listener; returns true if it was registered
    pub fn unregister(&self, handle: &SensorListenerHandle) -> bool {
        self.listeners.write().remove(&handle.0).is_some()
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// True when nobody is listening
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Deliver one change to every listener
    ///
    /// Returns how many listeners panicked.
    pub fn notify(&self, id: SensorId, value: SensorValue) -> usize {
        // Clone out so listeners can (un)register from inside the callback
        let listeners: Vec<Arc<dyn SensorListener>> =
            self.listeners.read().values().cloned().collect();
        let mut failed = 0;
        for listener in listeners {
            let delivered =
                catch_unwind(AssertUnwindSafe(|| listener.on_sensor_changed(id, value)));
            if delivered.is_err() {
                tracing::error!("Listener panicked while handling {} = {}", id, value);
                failed += 1;
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_register_unregister_listener() {
        let registry = ListenerRegistry::new();
        let handle = registry.register(Arc::new(|_: SensorId, _: SensorValue| {}));
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister(&handle));
        assert!(!registry.unregister(&handle));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_notify_reaches_every_listener() {
        let registry = ListenerRegistry::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..2 {
            let calls = calls.clone();
            registry.register(Arc::new(move |id: SensorId, value: SensorValue| {
                calls.lock().push((id, value));
            }));
        }

        registry.notify(SensorId::Efficiency, SensorValue::Value(80));

        let calls = calls.lock();
        assert_eq!(calls.len(), 2);
        assert!(calls
            .iter()
            .all(|c| *c == (SensorId::Efficiency, SensorValue::Value(80))));
    }

    #[test]
    fn test_panicking_listener_does_not_stop_delivery() {
        let registry = ListenerRegistry::new();
        registry.register(Arc::new(|_: SensorId, _: SensorValue| {
            panic!("listener failure");
        }));
        let calls = Arc::new(Mutex::new(0));
        let sink = calls.clone();
        registry.register(Arc::new(move |_: SensorId, _: SensorValue| {
            *sink.lock() += 1;
        }));

        assert_eq!(registry.notify(SensorId::CoverState, SensorValue::Value(1)), 1);
        assert_eq!(registry.notify(SensorId::CoverState, SensorValue::Value(0)), 1);
        assert_eq!(*calls.lock(), 2);
        assert_eq!(registry.len(), 2);
    }
}
