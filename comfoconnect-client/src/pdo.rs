//! Process-data subscription manager
//!
//! Tracks which sensors have local subscribers and fans incoming samples out
//! to them. The bridge-side subscription is managed by the caller: the first
//! local subscriber triggers it, removing the last one cancels it, so the
//! bridge sees at most one subscription per PDO id.

use std::collections::HashMap;
use std::sync::Arc;

use comfoconnect_registry::{Sensor, SensorValue};
use parking_lot::Mutex;

/// Subscriber callback: `(sensor, decoded value)`.
pub type SensorCallback = Arc<dyn Fn(&'static Sensor, SensorValue) + Send + Sync>;

struct Subscription {
    sensor: &'static Sensor,
    callbacks: Vec<SensorCallback>,
}

/// Subscriber bookkeeping for one session
#[derive(Clone, Default)]
pub struct SubscriptionManager {
    inner: Arc<Mutex<HashMap<u16, Subscription>>>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber for a sensor.
    ///
    /// Returns true when this created the subscription, i.e. the caller must
    /// request the PDO from the bridge.
    pub fn add(&self, sensor: &'static Sensor, callback: SensorCallback) -> bool {
        let mut inner = self.inner.lock();
        match inner.get_mut(&sensor.id) {
            Some(subscription) => {
                subscription.callbacks.push(callback);
                false
            }
            None => {
                inner.insert(
                    sensor.id,
                    Subscription {
                        sensor,
                        callbacks: vec![callback],
                    },
                );
                true
            }
        }
    }

    /// Drop every subscriber of a sensor.
    ///
    /// Returns true when a subscription existed, i.e. the caller must cancel
    /// the PDO on the bridge.
    pub fn remove(&self, id: u16) -> bool {
        self.inner.lock().remove(&id).is_some()
    }

    /// Whether a sensor currently has subscribers
    pub fn is_subscribed(&self, id: u16) -> bool {
        self.inner.lock().contains_key(&id)
    }

    /// The sensors with active subscriptions (for re-registration on connect)
    pub fn sensors(&self) -> Vec<&'static Sensor> {
        self.inner
            .lock()
            .values()
            .map(|subscription| subscription.sensor)
            .collect()
    }

    /// Decode a sample and deliver it to every subscriber of the PDO.
    ///
    /// Callbacks run with no lock held, so a callback may (un)subscribe.
    /// Samples for unsubscribed PDO ids are logged and dropped.
    pub fn dispatch(&self, pdid: u16, data: &[u8]) {
        let delivery = {
            let inner = self.inner.lock();
            inner
                .get(&pdid)
                .map(|subscription| (subscription.sensor, subscription.callbacks.clone()))
        };
        let Some((sensor, callbacks)) = delivery else {
            log::warn!("Dropping sample for unknown pdo {pdid}");
            return;
        };
        match sensor.decode(data) {
            Ok(value) => {
                for callback in &callbacks {
                    callback(sensor, value.clone());
                }
            }
            Err(e) => log::error!("Failed to decode sample for {}: {e}", sensor.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comfoconnect_registry::sensors::{
        sensor, SENSOR_FAN_EXHAUST_DUTY, SENSOR_TEMPERATURE_SUPPLY,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn supply() -> &'static Sensor {
        sensor(SENSOR_TEMPERATURE_SUPPLY).unwrap()
    }

    #[test]
    fn test_first_subscriber_creates_the_subscription() {
        let manager = SubscriptionManager::new();
        assert!(manager.add(supply(), Arc::new(|_, _| {})));
        assert!(!manager.add(supply(), Arc::new(|_, _| {})));
        assert!(manager.is_subscribed(SENSOR_TEMPERATURE_SUPPLY));

        assert!(manager.remove(SENSOR_TEMPERATURE_SUPPLY));
        assert!(!manager.remove(SENSOR_TEMPERATURE_SUPPLY));
        assert!(!manager.is_subscribed(SENSOR_TEMPERATURE_SUPPLY));
    }

    #[test]
    fn test_dispatch_reaches_every_subscriber() {
        let manager = SubscriptionManager::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            manager.add(
                supply(),
                Arc::new(move |sensor, value| {
                    assert_eq!(sensor.id, SENSOR_TEMPERATURE_SUPPLY);
                    assert_eq!(value, SensorValue::Number(240.0));
                    hits.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        manager.dispatch(SENSOR_TEMPERATURE_SUPPLY, &[0x60, 0x09]);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_unknown_pdo_is_dropped() {
        let manager = SubscriptionManager::new();
        // Must not panic or deliver anywhere.
        manager.dispatch(9999, &[0x01]);
    }

    #[test]
    fn test_subscriber_may_unsubscribe_from_its_callback() {
        let manager = SubscriptionManager::new();
        let inner = manager.clone();
        manager.add(
            sensor(SENSOR_FAN_EXHAUST_DUTY).unwrap(),
            Arc::new(move |sensor, _| {
                inner.remove(sensor.id);
            }),
        );
        manager.dispatch(SENSOR_FAN_EXHAUST_DUTY, &[45]);
        assert!(!manager.is_subscribed(SENSOR_FAN_EXHAUST_DUTY));
    }

    #[test]
    fn test_sensors_lists_active_subscriptions() {
        let manager = SubscriptionManager::new();
        manager.add(supply(), Arc::new(|_, _| {}));
        manager.add(sensor(SENSOR_FAN_EXHAUST_DUTY).unwrap(), Arc::new(|_, _| {}));
        let mut ids: Vec<u16> = manager.sensors().iter().map(|sensor| sensor.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![SENSOR_FAN_EXHAUST_DUTY, SENSOR_TEMPERATURE_SUPPLY]);
    }
}
