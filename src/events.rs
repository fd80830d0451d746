//! # Scan Events
//!
//! Fan-out of controller events to any number of listeners. Each listener
//! subscribes to one or more `EventKind`s and gets its own channel, so events
//! of different kinds arrive in the order they were emitted. Dropping the
//! returned `Subscription` removes the listener.

use crate::peripheral::Peripheral;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    ScanStarted,
    ScanStopped,
    PeripheralDiscovered(Peripheral),
    ScanFailed { error_code: i32, message: String },
}

impl ScanEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ScanEvent::ScanStarted => EventKind::ScanStarted,
            ScanEvent::ScanStopped => EventKind::ScanStopped,
            ScanEvent::PeripheralDiscovered(_) => EventKind::PeripheralDiscovered,
            ScanEvent::ScanFailed { .. } => EventKind::ScanFailed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ScanStarted,
    ScanStopped,
    PeripheralDiscovered,
    ScanFailed,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ScanStarted => "onScanStart",
            EventKind::ScanStopped => "onScanStop",
            EventKind::PeripheralDiscovered => "onPeripheralDiscovered",
            EventKind::ScanFailed => "onScanFailed",
        }
    }
}

struct Listener {
    id: u64,
    kinds: Vec<EventKind>,
    sender: Sender<ScanEvent>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<Listener>,
}

#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<Listeners>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: EventKind) -> Subscription {
        self.subscribe_all(&[kind])
    }

    /// One listener, one channel, several kinds.
    pub fn subscribe_all(&self, kinds: &[EventKind]) -> Subscription {
        let (sender, receiver) = unbounded();
        let mut listeners = self.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push(Listener {
            id,
            kinds: kinds.to_vec(),
            sender,
        });

        let names: Vec<&str> = kinds.iter().map(EventKind::name).collect();
        log::debug!("Subscribed listener {} to {}", id, names.join(", "));
        Subscription {
            id,
            kinds: kinds.to_vec(),
            receiver,
            bus: self.clone(),
        }
    }

    /// Delivers the event to every listener of its kind. Listeners whose
    /// receiving side is gone are dropped.
    pub fn emit(&self, event: ScanEvent) {
        let kind = event.kind();
        let mut listeners = self.lock();
        listeners.entries.retain(|listener| {
            if !listener.kinds.contains(&kind) {
                return true;
            }
            listener.sender.send(event.clone()).is_ok()
        });
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.lock()
            .entries
            .iter()
            .filter(|l| l.kinds.contains(&kind))
            .count()
    }

    fn unsubscribe(&self, id: u64) {
        self.lock().entries.retain(|listener| listener.id != id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Listeners> {
        // A panic while holding the lock leaves the list itself intact
        self.listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Live subscription. Unsubscribes on drop.
pub struct Subscription {
    id: u64,
    kinds: Vec<EventKind>,
    receiver: Receiver<ScanEvent>,
    bus: EventBus,
}

impl Subscription {
    pub fn receiver(&self) -> &Receiver<ScanEvent> {
        &self.receiver
    }

    /// Drains every pending event without blocking.
    pub fn drain(&self) -> Vec<ScanEvent> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        log::debug!("Unsubscribing listener {} ({} kinds)", self.id, self.kinds.len());
        self.bus.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peripheral(id: &str) -> Peripheral {
        Peripheral {
            id: id.to_string(),
            name: "Tag".to_string(),
            rssi: -50,
            advertisement_data: None,
        }
    }

    #[test]
    fn test_events_routed_by_kind() {
        let bus = EventBus::new();
        let started = bus.subscribe(EventKind::ScanStarted);
        let discovered = bus.subscribe(EventKind::PeripheralDiscovered);

        bus.emit(ScanEvent::ScanStarted);
        bus.emit(ScanEvent::PeripheralDiscovered(peripheral("AA")));

        assert_eq!(started.drain(), vec![ScanEvent::ScanStarted]);
        assert_eq!(
            discovered.drain(),
            vec![ScanEvent::PeripheralDiscovered(peripheral("AA"))]
        );
    }

    #[test]
    fn test_fan_out_to_every_listener() {
        let bus = EventBus::new();
        let a = bus.subscribe(EventKind::ScanStopped);
        let b = bus.subscribe(EventKind::ScanStopped);

        bus.emit(ScanEvent::ScanStopped);

        assert_eq!(a.drain().len(), 1);
        assert_eq!(b.drain().len(), 1);
    }

    #[test]
    fn test_multi_kind_subscription_keeps_order() {
        let bus = EventBus::new();
        let subscription = bus.subscribe_all(&[EventKind::ScanStarted, EventKind::ScanStopped]);

        bus.emit(ScanEvent::ScanStarted);
        bus.emit(ScanEvent::PeripheralDiscovered(peripheral("AA")));
        bus.emit(ScanEvent::ScanStopped);
        bus.emit(ScanEvent::ScanStarted);

        assert_eq!(
            subscription.drain(),
            vec![ScanEvent::ScanStarted, ScanEvent::ScanStopped, ScanEvent::ScanStarted]
        );
        assert_eq!(bus.listener_count(EventKind::ScanStopped), 1);
        assert_eq!(bus.listener_count(EventKind::PeripheralDiscovered), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = EventBus::new();
        let subscription = bus.subscribe(EventKind::ScanFailed);
        assert_eq!(bus.listener_count(EventKind::ScanFailed), 1);

        drop(subscription);
        assert_eq!(bus.listener_count(EventKind::ScanFailed), 0);

        // No listeners is not an error
        bus.emit(ScanEvent::ScanFailed {
            error_code: 3,
            message: "Internal error occurred.".into(),
        });
    }

    #[test]
    fn test_event_names() {
        assert_eq!(EventKind::ScanStarted.name(), "onScanStart");
        assert_eq!(EventKind::ScanStopped.name(), "onScanStop");
        assert_eq!(EventKind::PeripheralDiscovered.name(), "onPeripheralDiscovered");
        assert_eq!(EventKind::ScanFailed.name(), "onScanFailed");
    }
}
