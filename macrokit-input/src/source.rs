//! Raw input notification source.
//!
//! The OS delivers input callbacks on its own hook thread; this module turns
//! that into an explicit subscribe/unsubscribe capability. Subscribers get a
//! channel of [`RawInput`] transitions and detach by dropping their
//! [`Subscription`] — no global hook state leaks into consumers.

use crate::keys::{button_code, key_code, KeyCode, PointerButton};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info};

/// One raw input transition as delivered by the OS hook thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawInput {
    Key { code: KeyCode, pressed: bool },
    Button { button: PointerButton, pressed: bool, x: i32, y: i32 },
    Move { x: i32, y: i32 },
    Wheel { delta_x: i32, delta_y: i32 },
}

/// A live subscription to a [`RawInputSource`].
///
/// Dropping the subscription detaches it; the source prunes dead receivers
/// on the next delivery.
pub struct Subscription {
    rx: Receiver<RawInput>,
}

impl Subscription {
    /// Build a connected sender/subscription pair. Sources (and tests) feed
    /// the sender; consumers poll the subscription.
    pub fn channel() -> (Sender<RawInput>, Subscription) {
        let (tx, rx) = mpsc::channel();
        (tx, Subscription { rx })
    }

    /// Wait up to `timeout` for the next transition.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<RawInput> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Drain one transition without blocking.
    pub fn try_recv(&self) -> Option<RawInput> {
        self.rx.try_recv().ok()
    }
}

/// A stream of raw input transitions.
pub trait RawInputSource: Send + Sync {
    /// Attach a new subscriber. Every live subscriber sees every transition.
    fn subscribe(&self) -> Subscription;
}

/// Input source backed by a global `rdev` listener.
///
/// The listener thread is spawned lazily on the first subscription and kept
/// for the life of the process; `rdev::listen` cannot be torn down, so
/// delivery is gated by the live-subscriber set instead. Button transitions
/// are stamped with the last observed pointer position, which `rdev` does
/// not attach itself.
pub struct RdevSource {
    subscribers: Arc<Mutex<Vec<Sender<RawInput>>>>,
    started: Mutex<bool>,
}

impl RdevSource {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
            started: Mutex::new(false),
        }
    }

    fn ensure_listener(&self) {
        let mut started = match self.started.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *started {
            return;
        }
        *started = true;

        let subscribers = Arc::clone(&self.subscribers);
        std::thread::spawn(move || {
            info!("raw input listener thread started");
            let mut last_pointer = (0i32, 0i32);

            let result = rdev::listen(move |event| {
                let raw = match event.event_type {
                    rdev::EventType::KeyPress(key) => Some(RawInput::Key {
                        code: key_code(&key),
                        pressed: true,
                    }),
                    rdev::EventType::KeyRelease(key) => Some(RawInput::Key {
                        code: key_code(&key),
                        pressed: false,
                    }),
                    rdev::EventType::ButtonPress(button) => {
                        let (x, y) = last_pointer;
                        button_code(&button)
                            .map(|button| RawInput::Button { button, pressed: true, x, y })
                    }
                    rdev::EventType::ButtonRelease(button) => {
                        let (x, y) = last_pointer;
                        button_code(&button)
                            .map(|button| RawInput::Button { button, pressed: false, x, y })
                    }
                    rdev::EventType::MouseMove { x, y } => {
                        let x = x as i32;
                        let y = y as i32;
                        last_pointer = (x, y);
                        Some(RawInput::Move { x, y })
                    }
                    rdev::EventType::Wheel { delta_x, delta_y } => Some(RawInput::Wheel {
                        delta_x: delta_x as i32,
                        delta_y: delta_y as i32,
                    }),
                };

                if let Some(raw) = raw {
                    if let Ok(mut subs) = subscribers.lock() {
                        subs.retain(|tx| tx.send(raw).is_ok());
                    }
                }
            });

            if let Err(e) = result {
                error!("raw input listener failed: {:?}", e);
            }
            info!("raw input listener thread finished");
        });
    }
}

impl Default for RdevSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RawInputSource for RdevSource {
    fn subscribe(&self) -> Subscription {
        let (tx, subscription) = Subscription::channel();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
            debug!(subscribers = subs.len(), "raw input subscriber attached");
        }
        self.ensure_listener();
        subscription
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_delivers_and_detaches() {
        let (tx, sub) = Subscription::channel();
        tx.send(RawInput::Move { x: 5, y: 9 }).unwrap();
        assert_eq!(sub.try_recv(), Some(RawInput::Move { x: 5, y: 9 }));
        assert_eq!(sub.try_recv(), None);

        drop(sub);
        assert!(tx.send(RawInput::Wheel { delta_x: 0, delta_y: 1 }).is_err());
    }

    #[test]
    fn recv_timeout_returns_none_when_idle() {
        let (_tx, sub) = Subscription::channel();
        assert_eq!(sub.recv_timeout(Duration::from_millis(10)), None);
    }
}
