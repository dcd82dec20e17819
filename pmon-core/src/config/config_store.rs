//! Hot-swappable configuration holder.
//!
//! Readers take a cheap `Arc` snapshot with [`ConfigStore::load`]; a
//! snapshot never changes underneath them. Writers publish a whole new
//! value, and subscribers are woken through a `watch` channel.

use std::sync::Arc;
use tokio::sync::watch;

pub struct ConfigStore<T> {
    tx: Arc<watch::Sender<Arc<T>>>,
}

impl<T> ConfigStore<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    /// Current value.
    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.tx.borrow())
    }

    /// Replace the value and wake every subscriber.
    pub fn update(&self, value: T) {
        self.tx.send_replace(Arc::new(value));
    }

    /// Watch for replacements.
    pub fn subscribe(&self) -> watch::Receiver<Arc<T>> {
        self.tx.subscribe()
    }
}

impl<T> Clone for ConfigStore<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}
