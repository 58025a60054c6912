//! One-shot readiness gate.
//!
//! Built on a watch channel rather than a polled flag so a gate fired
//! before a waiter subscribes is still observed.

use tokio::sync::watch;

/// Owner side of a one-shot broadcast readiness gate.
///
/// The gate starts unfired; [`ReadyGate::set_ready`] fires it exactly once
/// and every current and future subscriber observes it. Firing again is a
/// no-op.
#[derive(Debug)]
pub struct ReadyGate {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl ReadyGate {
    /// Create an unfired gate.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Subscribe to the gate.
    pub fn subscribe(&self) -> ReadySignal {
        ReadySignal {
            rx: self.rx.clone(),
        }
    }

    /// Fire the gate. Idempotent.
    pub fn set_ready(&self) {
        let _ = self.tx.send(true);
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber side of the readiness gate.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    rx: watch::Receiver<bool>,
}

impl ReadySignal {
    /// Wait until the gate has fired. Returns immediately if it already
    /// has.
    pub async fn wait(&mut self) {
        // A dropped gate can no longer fire; stay parked rather than
        // report readiness that never happened.
        if self.rx.wait_for(|ready| *ready).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Whether the gate has fired.
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }
}
