use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant};
use tracing::{debug, warn};

/// Consumes events taken out of an [`EventSlot`].
#[async_trait]
pub trait SlotHandler<T>: Send + Sync {
    async fn handle(&self, kind: &str, payload: T) -> anyhow::Result<()>;
}

struct Pending<T> {
    kind: String,
    payload: T,
    priority: u8,
}

struct SlotShared<T> {
    pending: Mutex<Option<Pending<T>>>,
    busy: AtomicBool,
    shutdown: AtomicBool,
    notify: Notify,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Single-outstanding-event dispatch primitive.
///
/// `dispatch` installs a payload into one slot, unconditionally
/// replacing any unconsumed pending event. This is deliberate load
/// shedding, not a queue: producers that outpace the worker lose
/// intermediate events, and under concurrent dispatchers the outcome
/// is best-effort last-write-wins. The `priority` tag is recorded for
/// logging only and never reorders anything.
pub struct EventSlot<T> {
    shared: Arc<SlotShared<T>>,
}

impl<T> Clone for EventSlot<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send + 'static> Default for EventSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> EventSlot<T> {
    /// How long the worker parks between wake-up checks.
    pub const WORKER_POLL: Duration = Duration::from_millis(100);
    /// Poll interval for [`EventSlot::wait_until_idle`].
    const IDLE_POLL: Duration = Duration::from_millis(10);

    pub fn new() -> Self {
        Self {
            shared: Arc::new(SlotShared {
                pending: Mutex::new(None),
                busy: AtomicBool::new(false),
                shutdown: AtomicBool::new(false),
                notify: Notify::new(),
                worker: Mutex::new(None),
            }),
        }
    }

    /// Install `payload` into the slot, replacing any unconsumed
    /// event (last writer wins).
    pub fn dispatch(&self, kind: impl Into<String>, payload: T, priority: u8) {
        let kind = kind.into();
        let mut pending = self.shared.pending.lock().unwrap();
        if let Some(old) = pending.take() {
            debug!(
                replaced = %old.kind,
                replaced_priority = old.priority,
                with = %kind,
                priority,
                "dropping unconsumed event"
            );
        }
        *pending = Some(Pending {
            kind,
            payload,
            priority,
        });
        drop(pending);
        self.shared.notify.notify_one();
    }

    /// Spawn the worker task. Repeated calls are no-ops while a
    /// worker is running.
    pub fn start(&self, handler: Arc<dyn SlotHandler<T>>) {
        let mut worker = self.shared.worker.lock().unwrap();
        if worker.is_some() {
            return;
        }
        self.shared.shutdown.store(false, Ordering::SeqCst);
        let shared = self.shared.clone();
        *worker = Some(tokio::spawn(async move {
            loop {
                if shared.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                // Mark busy while still holding the slot lock, so an
                // idle observer never sees the slot empty with an
                // event in flight.
                let next = {
                    let mut pending = shared.pending.lock().unwrap();
                    let event = pending.take();
                    if event.is_some() {
                        shared.busy.store(true, Ordering::SeqCst);
                    }
                    event
                };
                match next {
                    Some(event) => {
                        if let Err(e) = handler.handle(&event.kind, event.payload).await {
                            warn!(kind = %event.kind, error = %e, "event handler failed");
                        }
                        shared.busy.store(false, Ordering::SeqCst);
                    }
                    None => {
                        let _ = time::timeout(Self::WORKER_POLL, shared.notify.notified()).await;
                    }
                }
            }
        }));
    }

    /// Request cooperative shutdown and join the worker, logging
    /// (never panicking) if the bound is exceeded.
    pub async fn stop(&self, timeout: Duration) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.notify.notify_one();
        let handle = self.shared.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            match time::timeout(timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "event slot worker panicked"),
                Err(_) => warn!(?timeout, "event slot worker did not stop in time"),
            }
        }
    }

    /// Poll until the slot is empty and the worker is not mid-event.
    /// Returns `false` if `timeout` elapses first.
    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let idle = self.shared.pending.lock().unwrap().is_none()
                && !self.shared.busy.load(Ordering::SeqCst);
            if idle {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            time::sleep(Self::IDLE_POLL).await;
        }
    }

    /// Whether an event is waiting to be consumed.
    pub fn has_pending(&self) -> bool {
        self.shared.pending.lock().unwrap().is_some()
    }
}
