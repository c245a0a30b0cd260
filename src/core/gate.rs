//! Single-flight admission gate for provider calls.
//!
//! Remote TTS APIs reject overlapping connections or enforce strict per-key
//! concurrency limits, so every provider client gets exactly one of these:
//! the gate admits at most one in-flight call at a time and queues the rest
//! in arrival order. It is an explicit single-slot admission queue rather
//! than a wrapped semaphore so the permit lifecycle stays visible.
//!
//! The permit is an RAII guard: it is released on every exit path of the
//! guarded call, including errors and panics. A leaked permit would deadlock
//! the provider permanently, which is why there is no manual `release`.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Serializes calls to one provider session: at most one concurrently
/// executing guarded future, FIFO admission for the rest.
///
/// Gates for different providers are fully independent. Cloning produces a
/// handle to the same gate.
#[derive(Clone)]
pub struct RequestGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    state: Mutex<GateState>,
}

struct GateState {
    busy: bool,
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl RequestGate {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GateInner {
                state: Mutex::new(GateState {
                    busy: false,
                    waiters: VecDeque::new(),
                }),
            }),
        }
    }

    /// Acquire the single slot, waiting behind earlier callers.
    pub async fn acquire(&self) -> GatePermit {
        let rx = {
            let mut state = self.inner.state.lock();
            if !state.busy {
                state.busy = true;
                return GatePermit {
                    gate: Arc::clone(&self.inner),
                };
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            rx
        };

        Handoff {
            gate: Arc::clone(&self.inner),
            rx,
            complete: false,
        }
        .await
    }

    /// Run a future while holding the slot. The permit is dropped (and the
    /// next waiter admitted) no matter how the future exits.
    pub async fn run<F, T>(&self, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let _permit = self.acquire().await;
        fut.await
    }

    /// Number of callers currently queued behind the active one.
    pub fn queued(&self) -> usize {
        self.inner.state.lock().waiters.len()
    }
}

impl Default for RequestGate {
    fn default() -> Self {
        Self::new()
    }
}

/// The right to issue exactly one request. Dropping it admits the next
/// queued caller, or frees the slot if nobody is waiting.
pub struct GatePermit {
    gate: Arc<GateInner>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        release_slot(&self.gate);
    }
}

/// Hand the slot to the oldest waiter that is still listening, otherwise
/// mark the gate idle.
fn release_slot(gate: &GateInner) {
    let mut state = gate.state.lock();
    while let Some(tx) = state.waiters.pop_front() {
        // A waiter whose receiver is gone abandoned the queue; skip it.
        if tx.send(()).is_ok() {
            return;
        }
    }
    state.busy = false;
}

/// Future for a queued acquisition.
///
/// If the waiting future is dropped after the slot was already handed to it
/// but before it was polled, `Drop` passes the slot along so the gate never
/// wedges on a cancelled caller.
struct Handoff {
    gate: Arc<GateInner>,
    rx: oneshot::Receiver<()>,
    complete: bool,
}

impl Future for Handoff {
    type Output = GatePermit;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(())) => {
                this.complete = true;
                Poll::Ready(GatePermit {
                    gate: Arc::clone(&this.gate),
                })
            }
            Poll::Ready(Err(_)) => {
                // The sender only disappears if the gate state itself is
                // torn down, which cannot happen while a handle is held.
                // Claim the slot outright rather than wedge.
                this.complete = true;
                this.gate.state.lock().busy = true;
                Poll::Ready(GatePermit {
                    gate: Arc::clone(&this.gate),
                })
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Handoff {
    fn drop(&mut self) {
        if !self.complete {
            if let Ok(()) = self.rx.try_recv() {
                release_slot(&self.gate);
            }
        }
    }
}
