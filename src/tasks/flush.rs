//! Snapshot Flush Scheduler
//!
//! Debounces save requests into trailing-edge flushes. Requests that arrive
//! while a flush is waiting on its delay join that flush; a request that
//! arrives while a flush is writing schedules the next one. Writes never
//! overlap.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, error};

use crate::error::{CacheError, Result};

// == Flush Target ==
/// Whatever the scheduler persists when a flush fires.
#[async_trait]
pub trait FlushTarget: Send + Sync + 'static {
    async fn flush(&self) -> Result<()>;
}

// == Flush Handle ==
#[derive(Debug, Clone, PartialEq)]
enum FlushStatus {
    Scheduled,
    Written,
    Failed(CacheError),
}

/// Awaitable outcome of one scheduled flush.
///
/// Every request coalesced into the same flush receives a clone of the same
/// handle. Dropping a handle does not cancel the flush.
#[derive(Debug, Clone)]
pub struct FlushHandle {
    rx: watch::Receiver<FlushStatus>,
}

impl FlushHandle {
    fn channel() -> (watch::Sender<FlushStatus>, Self) {
        let (tx, rx) = watch::channel(FlushStatus::Scheduled);
        (tx, Self { rx })
    }

    /// Waits until the flush has written, or reports why it did not.
    pub async fn wait(mut self) -> Result<()> {
        let status = self
            .rx
            .wait_for(|status| *status != FlushStatus::Scheduled)
            .await
            .map_err(|_| CacheError::FlushAborted)?
            .clone();

        match status {
            FlushStatus::Failed(err) => Err(err),
            FlushStatus::Written | FlushStatus::Scheduled => Ok(()),
        }
    }

    /// True if both handles refer to the same flush.
    pub fn same_flush(&self, other: &FlushHandle) -> bool {
        self.rx.same_channel(&other.rx)
    }
}

// == Flush Phase ==
/// Scheduler state.
#[derive(Debug, Default)]
enum FlushPhase {
    /// Nothing scheduled or writing
    #[default]
    Idle,
    /// A flush is waiting on its delay and accepts new requests
    Pending(FlushHandle),
    /// A flush is writing; nothing is queued behind it
    InFlight(FlushHandle),
    /// A flush is writing and another one is queued behind it
    InFlightThenPending {
        current: FlushHandle,
        next: FlushHandle,
    },
}

impl FlushPhase {
    /// The pending flush `handle` starts writing.
    fn begin(&mut self, handle: &FlushHandle) {
        *self = match std::mem::take(self) {
            FlushPhase::Pending(pending) if pending.same_flush(handle) => {
                FlushPhase::InFlight(pending)
            }
            other => other,
        };
    }

    /// The in-flight flush `handle` is done; a queued flush becomes pending.
    fn finish(&mut self, handle: &FlushHandle) {
        *self = match std::mem::take(self) {
            FlushPhase::InFlight(current) if current.same_flush(handle) => FlushPhase::Idle,
            FlushPhase::InFlightThenPending { current, next } if current.same_flush(handle) => {
                FlushPhase::Pending(next)
            }
            other => other,
        };
    }
}

// == Flush Scheduler ==
/// Coalesces save requests into delayed snapshot writes.
#[derive(Debug)]
pub struct FlushScheduler {
    delay: Duration,
    phase: Arc<Mutex<FlushPhase>>,
    write_lock: Arc<Mutex<()>>,
}

impl FlushScheduler {
    /// Creates a scheduler that waits `delay` before each flush.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            phase: Arc::new(Mutex::new(FlushPhase::Idle)),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Requests a flush of `target`.
    ///
    /// Returns the handle of the flush that will include every change made
    /// before this call. Must be called from within a Tokio runtime.
    pub async fn request<T: FlushTarget>(&self, target: Arc<T>) -> FlushHandle {
        let mut phase = self.phase.lock().await;
        match &*phase {
            FlushPhase::Pending(handle) | FlushPhase::InFlightThenPending { next: handle, .. } => {
                debug!("Save request joined pending flush");
                return handle.clone();
            }
            FlushPhase::Idle | FlushPhase::InFlight(_) => {}
        }

        let (tx, handle) = FlushHandle::channel();
        *phase = match std::mem::take(&mut *phase) {
            FlushPhase::InFlight(current) => FlushPhase::InFlightThenPending {
                current,
                next: handle.clone(),
            },
            _ => FlushPhase::Pending(handle.clone()),
        };
        drop(phase);

        debug!(delay_ms = self.delay.as_millis() as u64, "Flush scheduled");
        tokio::spawn(run_flush(
            self.delay,
            Arc::clone(&self.phase),
            Arc::clone(&self.write_lock),
            target,
            tx,
            handle.clone(),
        ));
        handle
    }

    /// Handle of the flush that is pending or writing, if any.
    ///
    /// When a flush is queued behind one that is writing, the queued one is
    /// returned since it finishes last.
    pub async fn current(&self) -> Option<FlushHandle> {
        match &*self.phase.lock().await {
            FlushPhase::Idle => None,
            FlushPhase::Pending(handle) | FlushPhase::InFlight(handle) => Some(handle.clone()),
            FlushPhase::InFlightThenPending { next, .. } => Some(next.clone()),
        }
    }

    /// Blocks scheduled flushes from writing while the guard is held.
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }
}

async fn run_flush<T: FlushTarget>(
    delay: Duration,
    phase: Arc<Mutex<FlushPhase>>,
    write_lock: Arc<Mutex<()>>,
    target: Arc<T>,
    tx: watch::Sender<FlushStatus>,
    handle: FlushHandle,
) {
    tokio::time::sleep(delay).await;

    let _writing = write_lock.lock().await;
    phase.lock().await.begin(&handle);

    // A panicking target must not leave the phase stuck in flight
    let result = match tokio::spawn(async move { target.flush().await }).await {
        Ok(result) => result,
        Err(join_err) => {
            error!(error = %join_err, "Snapshot flush task aborted");
            Err(CacheError::FlushAborted)
        }
    };

    // Clear the phase before resolving so a waiter can schedule a fresh flush
    phase.lock().await.finish(&handle);

    let status = match result {
        Ok(()) => FlushStatus::Written,
        Err(err) => {
            error!(error = %err, "Snapshot flush failed");
            FlushStatus::Failed(err)
        }
    };
    tx.send_replace(status);
}
