//! Acknowledgement correlation.
//!
//! Every outgoing ack request gets a fresh id from the [`AckTable`] of its
//! channel and a one-shot waiter registered under that id *before* the request
//! is written. The inbound loop resolves the waiter when a `43`/`46` reply with
//! the same id comes back. The waiter removes its own entry when it is dropped,
//! so timed out and cancelled requests leave nothing behind.
use std::{
    collections::{HashMap, hash_map::Entry},
    future::Future,
    pin::Pin,
    sync::{
        Mutex,
        atomic::{AtomicI64, Ordering},
    },
    task::{Context, Poll},
    time::Duration,
};

use tokio::{
    sync::oneshot,
    time::{Timeout, timeout},
};

use crate::errors::{AckError, SocketError};

#[derive(Debug, Default)]
pub(crate) struct AckTable {
    counter: AtomicI64,
    waiters: Mutex<HashMap<i64, oneshot::Sender<String>>>,
}

impl AckTable {
    /// Returns a new ack id, starting at 1. Ids are never reused.
    pub fn next_id(&self) -> i64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Registers a waiter for `id` that gives up after `duration`.
    pub fn add_waiter(&self, id: i64, duration: Duration) -> Result<AckWaiter<'_>, AckError> {
        let (tx, rx) = oneshot::channel();
        match self.waiters.lock().unwrap().entry(id) {
            Entry::Occupied(_) => return Err(AckError::DuplicateId(id)),
            Entry::Vacant(entry) => {
                entry.insert(tx);
            }
        }
        Ok(AckWaiter {
            _guard: WaiterGuard { table: self, id },
            reply: timeout(duration, rx),
        })
    }

    /// Hands `reply` to the waiter of `id`.
    /// Returns `false` when nobody waits for it anymore.
    pub fn resolve(&self, id: i64, reply: String) -> bool {
        let tx = self.waiters.lock().unwrap().remove(&id);
        match tx {
            Some(tx) => tx.send(reply).is_ok(),
            None => false,
        }
    }

    /// Drops every waiter, they all fail with [`SocketError::Closed`].
    pub fn close_all(&self) {
        self.waiters.lock().unwrap().clear();
    }

    pub fn pending(&self) -> usize {
        self.waiters.lock().unwrap().len()
    }

    fn remove(&self, id: i64) {
        self.waiters.lock().unwrap().remove(&id);
    }
}

struct WaiterGuard<'a> {
    table: &'a AckTable,
    id: i64,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.table.remove(self.id);
    }
}

pin_project_lite::pin_project! {
    /// A [`Future`] of the reply to one ack request.
    ///
    /// It yields [`AckError::Timeout`] if no reply came in time and
    /// [`AckError::Socket`] if the channel closed first.
    pub(crate) struct AckWaiter<'a> {
        _guard: WaiterGuard<'a>,
        #[pin]
        reply: Timeout<oneshot::Receiver<String>>,
    }
}

impl Future for AckWaiter<'_> {
    type Output = Result<String, AckError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().reply.poll(cx) {
            Poll::Ready(Ok(Ok(reply))) => Poll::Ready(Ok(reply)),
            Poll::Ready(Ok(Err(_))) => Poll::Ready(Err(AckError::Socket(SocketError::Closed))),
            Poll::Ready(Err(_)) => Poll::Ready(Err(AckError::Timeout)),
            Poll::Pending => Poll::Pending,
        }
    }
}
