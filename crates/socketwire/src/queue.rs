//! The per channel outbound queue.
//!
//! A bounded FIFO of messages with a non blocking `push` and an
//! async `pop`. Its occupancy is observable at any time, which the outbound
//! loop uses to drive the backpressure policy.
use std::{collections::VecDeque, sync::Mutex};

use smallvec::SmallVec;
use tokio::sync::Notify;

use crate::{errors::SocketError, transport::Frame};

/// The frames of one message: the text packet followed by its attachments.
/// They are always written back to back.
pub(crate) type Frames = SmallVec<[Frame; 2]>;

#[derive(Debug)]
pub(crate) enum Outbound {
    Frames(Frames),
    /// Stops the outbound loop.
    Close,
}

#[derive(Debug)]
struct State {
    items: VecDeque<Frames>,
    closed: bool,
}

#[derive(Debug)]
pub(crate) struct OutboundQueue {
    state: Mutex<State>,
    notify: Notify,
    capacity: usize,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity.min(64)),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Enqueues a message without waiting.
    pub fn push(&self, frames: Frames) -> Result<(), SocketError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(SocketError::Closed);
        }
        if state.items.len() >= self.capacity {
            return Err(SocketError::InternalChannelFull);
        }
        state.items.push_back(frames);
        drop(state);
        self.notify.notify_one();
        Ok(())
    }

    /// Waits for the next unit. Once closed, always returns [`Outbound::Close`].
    pub async fn pop(&self) -> Outbound {
        loop {
            {
                let mut state = self.state.lock().unwrap();
                if state.closed {
                    return Outbound::Close;
                }
                if let Some(frames) = state.items.pop_front() {
                    return Outbound::Frames(frames);
                }
            }
            // notify_one stores a permit when nobody waits yet,
            // so a push racing with this await is not lost.
            self.notify.notified().await;
        }
    }

    /// Drops every queued message and wakes the consumer with [`Outbound::Close`].
    /// Later pushes fail with [`SocketError::Closed`].
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        state.items.clear();
        drop(state);
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;

    use super::*;

    fn text(s: &str) -> Frames {
        smallvec![Frame::Text(s.to_owned())]
    }

    #[tokio::test]
    async fn fifo_order() {
        let queue = OutboundQueue::new(4);
        queue.push(text("a")).unwrap();
        queue.push(text("b")).unwrap();
        assert_eq!(queue.len(), 2);
        match queue.pop().await {
            Outbound::Frames(f) => assert_eq!(f[0], Frame::Text("a".into())),
            Outbound::Close => panic!("unexpected close"),
        }
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn push_fails_when_full() {
        let queue = OutboundQueue::new(2);
        queue.push(text("a")).unwrap();
        queue.push(text("b")).unwrap();
        assert_eq!(queue.push(text("c")), Err(SocketError::InternalChannelFull));
    }

    #[tokio::test]
    async fn close_drains_and_rejects() {
        let queue = OutboundQueue::new(2);
        queue.push(text("a")).unwrap();
        queue.push(text("b")).unwrap();
        queue.close();
        assert_eq!(queue.len(), 0);
        assert!(matches!(queue.pop().await, Outbound::Close));
        assert!(matches!(queue.pop().await, Outbound::Close));
        assert_eq!(queue.push(text("c")), Err(SocketError::Closed));
    }

    #[tokio::test]
    async fn pop_waits_for_push() {
        let queue = std::sync::Arc::new(OutboundQueue::new(2));
        let q = queue.clone();
        let popper = tokio::spawn(async move { matches!(q.pop().await, Outbound::Frames(_)) });
        tokio::task::yield_now().await;
        queue.push(text("late")).unwrap();
        assert!(popper.await.unwrap());
    }
}
