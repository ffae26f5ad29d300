//! Typed publish/subscribe channels, one per event category.
//!
//! Each `Channel<T>` fans a value out to every live subscriber over
//! `mpsc`. Subscribers whose receiver was dropped are pruned on the next
//! emit.

use std::sync::mpsc;

use crate::engine::{Layout, Location, Metadata, Navigation, Selection, Turn};

pub struct Channel<T> {
    subscribers: Vec<mpsc::Sender<T>>,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<T: Clone> Channel<T> {
    pub fn subscribe(&mut self) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver `value` to all subscribers. Returns how many received it.
    pub fn emit(&mut self, value: T) -> usize {
        self.subscribers.retain(|tx| tx.send(value.clone()).is_ok());
        self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Active-state affordance for an arrow key while a page turn is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTurn {
    pub turn: Turn,
    pub active: bool,
}

/// Outbound signals of a reader session.
#[derive(Default)]
pub struct Signals {
    /// Initial display finished; carries the viewport name.
    pub rendered: Channel<String>,
    pub ready: Channel<()>,
    /// Loading indicator visibility.
    pub loader: Channel<bool>,
    pub metadata: Channel<Metadata>,
    pub navigation: Channel<Navigation>,
    pub layout: Channel<Layout>,
    pub relocated: Channel<Location>,
    pub selected: Channel<Selection>,
    pub unselected: Channel<()>,
    pub page_turn: Channel<PageTurn>,
    /// Font size in percent after a change.
    pub font_size: Channel<u32>,
    pub bookmarked: Channel<String>,
    pub unbookmarked: Channel<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_reaches_every_subscriber() {
        let mut ch: Channel<u32> = Channel::default();
        let a = ch.subscribe();
        let b = ch.subscribe();
        assert_eq!(ch.emit(7), 2);
        assert_eq!(a.try_recv().unwrap(), 7);
        assert_eq!(b.try_recv().unwrap(), 7);
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let mut ch: Channel<String> = Channel::default();
        let keep = ch.subscribe();
        drop(ch.subscribe());
        assert_eq!(ch.emit("x".into()), 1);
        assert_eq!(ch.subscriber_count(), 1);
        assert_eq!(keep.try_recv().unwrap(), "x");
    }

    #[test]
    fn emit_without_subscribers_is_noop() {
        let mut ch: Channel<()> = Channel::default();
        assert_eq!(ch.emit(()), 0);
    }

    #[test]
    fn values_arrive_in_emit_order() {
        let mut ch: Channel<u32> = Channel::default();
        let rx = ch.subscribe();
        for v in [1, 2, 3] {
            ch.emit(v);
        }
        let got: Vec<u32> = rx.try_iter().collect();
        assert_eq!(got, vec![1, 2, 3]);
    }
}
