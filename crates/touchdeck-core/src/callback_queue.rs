//! Bounded FIFO of widget callbacks.
//!
//! A widget whose state changed (from a touch or from a programmatic
//! `set_value`) never runs its side effect inline. It pushes a
//! [`QueuedCallback`] here and the DrawTask pops at most one per tick, so
//! every callback runs serially on the task that owns the display bus.

use heapless::Deque;
use log::warn;

use crate::context::UiContext;
use crate::registry::{WidgetArena, WidgetId};

/// Default number of pending callbacks the UI context holds.
pub const CALLBACK_QUEUE_CAPACITY: usize = 5;

/// Side effect registered on a widget.
///
/// Callbacks run on the DrawTask with mutable access to the UI context and
/// the widget arena, so they can switch screens or update other widgets.
pub type Callback = fn(&mut CallbackScope<'_>);

/// Everything a callback may touch while it runs.
pub struct CallbackScope<'a> {
    pub ctx: &'a mut UiContext,
    pub widgets: &'a mut WidgetArena,
    /// Widget whose state change queued this callback.
    pub source: WidgetId,
}

/// A callback together with the widget that queued it.
#[derive(Debug, Clone, Copy)]
pub struct QueuedCallback {
    pub source: WidgetId,
    pub callback: Callback,
}

impl QueuedCallback {
    pub fn new(source: WidgetId, callback: Callback) -> Self {
        Self { source, callback }
    }

    pub fn run(self, ctx: &mut UiContext, widgets: &mut WidgetArena) {
        let mut scope = CallbackScope {
            ctx,
            widgets,
            source: self.source,
        };
        (self.callback)(&mut scope);
    }
}

/// Fixed-capacity single-consumer callback queue.
///
/// A full queue rejects new items: nothing is evicted and the producer never
/// blocks.
pub struct CallbackQueue<const N: usize = CALLBACK_QUEUE_CAPACITY> {
    items: Deque<QueuedCallback, N>,
    dropped: u32,
}

impl<const N: usize> Default for CallbackQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CallbackQueue<N> {
    pub const fn new() -> Self {
        Self {
            items: Deque::new(),
            dropped: 0,
        }
    }

    /// Queue a callback. Returns `false` and logs when there is no free slot.
    pub fn push(&mut self, item: QueuedCallback) -> bool {
        match self.items.push_back(item) {
            Ok(()) => true,
            Err(rejected) => {
                self.dropped = self.dropped.saturating_add(1);
                warn!(
                    "Callback queue full ({} slots), dropping callback from widget {:?}",
                    N, rejected.source
                );
                false
            }
        }
    }

    /// Pop the oldest pending callback without blocking.
    pub fn drain_one(&mut self) -> Option<QueuedCallback> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Number of callbacks lost to a full queue since start-up.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}
