//! Typed item events with a pre-allocated ring buffer.
//!
//! The registry records an event for every placement change. Events are
//! buffered and delivered in batch to passive listeners (audio cues,
//! analytics, UI refresh) when the driver calls [`EventBus::deliver`].
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any recording for that kind.

use crate::grid::Cell;
use crate::id::{ItemId, ItemKind};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// An item lifecycle or movement event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ItemAdded {
        item: ItemId,
        kind: ItemKind,
        cell: Cell,
    },
    ItemRemoved {
        item: ItemId,
        kind: ItemKind,
        cell: Cell,
        by_player: bool,
    },
    /// Feedback cue for a player pickup, emitted alongside `ItemRemoved`.
    ItemPickedUp {
        item: ItemId,
        kind: ItemKind,
        cell: Cell,
    },
    ItemMoved {
        item: ItemId,
        from: Cell,
        to: Cell,
    },
    ItemFetched {
        item: ItemId,
        cell: Cell,
    },
    ItemDropped {
        item: ItemId,
        cell: Cell,
    },
    ItemDiscarded {
        item: ItemId,
        kind: ItemKind,
    },
    /// Garbage collection dropped an orphaned live entry.
    ItemCollected {
        item: ItemId,
        cell: Cell,
    },
}

/// Discriminant tag for event types, used for suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ItemAdded,
    ItemRemoved,
    ItemPickedUp,
    ItemMoved,
    ItemFetched,
    ItemDropped,
    ItemDiscarded,
    ItemCollected,
}

const EVENT_KIND_COUNT: usize = 8;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ItemAdded { .. } => EventKind::ItemAdded,
            Event::ItemRemoved { .. } => EventKind::ItemRemoved,
            Event::ItemPickedUp { .. } => EventKind::ItemPickedUp,
            Event::ItemMoved { .. } => EventKind::ItemMoved,
            Event::ItemFetched { .. } => EventKind::ItemFetched,
            Event::ItemDropped { .. } => EventKind::ItemDropped,
            Event::ItemDiscarded { .. } => EventKind::ItemDiscarded,
            Event::ItemCollected { .. } => EventKind::ItemCollected,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer: pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// Fixed-capacity event ring. Once full, new events overwrite the oldest.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Next slot to write.
    head: usize,
    len: usize,
    /// Events pushed since creation, overwritten ones included.
    total_written: u64,
}

impl EventBuffer {
    /// Create a new ring buffer. A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Iterate over events from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        // Once full, head points at the oldest entry.
        let start = if self.len < self.capacity() { 0 } else { self.head };
        let capacity = self.capacity();
        (0..self.len).filter_map(move |i| self.events[(start + i) % capacity].as_ref())
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Read-only callback invoked for each delivered event.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Buffered event bus with suppression and passive listeners.
pub struct EventBus {
    buffer: EventBuffer,
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: Vec<PassiveListener>,
    delivered: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffer", &self.buffer)
            .field("suppressed", &self.suppressed)
            .field("listeners", &self.listeners.len())
            .field("delivered", &self.delivered)
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: EventBuffer::new(capacity),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Vec::new(),
            delivered: 0,
        }
    }

    /// Record an event unless its kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        if self.suppressed[event.kind().index()] {
            return;
        }
        self.buffer.push(event);
    }

    /// Stop recording events of `kind`.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    pub fn subscribe(&mut self, listener: PassiveListener) {
        self.listeners.push(listener);
    }

    /// Events recorded since the last delivery, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &Event> {
        self.buffer.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Hand every pending event to each listener in subscription order, then
    /// clear the buffer. Returns the number of events delivered.
    pub fn deliver(&mut self) -> usize {
        let count = self.buffer.len();
        if count == 0 {
            return 0;
        }
        for event in self.buffer.iter() {
            for listener in &mut self.listeners {
                listener(event);
            }
        }
        self.buffer.clear();
        self.delivered += count as u64;
        count
    }

    /// Drain pending events without notifying listeners.
    pub fn drain(&mut self) -> Vec<Event> {
        let events: Vec<Event> = self.buffer.iter().cloned().collect();
        self.buffer.clear();
        events
    }

    /// Total events delivered to listeners so far.
    pub fn delivered_count(&self) -> u64 {
        self.delivered
    }
}
