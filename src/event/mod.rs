// src/event/mod.rs

//! Units of deferred work carried through the dispatch queue.
//!
//! An [`Event`] is a plain value: the admission id handed out by the queue and
//! an [`EventKind`] describing what triggered it. Repaint requests carry no
//! payload, so "the" paint event is identified by its [`EventTag`] alone and
//! the coalescing rules in [`policy`] work on tags.

pub mod policy;
pub mod queue;

#[cfg(test)]
mod tests;

pub use queue::{EventQueue, Flush, InlineRun, PostOutcome};

use std::fmt;

/// Phase of a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Pressed,
    Repeated,
    Released,
}

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerAction {
    Pressed,
    Dragged,
    Released,
}

/// A closure marshalled onto the dispatch thread.
pub struct Task(Box<dyn FnOnce() + Send + 'static>);

impl Task {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Task(Box::new(f))
    }

    pub fn run(self) {
        (self.0)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Task(..)")
    }
}

/// What an event asks the canvas to do.
#[derive(Debug)]
pub enum EventKind {
    /// Redraw the canvas.
    Paint,
    /// A handset key, already converted through the key map.
    Key { action: KeyAction, code: i32 },
    /// A pointer in virtual screen coordinates.
    Pointer {
        action: PointerAction,
        pointer: i32,
        x: f32,
        y: f32,
    },
    /// Logical canvas size changed; notify the application.
    SizeChanged { width: i32, height: i32 },
    /// The host surface changed size; recompute the layout.
    DisplayResized { width: i32, height: i32 },
    ShowNotify,
    HideNotify,
    /// Arbitrary work run in queue order on the dispatch thread.
    Task(Task),
}

/// Payload-free discriminant of [`EventKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTag {
    Paint,
    Key,
    Pointer,
    SizeChanged,
    DisplayResized,
    ShowNotify,
    HideNotify,
    Task,
}

impl EventTag {
    pub const COUNT: usize = 8;

    pub const ALL: [EventTag; EventTag::COUNT] = [
        EventTag::Paint,
        EventTag::Key,
        EventTag::Pointer,
        EventTag::SizeChanged,
        EventTag::DisplayResized,
        EventTag::ShowNotify,
        EventTag::HideNotify,
        EventTag::Task,
    ];

    /// Dense index for per-tag counters.
    pub fn index(self) -> usize {
        match self {
            EventTag::Paint => 0,
            EventTag::Key => 1,
            EventTag::Pointer => 2,
            EventTag::SizeChanged => 3,
            EventTag::DisplayResized => 4,
            EventTag::ShowNotify => 5,
            EventTag::HideNotify => 6,
            EventTag::Task => 7,
        }
    }
}

impl EventKind {
    pub fn tag(&self) -> EventTag {
        match self {
            EventKind::Paint => EventTag::Paint,
            EventKind::Key { .. } => EventTag::Key,
            EventKind::Pointer { .. } => EventTag::Pointer,
            EventKind::SizeChanged { .. } => EventTag::SizeChanged,
            EventKind::DisplayResized { .. } => EventTag::DisplayResized,
            EventKind::ShowNotify => EventTag::ShowNotify,
            EventKind::HideNotify => EventTag::HideNotify,
            EventKind::Task(_) => EventTag::Task,
        }
    }
}

/// An admitted event.
#[derive(Debug)]
pub struct Event {
    id: u64,
    kind: EventKind,
}

impl Event {
    pub(crate) fn new(id: u64, kind: EventKind) -> Self {
        Self { id, kind }
    }

    /// Admission number. Strictly increasing in post order.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn tag(&self) -> EventTag {
        self.kind.tag()
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn into_kind(self) -> EventKind {
        self.kind
    }
}

/// Consumer of dequeued events.
///
/// `process` runs without the queue lock held, so it may post new events or
/// call back into the queue.
pub trait EventHandler {
    fn process(&self, event: Event) -> anyhow::Result<()>;
}
