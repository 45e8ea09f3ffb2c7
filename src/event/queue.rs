// src/event/queue.rs

//! Multi-producer, single-consumer ordered event queue.
//!
//! ## Locking
//! The queue lock is a leaf. It is held only for state transitions (admit,
//! pop and set current, clear current, remove) and never while an event is
//! processed. Callers that hold the canvas paint lock may take it briefly,
//! so the global order is *paint lock → queue lock*.
//!
//! ## Lifecycle of an admitted event
//! `post_event` appends and counts it as queued. `dequeue_and_process` pops it,
//! marks it current, and runs the handler with the lock released. The lock is
//! then retaken to clear the current event and count a completion, and the
//! flush waiters are woken.

use super::policy::{is_duplicate, placeable_after};
use super::{Event, EventHandler, EventKind, EventTag};
use log::{debug, error, trace, warn};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

/// Result of [`EventQueue::post_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    /// Appended with this admission id.
    Queued(u64),
    /// An equivalent event is already queued.
    Coalesced,
    /// The queue has been closed.
    Closed,
}

#[derive(Debug, Default)]
struct QueueState {
    events: VecDeque<Event>,
    current: Option<(EventTag, u64)>,
    /// Queue membership per tag.
    enqueued: [usize; EventTag::COUNT],
    /// Finished process() runs per tag, inline runs included.
    completed: [u64; EventTag::COUNT],
    /// Events pulled out of the queue and run on a caller's thread.
    inline_runs: Vec<(EventTag, ThreadId)>,
    next_id: u64,
    closed: bool,
}

impl QueueState {
    fn enter_queue(&mut self, tag: EventTag) {
        self.enqueued[tag.index()] += 1;
    }

    fn leave_queue(&mut self, tag: EventTag) {
        let count = &mut self.enqueued[tag.index()];
        *count = count.saturating_sub(1);
    }

    fn recycle(&mut self, tag: EventTag) {
        self.completed[tag.index()] += 1;
    }

    fn in_progress(&self, tag: EventTag) -> bool {
        matches!(self.current, Some((current, _)) if current == tag)
            || self.inline_runs.iter().any(|(t, _)| *t == tag)
    }
}

#[derive(Debug)]
pub struct EventQueue {
    state: Mutex<QueueState>,
    /// Signalled when an event is admitted or the queue closes.
    available: Condvar,
    /// Signalled when a process() run completes.
    finished: Condvar,
}

/// Outcome of [`EventQueue::flush`].
#[derive(Debug)]
pub enum Flush<'q> {
    /// The caller is itself running the event; nothing to wait for.
    Reentrant,
    /// An in-flight run of the event finished while the caller waited.
    Completed,
    /// The queued event was removed and must be run by the caller now.
    /// Dropping the guard records the completion.
    Take(InlineRun<'q>),
    /// Nothing matching was queued or running.
    Idle,
}

/// Registration of an event being run on a caller's thread instead of the
/// dispatcher. Other flushers wait for it like for the current event.
#[derive(Debug)]
pub struct InlineRun<'q> {
    queue: &'q EventQueue,
    tag: EventTag,
    thread: ThreadId,
}

impl Drop for InlineRun<'_> {
    fn drop(&mut self) {
        let mut state = self.queue.lock();
        if let Some(pos) = state
            .inline_runs
            .iter()
            .position(|(tag, thread)| *tag == self.tag && *thread == self.thread)
        {
            state.inline_runs.swap_remove(pos);
        }
        state.recycle(self.tag);
        drop(state);
        self.queue.finished.notify_all();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            available: Condvar::new(),
            finished: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Admits an event unless the coalescing policy rejects it.
    pub fn post_event(&self, kind: EventKind) -> PostOutcome {
        let tag = kind.tag();
        let mut state = self.lock();
        if state.closed {
            debug!("EventQueue: Dropping {:?} posted after close", tag);
            return PostOutcome::Closed;
        }
        if state.events.iter().any(|queued| is_duplicate(tag, queued)) {
            trace!("EventQueue: {:?} coalesced with queued instance", tag);
            return PostOutcome::Coalesced;
        }
        if let Some(last) = state.events.back() {
            if !placeable_after(tag, last) {
                trace!("EventQueue: {:?} not placeable after {:?}", tag, last.tag());
                return PostOutcome::Coalesced;
            }
        }

        state.next_id += 1;
        let id = state.next_id;
        state.events.push_back(Event::new(id, kind));
        state.enter_queue(tag);
        drop(state);
        self.available.notify_one();
        PostOutcome::Queued(id)
    }

    /// Blocks until an event is available, then processes it with `handler`.
    ///
    /// Returns `false` once the queue is closed. Errors and panics raised by
    /// the handler are logged; the current event is always cleared.
    pub fn dequeue_and_process<H>(&self, handler: &H) -> bool
    where
        H: EventHandler + ?Sized,
    {
        let event = {
            let mut state = self.lock();
            loop {
                if state.closed {
                    return false;
                }
                if let Some(event) = state.events.pop_front() {
                    let tag = event.tag();
                    state.current = Some((tag, event.id()));
                    state.leave_queue(tag);
                    break event;
                }
                state = self
                    .available
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
        };

        let tag = event.tag();
        let id = event.id();
        trace!("EventQueue: Processing {:?} #{}", tag, id);
        match panic::catch_unwind(AssertUnwindSafe(|| handler.process(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("EventQueue: {:?} #{} failed: {:#}", tag, id, e),
            Err(payload) => error!(
                "EventQueue: {:?} #{} panicked: {}",
                tag,
                id,
                panic_message(payload.as_ref())
            ),
        }

        let mut state = self.lock();
        state.current = None;
        state.recycle(tag);
        drop(state);
        self.finished.notify_all();
        true
    }

    /// Tag of the event being processed by the dispatcher, if any.
    pub fn current_event(&self) -> Option<EventTag> {
        self.lock().current.map(|(tag, _)| tag)
    }

    pub fn current_event_id(&self) -> Option<u64> {
        self.lock().current.map(|(_, id)| id)
    }

    /// Removes every queued (not yet started) event matching `predicate`.
    /// The remaining events keep their order.
    pub fn remove_events<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut(&Event) -> bool,
    {
        let mut state = self.lock();
        let mut removed = Vec::new();
        state.events.retain(|event| {
            if predicate(event) {
                removed.push(event.tag());
                false
            } else {
                true
            }
        });
        for tag in &removed {
            state.leave_queue(*tag);
        }
        !removed.is_empty()
    }

    pub fn remove_tag(&self, tag: EventTag) -> bool {
        self.remove_events(|event| event.tag() == tag)
    }

    /// Makes sure a run of `tag` has completed, or hands a queued one to the
    /// caller to run.
    ///
    /// `reentrant` is set by callers that are already inside a run of `tag`
    /// on this thread; they return immediately.
    pub fn flush(&self, tag: EventTag, reentrant: bool) -> Flush<'_> {
        if reentrant {
            return Flush::Reentrant;
        }
        let mut state = self.lock();
        if state.in_progress(tag) {
            let seen = state.completed[tag.index()];
            while state.completed[tag.index()] == seen {
                state = self
                    .finished
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
            return Flush::Completed;
        }

        let Some(pos) = state.events.iter().position(|event| event.tag() == tag) else {
            return Flush::Idle;
        };
        if let Some(event) = state.events.remove(pos) {
            state.leave_queue(event.tag());
        }
        let thread = thread::current().id();
        state.inline_runs.push((tag, thread));
        Flush::Take(InlineRun {
            queue: self,
            tag,
            thread,
        })
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    /// Number of queued events with this tag.
    pub fn queued_count(&self, tag: EventTag) -> usize {
        self.lock().enqueued[tag.index()]
    }

    /// Number of completed runs of this tag.
    pub fn completed_count(&self, tag: EventTag) -> u64 {
        self.lock().completed[tag.index()]
    }

    /// Stops the dispatcher after the event it is processing. Queued events
    /// are dropped unprocessed and later posts are refused.
    pub fn close(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let dropped = state.events.len();
        state.events.clear();
        state.enqueued = [0; EventTag::COUNT];
        drop(state);
        if dropped > 0 {
            warn!("EventQueue: Closed with {} unprocessed events", dropped);
        } else {
            debug!("EventQueue: Closed");
        }
        self.available.notify_all();
        self.finished.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
