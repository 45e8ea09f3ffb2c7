// src/event/policy.rs

//! Admission policy consulted by [`EventQueue::post_event`](super::EventQueue::post_event).
//!
//! Two independent questions are asked for every post:
//!
//! - [`is_duplicate`]: is an already queued event the same logical event as
//!   the candidate? If so the post is dropped and the queued one keeps its
//!   place.
//! - [`placeable_after`]: may the candidate be appended directly behind the
//!   last queued event?
//!
//! Only repaint requests coalesce. Together with the dispatcher popping an
//! event before processing it, this bounds repaints to one in flight plus one
//! pending. Nothing is implied for other kinds; they are always admitted.

use super::{Event, EventTag};

/// Identity deduplication.
pub fn is_duplicate(candidate: EventTag, queued: &Event) -> bool {
    match candidate {
        EventTag::Paint => queued.tag() == EventTag::Paint,
        _ => false,
    }
}

/// Positional constraint against the tail of the queue.
pub fn placeable_after(candidate: EventTag, last_queued: &Event) -> bool {
    match candidate {
        EventTag::Paint => last_queued.tag() != EventTag::Paint,
        _ => true,
    }
}
