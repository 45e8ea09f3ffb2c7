// src/event/tests.rs

use super::*;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use test_log::test;

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(EventTag, u64)>>,
}

impl Recorder {
    fn tags(&self) -> Vec<EventTag> {
        self.seen.lock().unwrap().iter().map(|(tag, _)| *tag).collect()
    }
}

impl EventHandler for Recorder {
    fn process(&self, event: Event) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push((event.tag(), event.id()));
        if let EventKind::Task(task) = event.into_kind() {
            task.run();
        }
        Ok(())
    }
}

/// Blocks inside every Paint until released.
struct GatedPainter {
    started: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl EventHandler for GatedPainter {
    fn process(&self, event: Event) -> anyhow::Result<()> {
        if event.tag() == EventTag::Paint {
            self.started.lock().unwrap().send(()).ok();
            self.release.lock().unwrap().recv().ok();
        }
        Ok(())
    }
}

fn key(code: i32) -> EventKind {
    EventKind::Key {
        action: KeyAction::Pressed,
        code,
    }
}

fn drain<H: EventHandler>(queue: &EventQueue, handler: &H) {
    while !queue.is_empty() {
        assert!(queue.dequeue_and_process(handler));
    }
}

fn spawn_gated(queue: &Arc<EventQueue>) -> (Receiver<()>, Sender<()>, thread::JoinHandle<()>) {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let painter = GatedPainter {
        started: Mutex::new(started_tx),
        release: Mutex::new(release_rx),
    };
    let queue = Arc::clone(queue);
    let handle = thread::spawn(move || while queue.dequeue_and_process(&painter) {});
    (started_rx, release_tx, handle)
}

#[test]
fn events_dispatch_in_admission_order() {
    let queue = EventQueue::new();
    let recorder = Recorder::default();

    queue.post_event(key(1));
    queue.post_event(EventKind::SizeChanged {
        width: 240,
        height: 320,
    });
    queue.post_event(EventKind::Paint);
    queue.post_event(EventKind::HideNotify);
    drain(&queue, &recorder);

    assert_eq!(
        recorder.tags(),
        vec![
            EventTag::Key,
            EventTag::SizeChanged,
            EventTag::Paint,
            EventTag::HideNotify
        ]
    );
    let ids: Vec<u64> = recorder.seen.lock().unwrap().iter().map(|(_, id)| *id).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn repost_of_queued_paint_keeps_original_position() {
    let queue = EventQueue::new();
    let recorder = Recorder::default();

    queue.post_event(key(1));
    let first = queue.post_event(EventKind::Paint);
    queue.post_event(key(2));
    let again = queue.post_event(EventKind::Paint);

    assert!(matches!(first, PostOutcome::Queued(_)));
    assert_eq!(again, PostOutcome::Coalesced);
    assert_eq!(queue.queued_count(EventTag::Paint), 1);
    assert_eq!(queue.len(), 3);

    drain(&queue, &recorder);
    assert_eq!(
        recorder.tags(),
        vec![EventTag::Key, EventTag::Paint, EventTag::Key]
    );
}

#[test]
fn non_paint_events_are_never_coalesced() {
    let queue = EventQueue::new();
    for _ in 0..3 {
        assert!(matches!(queue.post_event(key(5)), PostOutcome::Queued(_)));
        assert!(matches!(
            queue.post_event(EventKind::ShowNotify),
            PostOutcome::Queued(_)
        ));
    }
    assert_eq!(queue.queued_count(EventTag::Key), 3);
    assert_eq!(queue.queued_count(EventTag::ShowNotify), 3);
}

#[test]
fn at_most_one_paint_in_flight_and_one_pending() {
    let queue = Arc::new(EventQueue::new());
    let (started, release, dispatcher) = spawn_gated(&queue);

    queue.post_event(EventKind::Paint);
    started.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(queue.current_event(), Some(EventTag::Paint));

    // One more may queue behind the in-flight paint, the rest coalesce.
    assert!(matches!(
        queue.post_event(EventKind::Paint),
        PostOutcome::Queued(_)
    ));
    for _ in 0..10 {
        assert_eq!(queue.post_event(EventKind::Paint), PostOutcome::Coalesced);
        let in_flight = usize::from(queue.current_event() == Some(EventTag::Paint));
        assert!(queue.queued_count(EventTag::Paint) + in_flight <= 2);
    }

    release.send(()).unwrap();
    started.recv_timeout(Duration::from_secs(5)).unwrap();
    release.send(()).unwrap();
    queue.close();
    dispatcher.join().unwrap();
    assert_eq!(queue.completed_count(EventTag::Paint), 2);
}

#[test]
fn remove_events_of_absent_kind_is_a_no_op() {
    let queue = EventQueue::new();
    let recorder = Recorder::default();
    queue.post_event(key(1));
    queue.post_event(EventKind::ShowNotify);

    assert!(!queue.remove_tag(EventTag::Paint));
    assert_eq!(queue.len(), 2);

    drain(&queue, &recorder);
    assert_eq!(recorder.tags(), vec![EventTag::Key, EventTag::ShowNotify]);
}

#[test]
fn remove_events_removes_exactly_the_matching_instance() {
    let queue = EventQueue::new();
    let recorder = Recorder::default();
    queue.post_event(key(1));
    let PostOutcome::Queued(target) = queue.post_event(key(2)) else {
        panic!("key event was not queued");
    };
    queue.post_event(key(3));

    assert!(queue.remove_events(|event| event.id() == target));
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.queued_count(EventTag::Key), 2);

    drain(&queue, &recorder);
    let codes: Vec<u64> = recorder.seen.lock().unwrap().iter().map(|(_, id)| *id).collect();
    assert!(!codes.contains(&target));
    assert_eq!(codes.len(), 2);
}

struct Failing;

impl EventHandler for Failing {
    fn process(&self, event: Event) -> anyhow::Result<()> {
        match event.into_kind() {
            EventKind::Key { code: 1, .. } => anyhow::bail!("key handler failed"),
            EventKind::Key { code: 2, .. } => panic!("key handler panicked"),
            _ => Ok(()),
        }
    }
}

#[test]
fn failing_handlers_do_not_stop_the_loop() {
    let queue = EventQueue::new();
    queue.post_event(key(1));
    queue.post_event(key(2));
    queue.post_event(EventKind::Paint);

    drain(&queue, &Failing);

    assert_eq!(queue.current_event(), None);
    assert_eq!(queue.completed_count(EventTag::Key), 2);
    assert_eq!(queue.completed_count(EventTag::Paint), 1);
}

#[test]
fn tasks_run_in_queue_order() {
    let queue = EventQueue::new();
    let recorder = Recorder::default();
    let order = Arc::new(Mutex::new(Vec::new()));

    let o = Arc::clone(&order);
    queue.post_event(EventKind::Task(Task::new(move || o.lock().unwrap().push("task"))));
    queue.post_event(EventKind::Paint);
    drain(&queue, &recorder);

    assert_eq!(*order.lock().unwrap(), vec!["task"]);
    assert_eq!(recorder.tags(), vec![EventTag::Task, EventTag::Paint]);
}

#[test]
fn closed_queue_refuses_posts_and_stops_dispatch() {
    let queue = EventQueue::new();
    queue.post_event(key(1));
    queue.close();

    assert!(queue.is_closed());
    assert!(queue.is_empty());
    assert_eq!(queue.post_event(EventKind::Paint), PostOutcome::Closed);
    assert!(!queue.dequeue_and_process(&Recorder::default()));
}

#[test]
fn flush_without_paint_is_idle() {
    let queue = EventQueue::new();
    queue.post_event(key(1));
    assert!(matches!(queue.flush(EventTag::Paint, false), Flush::Idle));
    assert_eq!(queue.len(), 1);
}

#[test]
fn flush_takes_a_queued_paint() {
    let queue = EventQueue::new();
    queue.post_event(key(1));
    queue.post_event(EventKind::Paint);

    match queue.flush(EventTag::Paint, false) {
        Flush::Take(run) => {
            assert_eq!(queue.queued_count(EventTag::Paint), 0);
            assert_eq!(queue.completed_count(EventTag::Paint), 0);
            drop(run);
        }
        other => panic!("expected Take, got {:?}", other),
    }
    assert_eq!(queue.completed_count(EventTag::Paint), 1);
    assert_eq!(queue.len(), 1);
}

#[test]
fn reentrant_flush_returns_immediately() {
    let queue = EventQueue::new();
    queue.post_event(EventKind::Paint);
    assert!(matches!(queue.flush(EventTag::Paint, true), Flush::Reentrant));
    assert_eq!(queue.queued_count(EventTag::Paint), 1);
}

#[test]
fn flush_waits_for_in_flight_paint() {
    let queue = Arc::new(EventQueue::new());
    let (started, release, dispatcher) = spawn_gated(&queue);

    queue.post_event(EventKind::Paint);
    started.recv_timeout(Duration::from_secs(5)).unwrap();

    let flusher = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let outcome = matches!(queue.flush(EventTag::Paint, false), Flush::Completed);
            (outcome, queue.completed_count(EventTag::Paint))
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!flusher.is_finished());
    release.send(()).unwrap();

    let (completed, count) = flusher.join().unwrap();
    assert!(completed);
    assert!(count >= 1);

    queue.close();
    dispatcher.join().unwrap();
}

#[test]
fn flush_waits_for_inline_run_on_another_thread() {
    let queue = Arc::new(EventQueue::new());
    queue.post_event(EventKind::Paint);

    let Flush::Take(run) = queue.flush(EventTag::Paint, false) else {
        panic!("expected the queued paint to be handed over");
    };

    let waiter = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || matches!(queue.flush(EventTag::Paint, false), Flush::Completed))
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!waiter.is_finished());

    drop(run);
    assert!(waiter.join().unwrap());
}
