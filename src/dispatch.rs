// src/dispatch.rs

//! The dispatch thread: drains an [`EventQueue`] into an [`EventHandler`]
//! until the queue is closed.

use crate::event::{EventHandler, EventQueue};
use anyhow::{Context, Result};
use log::*;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Owns the dispatch thread. Dropping it closes the queue and joins.
pub struct Dispatcher {
    queue: Arc<EventQueue>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Spawns the dispatch thread.
    ///
    /// # Arguments
    ///
    /// * `queue` - Queue to drain
    /// * `handler` - Receives every dequeued event, in order
    pub fn spawn<H>(queue: Arc<EventQueue>, handler: H) -> Result<Self>
    where
        H: EventHandler + Send + 'static,
    {
        let thread_queue = Arc::clone(&queue);
        let thread_handle = thread::Builder::new()
            .name("lcdui-dispatch".to_string())
            .spawn(move || {
                info!("Dispatcher: Started");
                let mut processed: u64 = 0;
                while thread_queue.dequeue_and_process(&handler) {
                    processed += 1;
                }
                debug!("Dispatcher: Thread exiting after {} events", processed);
            })
            .context("Failed to spawn dispatch thread")?;

        info!("Dispatcher spawned successfully");
        Ok(Self {
            queue,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    /// Closes the queue and waits for the in-flight event to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.queue.close();
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                error!("Dispatcher thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        debug!("Dispatcher dropped");
        self.stop();
    }
}
