//! Cross-thread queues: deferred main-thread work and the key-event
//! channel the native loop drains.
//!
//! Both are plain FIFO queues behind a mutex. Tasks and events run or
//! arrive in post order within a queue; there is no ordering guarantee
//! against anything else.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::input_bridge::KeyEventSink;
use crate::key_event::KeyEvent;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// FIFO task queue drained on the UI thread.
///
/// `post` may be called from any thread. Once the handler is shut down
/// (activity destroyed), posted tasks are dropped and never run.
#[derive(Clone)]
pub struct MainThreadHandler {
    inner: Arc<HandlerInner>,
}

struct HandlerInner {
    queue: Mutex<VecDeque<Task>>,
    alive: AtomicBool,
}

impl MainThreadHandler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HandlerInner {
                queue: Mutex::new(VecDeque::new()),
                alive: AtomicBool::new(true),
            }),
        }
    }

    /// Enqueue a task for the next drain. Returns `false` when the
    /// handler is shut down and the task was dropped.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) -> bool {
        if !self.inner.alive.load(Ordering::Acquire) {
            log::debug!("task posted after shutdown, dropped");
            return false;
        }
        self.inner
            .queue
            .lock()
            .expect("handler queue poisoned")
            .push_back(Box::new(task));
        true
    }

    /// Run everything queued so far, in post order, and report how many
    /// tasks ran. Tasks posted while draining wait for the next drain.
    pub fn run_pending(&self) -> usize {
        let drained: Vec<Task> = {
            let mut queue = self.inner.queue.lock().expect("handler queue poisoned");
            queue.drain(..).collect()
        };
        let count = drained.len();
        for task in drained {
            task();
        }
        count
    }

    /// Stop accepting work and discard anything still queued.
    pub fn shutdown(&self) {
        self.inner.alive.store(false, Ordering::Release);
        self.inner
            .queue
            .lock()
            .expect("handler queue poisoned")
            .clear();
    }

    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::Acquire)
    }
}

impl Default for MainThreadHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// The uniform key-event channel between the dispatch side and the native
/// application loop.
#[derive(Clone, Default)]
pub struct KeyEventQueue {
    inner: Arc<Mutex<VecDeque<KeyEvent>>>,
}

impl KeyEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: KeyEvent) {
        self.inner
            .lock()
            .expect("key queue poisoned")
            .push_back(event);
    }

    /// Next pending event, oldest first.
    pub fn poll(&self) -> Option<KeyEvent> {
        self.inner.lock().expect("key queue poisoned").pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("key queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyEventSink for KeyEventQueue {
    fn dispatch_key_event(&self, event: KeyEvent) {
        self.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn tasks_run_in_post_order() {
        let handler = MainThreadHandler::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = Arc::clone(&order);
            handler.post(move || order.lock().unwrap().push(i));
        }

        assert_eq!(handler.run_pending(), 3);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn nothing_runs_before_the_drain() {
        let handler = MainThreadHandler::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        handler.post(move || flag.store(true, Ordering::SeqCst));

        assert!(!ran.load(Ordering::SeqCst));
        handler.run_pending();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn task_posted_while_draining_waits_for_next_drain() {
        let handler = MainThreadHandler::new();
        let count = Arc::new(AtomicUsize::new(0));

        let inner_handler = handler.clone();
        let inner_count = Arc::clone(&count);
        handler.post(move || {
            let nested = Arc::clone(&inner_count);
            inner_handler.post(move || {
                nested.fetch_add(1, Ordering::SeqCst);
            });
        });

        assert_eq!(handler.run_pending(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(handler.run_pending(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn posts_after_shutdown_are_dropped() {
        let handler = MainThreadHandler::new();
        handler.shutdown();

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        assert!(!handler.post(move || flag.store(true, Ordering::SeqCst)));
        assert_eq!(handler.run_pending(), 0);
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn shutdown_discards_queued_tasks() {
        let handler = MainThreadHandler::new();
        handler.post(|| {});
        handler.shutdown();
        assert_eq!(handler.run_pending(), 0);
    }

    #[test]
    fn key_events_poll_in_push_order() {
        let queue = KeyEventQueue::new();
        queue.push(KeyEvent::synthetic_char('a', 1));
        queue.push(KeyEvent::synthetic_char('b', 2));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.poll().unwrap().scan_code, 97);
        assert_eq!(queue.poll().unwrap().scan_code, 98);
        assert!(queue.poll().is_none());
        assert!(queue.is_empty());
    }
}
