//! Per-tab cooperative FIFO task queue on a dedicated OS thread,
//! grounded directly on `original_source/task.py`'s `Task`/`TaskRunner`
//! (spec.md §5 "Task queue").

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

/// An opaque unit of work: a boxed closure plus whatever it closed
/// over, matching `Task`'s "callable + args" (spec.md §5).
pub type Task = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    tasks: Mutex<VecDeque<Task>>,
    condvar: Condvar,
    needs_quit: Mutex<bool>,
}

/// Schedules tasks onto a dedicated worker thread; the thread idles on
/// its condition variable whenever the queue is empty (spec.md §5: "The
/// worker loop: under the cv, check needs_quit ... pop one task;
/// release; run the task outside the lock; re-acquire and wait if the
/// queue is empty").
pub struct TaskRunner {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl TaskRunner {
    #[must_use]
    pub fn start(thread_name: impl Into<String>) -> Self {
        let shared = Arc::new(Shared {
            tasks: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            needs_quit: Mutex::new(false),
        });
        let worker_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name(thread_name.into())
            .spawn(move || worker_loop(&worker_shared))
            .ok();
        Self { shared, handle }
    }

    /// Appends a task and wakes the worker (spec.md §5: "`schedule_task`
    /// appends and notifies").
    pub fn schedule_task(&self, task: Task) {
        let mut tasks = self.shared.tasks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        tasks.push_back(task);
        self.shared.condvar.notify_all();
    }

    /// Drops queued work without interrupting a task already running
    /// (spec.md §5 "Cancellation"). Called on load and navigation.
    pub fn clear_pending_tasks(&self) {
        let mut tasks = self.shared.tasks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        tasks.clear();
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared.tasks.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    /// Causes the worker to exit at its next queue check; does not
    /// interrupt a running task.
    pub fn set_needs_quit(&self) {
        let mut needs_quit = self.shared.needs_quit.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *needs_quit = true;
        self.shared.condvar.notify_all();
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        self.set_needs_quit();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop(shared: &Arc<Shared>) {
    loop {
        if *shared.needs_quit.lock().unwrap_or_else(std::sync::PoisonError::into_inner) {
            return;
        }

        let task = {
            let mut tasks = shared.tasks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            tasks.pop_front()
        };
        if let Some(task) = task {
            task();
        }

        let tasks = shared.tasks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if tasks.is_empty() && !*shared.needs_quit.lock().unwrap_or_else(std::sync::PoisonError::into_inner) {
            let _guard = shared
                .condvar
                .wait_timeout(tasks, std::time::Duration::from_millis(50))
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test code may use unwrap for simplicity")]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn scheduled_tasks_run_fifo() {
        let runner = TaskRunner::start("test-tab");
        let (tx, rx) = mpsc::channel();
        for i in 0..3 {
            let tx = tx.clone();
            runner.schedule_task(Box::new(move || tx.send(i).unwrap()));
        }
        let mut received = Vec::new();
        for _ in 0..3 {
            received.push(rx.recv_timeout(Duration::from_secs(2)).unwrap());
        }
        assert_eq!(received, vec![0, 1, 2]);
    }

    #[test]
    fn clear_pending_tasks_drops_unstarted_work() {
        let runner = TaskRunner::start("test-tab-clear");
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel();
        runner.schedule_task(Box::new(move || {
            let _ = release_rx.recv_timeout(Duration::from_secs(2));
            done_tx.send("first").unwrap();
        }));
        // Give the worker a moment to pop the first (blocked) task before
        // queuing more, so the next ones are still sitting in the queue.
        std::thread::sleep(Duration::from_millis(50));
        let (tx2, rx2) = mpsc::channel();
        runner.schedule_task(Box::new(move || tx2.send("second").unwrap()));
        runner.clear_pending_tasks();
        release_tx.send(()).unwrap();

        assert_eq!(done_rx.recv_timeout(Duration::from_secs(2)).unwrap(), "first");
        assert!(rx2.try_recv().is_err());
    }
}
