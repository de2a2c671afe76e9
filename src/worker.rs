//! Bounded pool of detached worker threads.
//!
//! The reactor publishes ready work into a single mutex-guarded FIFO; a
//! counting semaphore tracks how many items are queued. Workers wait on the
//! semaphore, pop the head, and run the task. The queue is bounded so a
//! flood of readiness turns into rejected admissions instead of unbounded
//! memory growth.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::debug;

use crate::sync::Semaphore;

/// A unit of work the pool can run.
pub trait Task: Send + 'static {
    /// Drives the task to its next suspension point.
    fn process(&self);
}

/// Fixed-size pool of detached worker threads fed from a bounded FIFO.
#[derive(Debug)]
pub struct WorkerPool<T: Task> {
    shared: Arc<Shared<T>>,
}

#[derive(Debug)]
struct Shared<T> {
    queue: Mutex<VecDeque<T>>,
    pending: Semaphore,
    max_queued: usize,
}

impl<T: Task> WorkerPool<T> {
    /// Spawns `workers` detached threads draining a queue bounded at
    /// `max_queued` items. A pool with zero workers only queues.
    pub fn new(workers: usize, max_queued: usize) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            pending: Semaphore::new(),
            max_queued,
        });

        for id in 0..workers {
            let shared = shared.clone();
            debug!(id, "starting worker");
            // The handle is dropped on purpose: workers live for the whole
            // process, there is no shutdown.
            let _ = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || run(shared));
        }

        Self { shared }
    }

    /// Enqueues `task`, rejecting it when the queue is at capacity.
    pub fn append(&self, task: T) -> bool {
        let mut queue = self.shared.queue.lock().unwrap();
        if queue.len() >= self.shared.max_queued {
            return false;
        }
        queue.push_back(task);
        drop(queue);
        self.shared.pending.post();
        true
    }
}

fn run<T: Task>(shared: Arc<Shared<T>>) {
    loop {
        shared.pending.wait();
        let task = shared.queue.lock().unwrap().pop_front();
        if let Some(task) = task {
            task.process();
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::mpsc::{channel, Sender};
    use std::time::Duration;

    use super::{Task, WorkerPool};

    struct Ping(Sender<usize>, usize);

    impl Task for Ping {
        fn process(&self) {
            self.0.send(self.1).unwrap();
        }
    }

    #[test]
    fn pool_runs_every_appended_task() {
        let pool = WorkerPool::new(4, 100);
        let (tx, rx) = channel();

        for id in 0..100 {
            assert!(pool.append(Ping(tx.clone(), id)));
        }

        let mut seen: Vec<usize> = (0..100)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        seen.sort_unstable();
        assert_eq!((0..100).collect::<Vec<_>>(), seen);
    }

    #[test]
    fn pool_rejects_when_queue_is_full() {
        // No workers: the queue fills deterministically.
        let pool = WorkerPool::new(0, 2);
        let (tx, _rx) = channel();

        assert!(pool.append(Ping(tx.clone(), 0)));
        assert!(pool.append(Ping(tx.clone(), 1)));
        assert!(!pool.append(Ping(tx, 2)));
        assert_eq!(2, pool.shared.queue.lock().unwrap().len());
    }

    #[test]
    fn single_worker_preserves_fifo_order() {
        let pool = WorkerPool::new(1, 100);
        let (tx, rx) = channel();

        for id in 0..50 {
            assert!(pool.append(Ping(tx.clone(), id)));
        }

        for expected in 0..50 {
            assert_eq!(
                expected,
                rx.recv_timeout(Duration::from_secs(5)).unwrap()
            );
        }
    }
}
