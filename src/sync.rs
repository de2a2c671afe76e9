//! Counting semaphore used by the worker pool queue.

use std::sync::{Condvar, Mutex};

/// A counting semaphore built from a mutex and a condition variable.
///
/// `post` makes one unit available, `wait` blocks until a unit can be taken.
#[derive(Debug, Default)]
pub(crate) struct Semaphore {
    count: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn post(&self) {
        let mut count = self.count.lock().unwrap();
        *count += 1;
        drop(count);
        self.available.notify_one();
    }

    pub(crate) fn wait(&self) {
        let mut count = self.count.lock().unwrap();
        while *count == 0 {
            count = self.available.wait(count).unwrap();
        }
        *count -= 1;
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::thread;

    use super::Semaphore;

    #[test]
    fn wait_consumes_posted_units() {
        let sem = Semaphore::new();
        sem.post();
        sem.post();
        sem.wait();
        sem.wait();
        assert_eq!(0, *sem.count.lock().unwrap());
    }

    #[test]
    fn wait_blocks_until_post() {
        let sem = Arc::new(Semaphore::new());
        let waiter = {
            let sem = sem.clone();
            thread::spawn(move || sem.wait())
        };
        sem.post();
        waiter.join().unwrap();
    }
}
