//! Serialized "main" execution context
//!
//! Provider callbacks run on arbitrary worker threads. Anything that touches
//! listener-facing state is posted here and executed one task at a time, in
//! posting order, by whoever drives the `MainLoop`.

use tokio::sync::{mpsc, oneshot};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable handle used to post work onto the main context
#[derive(Clone)]
pub struct MainHandle {
    tx: mpsc::UnboundedSender<Task>,
}

/// Receiving end; run it on exactly one task or thread
pub struct MainLoop {
    rx: mpsc::UnboundedReceiver<Task>,
}

/// Create a connected handle/loop pair
pub fn main_context() -> (MainHandle, MainLoop) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MainHandle { tx }, MainLoop { rx })
}

impl MainHandle {
    /// Queue `task`; returns false if the loop is gone and the task was dropped
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let posted = self.tx.send(Box::new(task)).is_ok();
        if !posted {
            tracing::debug!("Main context closed, dropping task");
        }
        posted
    }

    /// Wait until everything posted before this call has run
    ///
    /// Must not be awaited from inside a main-context task.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.post(move || {
            let _ = done_tx.send(());
        }) {
            let _ = done_rx.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl MainLoop {
    /// Run tasks until every handle is dropped
    pub async fn run(mut self) {
        while let Some(task) = self.rx.recv().await {
            task();
        }
        tracing::debug!("Main context finished");
    }

    /// Run everything queued right now without waiting; returns the count
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_tasks_run_in_posting_order() {
        let (handle, mut main) = main_context();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let seen = seen.clone();
            assert!(handle.post(move || seen.lock().push(i)));
        }

        assert!(seen.lock().is_empty());
        assert_eq!(main.run_pending(), 5);
        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_post_after_loop_dropped() {
        let (handle, main) = main_context();
        drop(main);

        assert!(handle.is_closed());
        assert!(!handle.post(|| {}));
    }

    #[tokio::test]
    async fn test_flush_waits_for_earlier_tasks() {
        let (handle, main) = main_context();
        let runner = tokio::spawn(main.run());

        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        handle.post(move || *counter.lock() += 1);
        handle.flush().await;

        assert_eq!(*seen.lock(), 1);

        drop(handle);
        runner.await.unwrap();
    }
}
