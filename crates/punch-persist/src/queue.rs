use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, Span};

use crate::error::{PersistError, Result};

/// A unit of background work, typically "write this file" or "delete this
/// file". Errors are logged by the worker, never returned to the caller that
/// enqueued the action.
pub type Action = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

enum Job {
    Run(Action),
    /// Acknowledged once every job queued before it has finished.
    Barrier(Sender<()>),
}

/// Single-worker FIFO queue for side-effecting actions.
///
/// One dedicated thread pulls actions off an unbounded channel and runs them
/// one at a time, in the order they were enqueued. Enqueueing never blocks on
/// I/O. An action that fails or panics is logged and the worker moves on to
/// the next one.
///
/// Shutdown is two-phase: [`stop`](WriteQueue::stop) first refuses new work,
/// then closes the channel and waits for the worker to drain everything that
/// was already accepted. Nothing accepted is ever dropped.
pub struct WriteQueue {
    name: String,
    sender: RwLock<Option<Sender<Job>>>,
    stopping: AtomicBool,
    pending: Arc<AtomicUsize>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WriteQueue {
    /// Spawn the worker thread. The worker enters `span` for its whole life,
    /// so everything it logs carries the owner's context.
    pub fn start(name: impl Into<String>, span: Span) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = channel::unbounded();
        let pending = Arc::new(AtomicUsize::new(0));

        let worker_pending = Arc::clone(&pending);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _entered = span.enter();
                worker_loop(receiver, worker_pending);
            })
            .map_err(PersistError::WorkerSpawn)?;

        debug!(worker = %name, "write queue started");
        Ok(Self {
            name,
            sender: RwLock::new(Some(sender)),
            stopping: AtomicBool::new(false),
            pending,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Append one action. Fails with [`PersistError::QueueStopping`] once
    /// [`stop`](WriteQueue::stop) has been called.
    pub fn enqueue<F>(&self, action: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.enqueue_batch(vec![Box::new(action)])
    }

    /// Append several actions as one unit: either all are accepted, in order,
    /// or none are.
    pub fn enqueue_batch(&self, actions: Vec<Action>) -> Result<()> {
        let sender = self.sender.read();
        let tx = match sender.as_ref() {
            Some(tx) if !self.stopping.load(Ordering::Acquire) => tx,
            _ => return Err(PersistError::QueueStopping),
        };

        let total = actions.len();
        self.pending.fetch_add(total, Ordering::AcqRel);
        for (index, action) in actions.into_iter().enumerate() {
            if tx.send(Job::Run(action)).is_err() {
                self.pending.fetch_sub(total - index, Ordering::AcqRel);
                return Err(PersistError::WorkerClosed);
            }
        }
        Ok(())
    }

    /// Block until every action enqueued before this call has run. The queue
    /// keeps accepting work.
    pub fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = channel::bounded(1);
        {
            let sender = self.sender.read();
            let tx = match sender.as_ref() {
                Some(tx) if !self.stopping.load(Ordering::Acquire) => tx,
                _ => return Err(PersistError::QueueStopping),
            };
            tx.send(Job::Barrier(ack_tx))
                .map_err(|_| PersistError::WorkerClosed)?;
        }
        ack_rx.recv().map_err(|_| PersistError::WorkerClosed)
    }

    /// Stop accepting work, drain what is queued, and join the worker.
    ///
    /// Safe to call more than once; later calls wait for the first to finish.
    pub fn stop(&self) {
        if !self.stopping.swap(true, Ordering::AcqRel) {
            info!(worker = %self.name, pending = self.pending(), "write queue stopping");
        }
        drop(self.sender.write().take());

        let mut worker = self.worker.lock();
        if let Some(handle) = worker.take() {
            match handle.join() {
                Ok(()) => debug!(worker = %self.name, "write queue drained"),
                Err(_) => error!(worker = %self.name, "write queue worker panicked"),
            }
        }
    }

    /// Returns `true` once [`stop`](WriteQueue::stop) has been called.
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Actions accepted but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Name of the worker thread.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for WriteQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for WriteQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteQueue")
            .field("name", &self.name)
            .field("stopping", &self.is_stopping())
            .field("pending", &self.pending())
            .finish()
    }
}

fn worker_loop(jobs: Receiver<Job>, pending: Arc<AtomicUsize>) {
    // `iter` ends only once every sender is gone and the channel is empty.
    for job in jobs.iter() {
        match job {
            Job::Run(action) => {
                match panic::catch_unwind(AssertUnwindSafe(action)) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!(error = %e, "queued write failed"),
                    Err(payload) => {
                        error!(panic = %panic_message(payload.as_ref()), "queued write panicked")
                    }
                }
                pending.fetch_sub(1, Ordering::AcqRel);
            }
            Job::Barrier(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
