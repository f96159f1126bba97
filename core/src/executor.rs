//! The shared background execution context.
//!
//! One worker thread drains a FIFO job queue, so everything I/O or voxel
//! bound runs off the caller's thread. Jobs run in submission order;
//! `flush` returning means every earlier job has finished.

use crate::error::{MapError, MapResult};
use crossbeam::channel::{self, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct BackgroundExecutor {
    sender: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundExecutor {
    pub fn start(name: &str) -> MapResult<Self> {
        let (sender, receiver) = channel::unbounded::<Job>();
        let worker = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for job in receiver {
                    // A panicking job ends that job only; the worker keeps serving.
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        log::error!("background job panicked; continuing with the next job");
                    }
                }
            })?;
        Ok(Self { sender: Some(sender), worker: Some(worker) })
    }

    /// Queue a job; its result arrives through the returned handle.
    pub fn submit<T, F>(&self, job: F) -> MapResult<JobHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(MapError::ExecutorStopped)?;
        let (tx, rx) = channel::bounded(1);
        sender
            .send(Box::new(move || {
                let _ = tx.send(job());
            }))
            .map_err(|_| MapError::ExecutorStopped)?;
        Ok(JobHandle { rx })
    }

    /// Block until every job submitted so far has run.
    pub fn flush(&self) -> MapResult<()> {
        self.submit(|| ())?.wait()
    }
}

impl Drop for BackgroundExecutor {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Result slot of a submitted job.
pub struct JobHandle<T> {
    rx: Receiver<T>,
}

impl<T> JobHandle<T> {
    /// Block until the job finished. Fails if the job panicked.
    pub fn wait(self) -> MapResult<T> {
        self.rx.recv().map_err(|_| MapError::ExecutorStopped)
    }
}
