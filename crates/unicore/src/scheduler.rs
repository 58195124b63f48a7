// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Named Scheduler Registry
//!
//! Lazily created, named, single-threaded background execution contexts.
//!
//! # Architecture
//!
//! ```text
//! SchedulerRegistry
//! +-- entries: Mutex<HashMap<String, Arc<SchedulerEntry>>>
//!
//! SchedulerEntry (one per name)
//! +-- scheduler: Arc<Scheduler>       one worker thread, FIFO + delayed jobs
//! +-- factory:   Arc<ThreadFactory>   one-off threads named after the entry
//! ```
//!
//! # Thread Safety
//!
//! The registry lock is held across creation, so concurrent first callers for
//! one name all observe the same entry. Worker threads are detached: they exit
//! on shutdown or when the last handle is dropped.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

/// Unit of work run on a scheduler thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

enum Command {
    Run(Job),
    RunAt(Instant, Job),
    Shutdown,
}

// ============================================================================
// Delayed jobs
// ============================================================================

struct DelayedJob {
    due: Instant,
    seq: u64,
    job: Job,
}

impl PartialEq for DelayedJob {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for DelayedJob {}

impl PartialOrd for DelayedJob {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedJob {
    // Reversed: BinaryHeap is a max-heap, the earliest job must surface first.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Single-threaded background executor.
pub struct Scheduler {
    name: String,
    /// `None` once shut down.
    tx: Mutex<Option<Sender<Command>>>,
    terminated: Arc<(Mutex<bool>, Condvar)>,
}

impl Scheduler {
    /// Spawn the worker thread, named `name`.
    pub fn spawn(name: &str) -> Result<Self> {
        let (tx, rx) = unbounded();
        let terminated = Arc::new((Mutex::new(false), Condvar::new()));
        let terminated_clone = Arc::clone(&terminated);
        let worker_name = name.to_string();

        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                worker_loop(&worker_name, rx);
                let (lock, cvar) = &*terminated_clone;
                *lock.lock() = true;
                cvar.notify_all();
            })
            .map_err(|source| Error::SchedulerSpawn {
                name: name.to_string(),
                source,
            })?;

        tracing::debug!("scheduler '{}' started", name);

        Ok(Self {
            name: name.to_string(),
            tx: Mutex::new(Some(tx)),
            terminated,
        })
    }

    /// Scheduler name (also the worker thread name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a job for immediate execution.
    pub fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Command::Run(Box::new(job)))
    }

    /// Queue a job to run once `delay` has elapsed.
    ///
    /// Fails with [`Error::DelayOutOfRange`] when the due time overflows.
    pub fn schedule<F>(&self, delay: Duration, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let due = Instant::now()
            .checked_add(delay)
            .ok_or_else(|| Error::DelayOutOfRange {
                name: self.name.clone(),
                delay,
            })?;
        self.submit(Command::RunAt(due, Box::new(job)))
    }

    fn submit(&self, cmd: Command) -> Result<()> {
        let guard = self.tx.lock();
        let tx = guard
            .as_ref()
            .ok_or_else(|| Error::SchedulerShutdown(self.name.clone()))?;
        tx.send(cmd)
            .map_err(|_| Error::SchedulerShutdown(self.name.clone()))
    }

    /// Stop accepting jobs.
    ///
    /// Jobs already queued for immediate execution still run; pending delayed
    /// jobs are discarded. Does not block; see [`Self::await_termination`].
    pub fn shutdown(&self) {
        let Some(tx) = self.tx.lock().take() else {
            return;
        };
        let _ = tx.send(Command::Shutdown);
        tracing::debug!("scheduler '{}' shutdown requested", self.name);
    }

    /// Whether [`Self::shutdown`] has been called.
    pub fn is_shutdown(&self) -> bool {
        self.tx.lock().is_none()
    }

    /// Whether the worker thread has exited.
    pub fn is_terminated(&self) -> bool {
        *self.terminated.0.lock()
    }

    /// Block until the worker exits or `timeout` elapses.
    ///
    /// Returns `true` if the worker has exited.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (lock, cvar) = &*self.terminated;
        let mut done = lock.lock();
        while !*done {
            if cvar.wait_until(&mut done, deadline).timed_out() {
                return *done;
            }
        }
        true
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.name)
            .field("shutdown", &self.is_shutdown())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

fn worker_loop(name: &str, rx: Receiver<Command>) {
    let mut delayed: BinaryHeap<DelayedJob> = BinaryHeap::new();
    let mut seq: u64 = 0;

    loop {
        let now = Instant::now();
        while delayed.peek().is_some_and(|next| next.due <= now) {
            if let Some(next) = delayed.pop() {
                run_job(name, next.job);
            }
        }

        let cmd = match delayed.peek() {
            Some(next) => match rx.recv_deadline(next.due) {
                Ok(cmd) => cmd,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(cmd) => cmd,
                Err(_) => break,
            },
        };

        match cmd {
            Command::Run(job) => run_job(name, job),
            Command::RunAt(due, job) => {
                delayed.push(DelayedJob { due, seq, job });
                seq = seq.wrapping_add(1);
            }
            Command::Shutdown => break,
        }
    }

    if !delayed.is_empty() {
        tracing::debug!(
            "scheduler '{}' discarded {} pending delayed job(s)",
            name,
            delayed.len()
        );
    }
    tracing::debug!("scheduler '{}' stopped", name);
}

fn run_job(name: &str, job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        tracing::error!("scheduler '{}': job panicked", name);
    }
}

// ============================================================================
// ThreadFactory
// ============================================================================

/// Spawns one-off threads named `<name>-<n>`.
#[derive(Debug)]
pub struct ThreadFactory {
    name: String,
    counter: AtomicUsize,
}

impl ThreadFactory {
    /// Factory for threads prefixed with `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            counter: AtomicUsize::new(0),
        }
    }

    /// Name prefix of spawned threads.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn a thread running `job`.
    pub fn new_thread<F>(&self, job: F) -> Result<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let thread_name = format!("{}-{}", self.name, n);
        thread::Builder::new()
            .name(thread_name.clone())
            .spawn(job)
            .map_err(|source| Error::SchedulerSpawn {
                name: thread_name,
                source,
            })
    }
}

// ============================================================================
// Registry
// ============================================================================

/// A named scheduler and its matching thread factory.
#[derive(Debug)]
pub struct SchedulerEntry {
    scheduler: Arc<Scheduler>,
    factory: Arc<ThreadFactory>,
}

impl SchedulerEntry {
    fn create(name: &str) -> Result<Self> {
        Ok(Self {
            scheduler: Arc::new(Scheduler::spawn(name)?),
            factory: Arc::new(ThreadFactory::new(name)),
        })
    }

    /// Background executor.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// One-off thread factory.
    pub fn factory(&self) -> &Arc<ThreadFactory> {
        &self.factory
    }
}

/// Name -> scheduler entry map.
#[derive(Debug, Default)]
pub struct SchedulerRegistry {
    entries: Mutex<HashMap<String, Arc<SchedulerEntry>>>,
}

impl SchedulerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing entry for `name`, or a freshly spawned one.
    pub fn get_or_create(&self, name: &str) -> Result<Arc<SchedulerEntry>> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(name) {
            return Ok(Arc::clone(entry));
        }

        let entry = Arc::new(SchedulerEntry::create(name)?);
        entries.insert(name.to_string(), Arc::clone(&entry));
        Ok(entry)
    }

    /// Executor half of [`Self::get_or_create`].
    pub fn thread_pool(&self, name: &str) -> Result<Arc<Scheduler>> {
        Ok(Arc::clone(self.get_or_create(name)?.scheduler()))
    }

    /// Factory half of [`Self::get_or_create`].
    pub fn thread_factory(&self, name: &str) -> Result<Arc<ThreadFactory>> {
        Ok(Arc::clone(self.get_or_create(name)?.factory()))
    }

    /// Registered entry, without creating one.
    pub fn get(&self, name: &str) -> Option<Arc<SchedulerEntry>> {
        self.entries.lock().get(name).cloned()
    }

    /// Shut down and unregister `name`. Returns `false` if absent.
    pub fn shutdown(&self, name: &str) -> bool {
        let removed = self.entries.lock().remove(name);
        match removed {
            Some(entry) => {
                entry.scheduler.shutdown();
                true
            }
            None => false,
        }
    }

    /// Shut down and unregister every entry.
    pub fn shutdown_all(&self) {
        let drained: Vec<Arc<SchedulerEntry>> =
            self.entries.lock().drain().map(|(_, entry)| entry).collect();
        for entry in drained {
            entry.scheduler.shutdown();
        }
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no entry is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
