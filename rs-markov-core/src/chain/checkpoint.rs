use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info};

use super::LOG_TARGET;
use super::markov_chain::Chain;
use crate::error::{ChainError, Result};

/// What the checkpoint task does after a failed save.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
	/// Log the failure and terminate the task for good.
	Stop,
	/// Log the failure and try again on the next tick.
	#[default]
	Continue,
}

/// Counters shared between a checkpoint task and its handle.
#[derive(Debug, Default)]
pub struct CheckpointStatus {
	attempts: AtomicUsize,
	successes: AtomicUsize,
	failures: AtomicUsize,
	running: AtomicBool,
}

impl CheckpointStatus {
	/// Number of ticks that tried to save.
	pub fn attempts(&self) -> usize {
		self.attempts.load(Ordering::SeqCst)
	}

	/// Number of snapshots written.
	pub fn successes(&self) -> usize {
		self.successes.load(Ordering::SeqCst)
	}

	/// Number of failed saves.
	pub fn failures(&self) -> usize {
		self.failures.load(Ordering::SeqCst)
	}

	/// Whether the task is still ticking.
	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::SeqCst)
	}
}

/// Handle on a running checkpoint task.
///
/// The task is stopped and joined by [`CheckpointHandle::stop`] or when the
/// handle is dropped, so a host keeps the handle alive for as long as
/// checkpoints should happen.
#[derive(Debug)]
pub struct CheckpointHandle {
	shutdown: Option<Sender<()>>,
	worker: Option<JoinHandle<()>>,
	status: Arc<CheckpointStatus>,
}

impl CheckpointHandle {
	/// Live counters of the task.
	pub fn status(&self) -> &CheckpointStatus {
		&self.status
	}

	/// Signals the task and waits for it to finish.
	///
	/// A save already in progress completes first.
	pub fn stop(mut self) {
		self.shutdown();
	}

	fn shutdown(&mut self) {
		if let Some(shutdown) = self.shutdown.take() {
			// The task may already have terminated on its own
			let _ = shutdown.send(());
		}
		if let Some(worker) = self.worker.take() {
			if worker.join().is_err() {
				error!(target: LOG_TARGET, "checkpoint task panicked");
			}
		}
	}
}

impl Drop for CheckpointHandle {
	fn drop(&mut self) {
		self.shutdown();
	}
}

impl Chain {
	/// Starts a background task saving the chain to `path` every `interval`.
	///
	/// The first checkpoint happens one interval after the call. Ticks missed
	/// while a slow save runs are skipped rather than queued. After a failed
	/// save the task follows `policy`.
	///
	/// # Errors
	/// - `ChainError::InvalidInterval` for a zero interval
	/// - `ChainError::Io` if the thread cannot be spawned
	pub fn run_periodic_save<P: Into<PathBuf>>(
		self: &Arc<Self>,
		interval: Duration,
		path: P,
		policy: FailurePolicy,
	) -> Result<CheckpointHandle> {
		if interval.is_zero() {
			return Err(ChainError::InvalidInterval);
		}

		let path = path.into();
		let chain = Arc::clone(self);
		let status = Arc::new(CheckpointStatus::default());
		let task_status = Arc::clone(&status);
		let (shutdown, signal) = mpsc::channel::<()>();

		info!(target: LOG_TARGET, "Starting state save ticker with {:?} interval", interval);
		status.running.store(true, Ordering::SeqCst);

		let worker = thread::Builder::new()
			.name("markov-checkpoint".to_owned())
			.spawn(move || {
				let mut next_tick = Instant::now() + interval;
				loop {
					match signal.recv_timeout(next_tick.saturating_duration_since(Instant::now())) {
						Err(RecvTimeoutError::Timeout) => (),
						Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
					}

					let tick = Instant::now();
					while next_tick <= tick {
						next_tick += interval;
					}

					task_status.attempts.fetch_add(1, Ordering::SeqCst);
					match chain.save(&path) {
						Ok(()) => {
							task_status.successes.fetch_add(1, Ordering::SeqCst);
							debug!(
								target: LOG_TARGET,
								"checkpoint completed in {:?}, {} windows in chain",
								tick.elapsed(),
								chain.len()
							);
						}
						Err(e) => {
							task_status.failures.fetch_add(1, Ordering::SeqCst);
							error!(target: LOG_TARGET, "checkpoint failed after {:?}: {}", tick.elapsed(), e);
							if policy == FailurePolicy::Stop {
								break;
							}
						}
					}
				}
				task_status.running.store(false, Ordering::SeqCst);
				info!(target: LOG_TARGET, "State save ticker stopped");
			});

		let worker = match worker {
			Ok(worker) => worker,
			Err(e) => {
				status.running.store(false, Ordering::SeqCst);
				return Err(ChainError::Io { source: e, path: None });
			}
		};

		Ok(CheckpointHandle {
			shutdown: Some(shutdown),
			worker: Some(worker),
			status,
		})
	}
}
