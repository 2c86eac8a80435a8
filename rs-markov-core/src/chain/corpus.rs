use std::path::Path;
use std::thread;

use log::info;

use super::LOG_TARGET;
use super::markov_chain::Chain;
use crate::error::{ChainError, Result};
use crate::io::read_file;

impl Chain {
	/// Trains every line as an independent message, in parallel.
	///
	/// # Behavior
	/// - Splits the lines into chunks (based on CPU cores * factor).
	/// - Spawns scoped threads that each call [`Chain::train`] on their chunk.
	/// - Sums the bytes processed by every thread.
	///
	/// # Notes
	/// - Each line starts from a fresh window, exactly like a call to `train`.
	/// - The resulting table holds the same observations as training the lines
	///   sequentially; only the order of successors within an entry may differ.
	pub fn train_lines<S: AsRef<str> + Sync>(&self, lines: &[S]) -> usize {
		if lines.is_empty() {
			return 0;
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = lines.len().div_ceil(chunks);

		thread::scope(|scope| {
			let workers: Vec<_> = lines
				.chunks(chunk_size)
				.map(|chunk| {
					scope.spawn(move || chunk.iter().map(|line| self.train(line.as_ref())).sum::<usize>())
				})
				.collect();

			workers
				.into_iter()
				.map(|worker| worker.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
				.sum()
		})
	}

	/// Reads a text file and trains each non-blank line as a message.
	///
	/// # Errors
	/// Returns `ChainError::Io` if the file cannot be read.
	pub fn train_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
		let path = path.as_ref();
		let lines = read_file(path).map_err(|e| ChainError::io(e, path))?;
		let bytes = self.train_lines(&lines);
		info!(
			target: LOG_TARGET,
			"Trained {} lines ({} bytes) from '{}', {} windows in chain",
			lines.len(),
			bytes,
			path.display(),
			self.len()
		);
		Ok(bytes)
	}
}
