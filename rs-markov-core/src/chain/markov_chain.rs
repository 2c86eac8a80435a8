use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::debug;
use rand::prelude::{IndexedRandom, IteratorRandom};
use serde::Serialize;

use super::start_seed::StartSeed;
use super::window::Window;
use super::LOG_TARGET;
use crate::error::{ChainError, Result};

/// Mapping from a canonical window key to every successor observed after it.
pub(crate) type Table = HashMap<String, Vec<String>>;

/// Word-level Markov chain over fixed-width windows.
///
/// The `Chain` maps the canonical key of a [`Window`] to the ordered list of
/// tokens that followed it during training. Duplicates are kept, so a
/// successor's multiplicity is its empirical frequency and picking uniformly
/// from the list reproduces the observed distribution.
///
/// # Responsibilities
/// - Fold training messages into the table
/// - Walk the table at random to generate text
/// - Hand out the table to the snapshot codec and the checkpoint scheduler
///
/// # Invariants
/// - `prefix_len` is always >= 1 and never changes
/// - The table is only ever appended to, except when a snapshot replaces it whole
/// - Every access goes through the single table lock, so train, generate,
///   load and save are totally ordered against each other
#[derive(Debug)]
pub struct Chain {
	/// Number of tokens in a window
	prefix_len: usize,

	/// Window key → successors, duplicates retained
	table: Mutex<Table>,
}

/// Size of a chain at a point in time.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainStats {
	/// Number of distinct windows
	pub prefixes: usize,
	/// Number of successor observations over all windows
	pub suffixes: usize,
}

impl Chain {
	/// Creates an empty chain whose windows hold `prefix_len` tokens.
	///
	/// # Errors
	/// Returns an error if `prefix_len == 0`.
	pub fn new(prefix_len: usize) -> Result<Self> {
		if prefix_len == 0 {
			return Err(ChainError::InvalidPrefixLength(prefix_len));
		}
		Ok(Self { prefix_len, table: Mutex::new(HashMap::new()) })
	}

	/// Number of tokens in a window.
	pub fn prefix_len(&self) -> usize {
		self.prefix_len
	}

	/// Acquires the table lock.
	///
	/// The table is append-only, so a panic in another holder cannot leave a
	/// torn entry behind: a poisoned lock is simply recovered.
	pub(crate) fn table(&self) -> MutexGuard<'_, Table> {
		self.table.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Replaces the whole table, used when a snapshot is loaded.
	pub(crate) fn replace_table(&self, table: Table) {
		*self.table() = table;
	}

	/// Adds a message to the chain.
	///
	/// The text is split on whitespace. Starting from an all-empty window,
	/// each token is appended to the successors of the current window, then
	/// the window advances over it.
	///
	/// The whole message is folded in a single critical section, so the
	/// observations of one message are never interleaved with another trainer's.
	///
	/// Returns the length of `text` in bytes.
	pub fn train(&self, text: &str) -> usize {
		let mut window = Window::new(self.prefix_len);
		let mut table = self.table();
		for token in text.split_whitespace() {
			table.entry(window.key()).or_default().push(token.to_owned());
			window.advance(token);
		}
		text.len()
	}

	/// Generates up to `max_tokens` words by random walk.
	///
	/// Each step looks up the successors of the current window and picks one
	/// uniformly at random. Generation stops early on a window without
	/// successors (a terminal state), so the result may be shorter than
	/// requested or empty.
	///
	/// The walk holds the table lock for its whole duration and therefore
	/// always observes a consistent table.
	///
	/// Returns the space-joined words and the time spent in the call.
	pub fn generate(&self, max_tokens: usize, seed: &StartSeed) -> (String, Duration) {
		let started = Instant::now();
		let table = self.table();
		let mut rng = rand::rng();

		let Some(mut window) = self.start_window(&table, seed) else {
			return (String::new(), started.elapsed());
		};

		let mut words: Vec<&str> = Vec::new();
		for _ in 0..max_tokens {
			let next = match table.get(&window.key()).and_then(|choices| choices.choose(&mut rng)) {
				Some(next) => next,
				None => break,
			};
			words.push(next);
			debug!(target: LOG_TARGET, "Generating Markov chain '{:?}'", words);
			window.advance(next);
		}

		(words.join(" "), started.elapsed())
	}

	/// Resolves the window a generation starts from.
	///
	/// Returns `None` when a random seed is requested from an empty chain.
	fn start_window(&self, table: &Table, seed: &StartSeed) -> Option<Window> {
		match seed {
			StartSeed::Empty => Some(Window::new(self.prefix_len)),
			StartSeed::Custom(text) => {
				let mut window = Window::new(self.prefix_len);
				for token in text.split_whitespace() {
					window.advance(token);
				}
				Some(window)
			}
			StartSeed::Random => {
				let key = table.keys().choose(&mut rand::rng())?;
				Window::from_key(key, self.prefix_len)
			}
		}
	}

	/// Number of distinct windows in the chain.
	pub fn len(&self) -> usize {
		self.table().len()
	}

	/// Returns `true` if nothing was learned or loaded yet.
	pub fn is_empty(&self) -> bool {
		self.table().is_empty()
	}

	/// Counts windows and successor observations.
	pub fn stats(&self) -> ChainStats {
		let table = self.table();
		ChainStats {
			prefixes: table.len(),
			suffixes: table.values().map(Vec::len).sum(),
		}
	}

	/// Returns a copy of the successors recorded for `key`.
	///
	/// An unknown key yields an empty list.
	pub fn successors(&self, key: &str) -> Vec<String> {
		self.table().get(key).cloned().unwrap_or_default()
	}
}
