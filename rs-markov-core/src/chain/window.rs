use std::fmt;

/// Separator placed between tokens in a canonical key.
pub const KEY_SEPARATOR: &str = " ";

/// Sliding window over the most recent tokens of a message.
///
/// A `Window` always holds exactly `len` tokens. A fresh window is filled with
/// empty tokens, which is how the start of a message is represented in the
/// transition table: for a window of length 2 the first key is `" "`, then
/// `" the"`, then `"the quick"`.
///
/// # Invariants
/// - `tokens.len()` never changes after construction
/// - tokens never contain whitespace (they come from whitespace tokenization)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Window {
	tokens: Vec<String>,
}

impl Window {
	/// Creates an all-empty window holding `len` tokens.
	pub fn new(len: usize) -> Self {
		Self { tokens: vec![String::new(); len] }
	}

	/// Rebuilds a window from a canonical key.
	///
	/// Returns `None` if the key does not split into exactly `len` tokens,
	/// which happens when it was produced by a window of another length.
	pub fn from_key(key: &str, len: usize) -> Option<Self> {
		let tokens: Vec<String> = key.split(KEY_SEPARATOR).map(str::to_owned).collect();
		if tokens.len() != len {
			return None;
		}
		Some(Self { tokens })
	}

	/// Number of tokens held by the window.
	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	/// Returns `true` for a zero-length window.
	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}

	/// Drops the oldest token and appends `token` at the tail.
	pub fn advance(&mut self, token: &str) {
		if self.tokens.is_empty() {
			return;
		}
		self.tokens.rotate_left(1);
		// The evicted slot is now the tail, reuse its allocation
		if let Some(last) = self.tokens.last_mut() {
			last.clear();
			last.push_str(token);
		}
	}

	/// Canonical lookup key: tokens joined by a single space.
	pub fn key(&self) -> String {
		self.tokens.join(KEY_SEPARATOR)
	}
}

impl fmt::Display for Window {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.key())
	}
}
