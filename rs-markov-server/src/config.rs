use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings of the server, read from `MARKOV_*` environment variables.
///
/// A `.env` file in the working directory is honoured (loaded by `main`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
	/// Address the HTTP server binds to (`MARKOV_BIND`)
	pub bind: String,
	/// Tokens per window (`MARKOV_PREFIX_LEN`)
	pub prefix_len: usize,
	/// Default number of words generated per request (`MARKOV_NUM_WORDS`)
	pub num_words: usize,
	/// Snapshot file (`MARKOV_STATE_FILE`)
	pub state_file: PathBuf,
	/// Period of the checkpoint task (`MARKOV_CHECKPOINT_SECS`)
	pub checkpoint_interval: Duration,
	/// Period of the stats log (`MARKOV_STATS_SECS`)
	pub stats_interval: Duration,
	/// Optional corpus trained at startup (`MARKOV_CORPUS`)
	pub corpus: Option<PathBuf>,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			bind: "127.0.0.1:5000".to_owned(),
			prefix_len: 2,
			num_words: 50,
			state_file: PathBuf::from("markov-state.json.gz"),
			checkpoint_interval: Duration::from_secs(60),
			stats_interval: Duration::from_secs(600),
			corpus: None,
		}
	}
}

impl ServerConfig {
	/// Reads the configuration from the process environment.
	///
	/// # Errors
	/// Returns an error naming the variable if a value does not parse.
	pub fn from_env() -> Result<Self, String> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Builds the configuration from an arbitrary variable lookup.
	fn from_lookup<F>(lookup: F) -> Result<Self, String>
	where
		F: Fn(&str) -> Option<String>,
	{
		let defaults = Self::default();
		let seconds = |name: &str, default: Duration| -> Result<Duration, String> {
			let secs: u64 = parse_var(&lookup, name, default.as_secs())?;
			if secs == 0 {
				return Err(format!("{name} must be greater than zero"));
			}
			Ok(Duration::from_secs(secs))
		};

		let prefix_len = parse_var(&lookup, "MARKOV_PREFIX_LEN", defaults.prefix_len)?;
		if prefix_len == 0 {
			return Err("MARKOV_PREFIX_LEN must be greater than zero".to_owned());
		}

		Ok(Self {
			bind: lookup("MARKOV_BIND").unwrap_or(defaults.bind),
			prefix_len,
			num_words: parse_var(&lookup, "MARKOV_NUM_WORDS", defaults.num_words)?,
			state_file: lookup("MARKOV_STATE_FILE").map(PathBuf::from).unwrap_or(defaults.state_file),
			checkpoint_interval: seconds("MARKOV_CHECKPOINT_SECS", defaults.checkpoint_interval)?,
			stats_interval: seconds("MARKOV_STATS_SECS", defaults.stats_interval)?,
			corpus: lookup("MARKOV_CORPUS").filter(|s| !s.trim().is_empty()).map(PathBuf::from),
		})
	}
}

/// Parses a variable, falling back to `default` when it is unset.
fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, String>
where
	F: Fn(&str) -> Option<String>,
	T: FromStr,
	T::Err: std::fmt::Display,
{
	match lookup(name) {
		None => Ok(default),
		Some(raw) => raw
			.trim()
			.parse()
			.map_err(|e| format!("Invalid value '{raw}' for {name}: {e}")),
	}
}
