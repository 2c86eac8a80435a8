use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::LOG_TARGET;
use super::markov_chain::{Chain, Table};
use crate::error::{ChainError, Result};
use crate::io::staging_path;

/// On-disk form of a chain: a gzip-compressed JSON object.
///
/// ```json
/// {"Chain": {" the": ["quick"], "the quick": ["brown", "dog"]}, "PrefixLen": 2}
/// ```
///
/// Only the table is stored, never the lock. The window length is written for
/// information and is optional on read, since the chain receives it at construction.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
	/// Window key → successors, keys in sorted order
	#[serde(rename = "Chain")]
	pub chain: BTreeMap<String, Vec<String>>,
	/// Window length of the chain that wrote the snapshot, absent in older files
	#[serde(rename = "PrefixLen", default, skip_serializing_if = "Option::is_none")]
	pub prefix_len: Option<usize>,
}

/// Borrowed view used to encode without copying the table.
#[derive(Serialize)]
struct SnapshotRef<'a> {
	#[serde(rename = "Chain")]
	chain: BTreeMap<&'a str, &'a [String]>,
	#[serde(rename = "PrefixLen")]
	prefix_len: usize,
}

/// Decodes a snapshot file.
///
/// # Errors
/// - `ChainError::Io` if the file cannot be opened or is not a gzip stream
/// - `ChainError::Serialization` if the content is not a snapshot object
pub fn read_snapshot<P: AsRef<Path>>(path: P) -> Result<Snapshot> {
	let path = path.as_ref();
	let file = File::open(path).map_err(|e| ChainError::io(e, path))?;
	let decoder = GzDecoder::new(BufReader::new(file));
	serde_json::from_reader(decoder).map_err(|e| {
		if e.is_io() {
			ChainError::io(e.into(), path)
		} else {
			e.into()
		}
	})
}

/// Encodes `table` into `path` as a complete gzip stream.
fn write_table(table: &Table, prefix_len: usize, path: &Path) -> Result<()> {
	let file = File::create(path).map_err(|e| ChainError::io(e, path))?;
	let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());

	// Sorted keys make a given table always serialize to the same bytes
	let snapshot = SnapshotRef {
		chain: table.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect(),
		prefix_len,
	};
	serde_json::to_writer(&mut encoder, &snapshot)?;

	let mut writer = encoder.finish().map_err(|e| ChainError::io(e, path))?;
	writer.flush().map_err(|e| ChainError::io(e, path))?;
	writer
		.into_inner()
		.map_err(|e| ChainError::io(e.into_error(), path))?
		.sync_all()
		.map_err(|e| ChainError::io(e, path))
}

impl Chain {
	/// Replaces the chain with the content of a snapshot file.
	///
	/// Loading is best-effort: a missing, unreadable or corrupt file is logged
	/// and leaves the chain as it was. The file is fully decoded before the
	/// lock is taken, so a bad snapshot never clears a populated chain.
	///
	/// Returns `true` if the chain was replaced.
	pub fn load<P: AsRef<Path>>(&self, path: P) -> bool {
		let path = path.as_ref();
		if !path.exists() {
			warn!(target: LOG_TARGET, "State file {} not present, creating a new one", path.display());
			return false;
		}

		let snapshot = match read_snapshot(path) {
			Ok(snapshot) => snapshot,
			Err(e) => {
				warn!(target: LOG_TARGET, "Cannot read state file {}, creating a new one: {}", path.display(), e);
				return false;
			}
		};

		if let Some(stored) = snapshot.prefix_len {
			if stored != self.prefix_len() {
				warn!(
					target: LOG_TARGET,
					"State file {} was written with prefix length {}, chain uses {}",
					path.display(),
					stored,
					self.prefix_len()
				);
			}
		}

		let table: Table = snapshot.chain.into_iter().collect();
		let windows = table.len();
		self.replace_table(table);
		info!(target: LOG_TARGET, "Loaded previous state from '{}' ({} windows).", path.display(), windows);
		true
	}

	/// Writes a full snapshot of the chain to `path`.
	///
	/// The snapshot is staged in a sibling `.tmp` file and renamed into place,
	/// so an interrupted save leaves the previous snapshot intact. The table
	/// lock is held from encoding until the rename, which also keeps
	/// concurrent saves from sharing the staging file.
	///
	/// # Errors
	/// Any failure to create, encode, write or rename the file.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let path = path.as_ref();
		let staging = staging_path(path).map_err(|e| ChainError::io(e, path))?;

		let table = self.table();
		if let Err(e) = write_table(&table, self.prefix_len(), &staging) {
			let _ = fs::remove_file(&staging);
			return Err(e);
		}

		let renamed = fs::rename(&staging, path).map_err(|e| {
			let _ = fs::remove_file(&staging);
			ChainError::io(e, path)
		});
		drop(table);
		renamed
	}

	/// Builds the snapshot of the chain in memory.
	pub fn snapshot(&self) -> Snapshot {
		let table = self.table();
		Snapshot {
			chain: table.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
			prefix_len: Some(self.prefix_len()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::chain::StartSeed;
	use std::io::Read;

	fn sorted_table(chain: &Chain) -> BTreeMap<String, Vec<String>> {
		chain
			.snapshot()
			.chain
			.into_iter()
			.map(|(k, mut v)| {
				v.sort();
				(k, v)
			})
			.collect()
	}

	#[test]
	fn save_then_load_round_trips() {
		let dir = tempfile::tempdir().expect("create tempdir");
		let path = dir.path().join("state.json.gz");

		let chain = Chain::new(2).unwrap();
		chain.train("the quick brown fox the quick dog");
		chain.train("a quick brown cat");
		chain.save(&path).expect("save snapshot");
		assert!(!staging_path(&path).unwrap().exists());

		let restored = Chain::new(2).unwrap();
		assert!(restored.load(&path));
		assert_eq!(sorted_table(&restored), sorted_table(&chain));

		let (text, _) = restored.generate(2, &StartSeed::Custom("brown fox".to_owned()));
		assert_eq!(text, "the quick");
	}

	#[test]
	fn snapshot_is_gzipped_json_with_chain_field() {
		let dir = tempfile::tempdir().expect("create tempdir");
		let path = dir.path().join("state.json.gz");

		let chain = Chain::new(1).unwrap();
		chain.train("hi there");
		chain.save(&path).unwrap();

		let mut json = String::new();
		GzDecoder::new(File::open(&path).unwrap()).read_to_string(&mut json).unwrap();
		let value: serde_json::Value = serde_json::from_str(&json).unwrap();
		assert_eq!(value["Chain"][""], serde_json::json!(["hi"]));
		assert_eq!(value["Chain"]["hi"], serde_json::json!(["there"]));
		assert_eq!(value["PrefixLen"], serde_json::json!(1));
	}

	#[test]
	fn save_is_reproducible() {
		let dir = tempfile::tempdir().expect("create tempdir");
		let first = dir.path().join("a.gz");
		let second = dir.path().join("b.gz");

		let chain = Chain::new(2).unwrap();
		chain.train("one two three four five six seven eight nine ten");
		chain.save(&first).unwrap();
		chain.save(&second).unwrap();

		assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
	}

	#[test]
	fn load_accepts_snapshot_without_prefix_len() {
		let dir = tempfile::tempdir().expect("create tempdir");
		let path = dir.path().join("legacy.gz");

		let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
		encoder.write_all(br#"{"Chain":{" ":["hello"]," hello":["world"]}}"#).unwrap();
		encoder.finish().unwrap();

		let chain = Chain::new(2).unwrap();
		assert!(chain.load(&path));
		assert_eq!(chain.len(), 2);
		assert_eq!(chain.generate(5, &StartSeed::Empty).0, "hello world");
	}

	#[test]
	fn load_missing_file_keeps_chain() {
		let dir = tempfile::tempdir().expect("create tempdir");

		let chain = Chain::new(2).unwrap();
		assert!(!chain.load(dir.path().join("absent.gz")));
		assert!(chain.is_empty());
	}

	#[test]
	fn load_corrupt_file_keeps_chain() {
		let dir = tempfile::tempdir().expect("create tempdir");
		let not_gzip = dir.path().join("plain.gz");
		fs::write(&not_gzip, b"{\"Chain\":{}}").unwrap();

		let bad_json = dir.path().join("bad.gz");
		let mut encoder = GzEncoder::new(File::create(&bad_json).unwrap(), Compression::default());
		encoder.write_all(b"not json at all").unwrap();
		encoder.finish().unwrap();

		let chain = Chain::new(2).unwrap();
		chain.train("keep me");
		for path in [&not_gzip, &bad_json] {
			assert!(!chain.load(path));
			assert_eq!(chain.successors(" keep"), vec!["me"]);
		}
		assert!(matches!(read_snapshot(&bad_json), Err(ChainError::Serialization(_))));
	}

	#[test]
	fn load_replaces_previous_content() {
		let dir = tempfile::tempdir().expect("create tempdir");
		let path = dir.path().join("state.gz");

		let source = Chain::new(2).unwrap();
		source.train("fresh words");
		source.save(&path).unwrap();

		let chain = Chain::new(2).unwrap();
		chain.train("stale content here");
		assert!(chain.load(&path));
		assert!(chain.successors(" stale").is_empty());
		assert_eq!(chain.successors(" fresh"), vec!["words"]);
	}

	#[test]
	fn concurrent_saves_never_fail_or_corrupt() {
		let dir = tempfile::tempdir().expect("create tempdir");
		let path = dir.path().join("state.gz");

		let chain = Chain::new(2).unwrap();
		for i in 0..2000 {
			chain.train(&format!("message {i} with a few more words {}", i % 7));
		}

		let failures: usize = std::thread::scope(|scope| {
			let savers: Vec<_> = (0..4)
				.map(|_| scope.spawn(|| (0..50).filter(|_| chain.save(&path).is_err()).count()))
				.collect();
			savers.into_iter().map(|saver| saver.join().expect("saver thread")).sum()
		});

		assert_eq!(failures, 0);
		assert!(!staging_path(&path).unwrap().exists());
		let restored = Chain::new(2).unwrap();
		assert!(restored.load(&path));
		assert_eq!(restored.stats(), chain.stats());
	}

	#[test]
	fn load_with_other_prefix_len_keeps_data_and_generation_is_safe() {
		let dir = tempfile::tempdir().expect("create tempdir");
		let path = dir.path().join("state.gz");

		let wide = Chain::new(3).unwrap();
		wide.train("one two three four five");
		wide.save(&path).unwrap();

		let narrow = Chain::new(2).unwrap();
		assert!(narrow.load(&path));
		assert_eq!(narrow.stats(), wide.stats());
		assert_eq!(narrow.successors("one two three"), vec!["four"]);

		// Keys of three tokens never match a two-token window
		for seed in [StartSeed::Empty, StartSeed::Random, StartSeed::Custom("two three".to_owned())] {
			for _ in 0..20 {
				let (text, _) = narrow.generate(10, &seed);
				assert!(text.is_empty(), "{seed:?} produced {text:?}");
			}
		}
	}

	#[test]
	fn save_into_missing_directory_fails() {
		let dir = tempfile::tempdir().expect("create tempdir");
		let path = dir.path().join("missing").join("state.gz");

		let chain = Chain::new(2).unwrap();
		assert!(matches!(chain.save(&path), Err(ChainError::Io { .. })));
	}

	#[test]
	fn save_keeps_previous_snapshot_when_staging_fails() {
		let dir = tempfile::tempdir().expect("create tempdir");
		let path = dir.path().join("state.gz");

		let chain = Chain::new(2).unwrap();
		chain.train("first version");
		chain.save(&path).unwrap();

		// A directory squatting on the staging name makes the next save fail
		fs::create_dir(staging_path(&path).unwrap()).unwrap();
		chain.train("second version");
		assert!(chain.save(&path).is_err());

		let restored = Chain::new(2).unwrap();
		assert!(restored.load(&path));
		assert!(restored.successors(" second").is_empty());
		assert_eq!(restored.successors(" first"), vec!["version"]);
	}
}
