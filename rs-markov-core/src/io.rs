use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
/// - Drops blank lines, they carry no observation
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents
		.lines()
		.filter(|line| !line.trim().is_empty())
		.map(str::to_owned)
		.collect())
}

/// Builds the sibling path a snapshot is staged in before being renamed.
///
/// Example:
/// `data/state.json.gz` → `data/state.json.gz.tmp`
pub(crate) fn staging_path<P: AsRef<Path>>(target: P) -> io::Result<PathBuf> {
	let target = target.as_ref();

	let mut file_name: OsString = target
		.file_name()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Snapshot path has no filename"))?
		.to_owned();
	file_name.push(".tmp");

	Ok(target.with_file_name(file_name))
}
