use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{ChainError, Result};
use crate::model::types::ChainEntry;

/// Reads chain entries from a JSON-lines file, one record per line.
///
/// - Blank lines are skipped
/// - A malformed record fails with its 1-based line number
///
/// Records are returned as-is; validation happens when they are loaded
/// into a store.
pub fn read_entries<P: AsRef<Path>>(filename: P) -> Result<Vec<ChainEntry>> {
	let reader = BufReader::new(File::open(filename)?);

	let mut entries = Vec::new();
	for (index, line) in reader.lines().enumerate() {
		let line = line?;
		if line.trim().is_empty() {
			continue;
		}
		let entry = serde_json::from_str(&line).map_err(|source| ChainError::Record { line: index + 1, source })?;
		entries.push(entry);
	}

	Ok(entries)
}

/// Writes chain entries as JSON lines.
pub fn write_entries<'a, P, I>(filename: P, entries: I) -> Result<()>
where
	P: AsRef<Path>,
	I: IntoIterator<Item = &'a ChainEntry>,
{
	let mut contents = Vec::new();
	for entry in entries {
		serde_json::to_writer(&mut contents, entry)?;
		contents.push(b'\n');
	}
	write_atomic(filename, &contents)
}

/// Replaces the content of `path` with `bytes`.
///
/// The data is written to a temporary file in the same directory, then
/// renamed over `path`, so readers see either the old or the new file.
pub(crate) fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
	let path = path.as_ref();
	let parent = match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent,
		_ => Path::new("."),
	};
	fs::create_dir_all(parent)?;

	let mut temp_file = NamedTempFile::new_in(parent)?;
	temp_file.write_all(bytes)?;
	temp_file.as_file().sync_all()?;
	temp_file.persist(path).map_err(|e| e.error)?;
	Ok(())
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `data/chain.jsonl` + `"bin"` → `data/chain.bin`
pub fn build_output_path<P: AsRef<Path>>(input_path: P, output_extension: &str) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}
