//! Binary snapshot encoding of a transition store.
//!
//! Layout: 4-byte magic `MKCH`, little-endian `u16` version, then the
//! postcard encoding of the entries sorted by bigram.

use crate::error::{ChainError, Result};
use crate::model::types::ChainEntry;

const MAGIC: &[u8; 4] = b"MKCH";
const VERSION: u16 = 1;
const HEADER_LEN: usize = MAGIC.len() + size_of::<u16>();

pub(crate) fn encode<'a, I>(entries: I) -> Result<Vec<u8>>
where
	I: IntoIterator<Item = &'a ChainEntry>,
{
	let entries: Vec<&ChainEntry> = entries.into_iter().collect();

	let body = postcard::to_stdvec(&entries)?;

	let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
	bytes.extend_from_slice(MAGIC);
	bytes.extend_from_slice(&VERSION.to_le_bytes());
	bytes.extend_from_slice(&body);
	Ok(bytes)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Vec<ChainEntry>> {
	if bytes.len() < HEADER_LEN {
		return Err(ChainError::Snapshot { reason: format!("truncated header ({} bytes)", bytes.len()) });
	}
	if &bytes[..MAGIC.len()] != MAGIC {
		return Err(ChainError::Snapshot { reason: "not a chain snapshot".to_owned() });
	}

	let version = u16::from_le_bytes([bytes[MAGIC.len()], bytes[MAGIC.len() + 1]]);
	if version != VERSION {
		return Err(ChainError::Snapshot {
			reason: format!("unsupported version {version}, expected {VERSION}"),
		});
	}

	Ok(postcard::from_bytes(&bytes[HEADER_LEN..])?)
}
