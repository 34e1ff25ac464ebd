//! On-disk layout of the checkpoint store.
//!
//! ```text
//! MAGIC | entry | entry | ...
//! entry = u32 LE header length | bincode(JournalHeader) | payload
//! ```
//!
//! Payloads are Arrow IPC encoded DataFrames. `Remove` entries have an
//! empty payload.

use std::io::{
    Cursor,
    Read,
    Seek,
    SeekFrom,
};

use anyhow::Result;
use polars::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

use super::key::StoreKey;

pub(crate) const MAGIC: &[u8; 8] = b"BSXDMP02";
const LEN_PREFIX: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum JournalOp {
    /// Replaces all previous segments of the key.
    Put,
    /// Adds a segment to the key.
    Append,
    /// Drops the key.
    Remove,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct JournalHeader {
    pub op:          JournalOp,
    pub key:         StoreKey,
    pub columns:     Vec<String>,
    /// Name of the appended part, e.g. the sample or chromosome it holds.
    pub label:       Option<String>,
    pub n_rows:      u64,
    pub payload_len: u64,
}

/// Encoded entry, ready to be written in one call.
pub(crate) struct EncodedEntry {
    pub bytes:         Vec<u8>,
    /// Offset of the payload relative to the start of the entry.
    pub payload_start: u64,
}

pub(crate) fn encode_entry(
    header: &JournalHeader,
    payload: &[u8],
) -> Result<EncodedEntry> {
    debug_assert_eq!(header.payload_len, payload.len() as u64);
    let header_bytes = bincode::serialize(header)?;
    let header_len = u32::try_from(header_bytes.len())?;

    let mut bytes =
        Vec::with_capacity(LEN_PREFIX as usize + header_bytes.len() + payload.len());
    bytes.extend_from_slice(&header_len.to_le_bytes());
    bytes.extend_from_slice(&header_bytes);
    bytes.extend_from_slice(payload);

    Ok(EncodedEntry {
        bytes,
        payload_start: LEN_PREFIX + header_bytes.len() as u64,
    })
}

pub(crate) enum ReadOutcome {
    Entry {
        header:         JournalHeader,
        payload_offset: u64,
        next_offset:    u64,
    },
    End,
    /// Incomplete or undecodable entry starting at the read offset.
    Torn(String),
}

/// Reads the entry header at `offset` and skips over its payload.
pub(crate) fn read_entry<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    file_len: u64,
) -> Result<ReadOutcome> {
    if offset == file_len {
        return Ok(ReadOutcome::End);
    }
    if file_len - offset < LEN_PREFIX {
        return Ok(ReadOutcome::Torn(format!(
            "{} trailing bytes are shorter than an entry prefix",
            file_len - offset
        )));
    }

    reader.seek(SeekFrom::Start(offset))?;
    let mut len_buf = [0u8; LEN_PREFIX as usize];
    reader.read_exact(&mut len_buf)?;
    let header_len = u32::from_le_bytes(len_buf) as u64;

    let header_end = offset + LEN_PREFIX + header_len;
    if header_end > file_len {
        return Ok(ReadOutcome::Torn(format!(
            "header of {} bytes exceeds file end",
            header_len
        )));
    }

    let mut header_buf = vec![0u8; header_len as usize];
    reader.read_exact(&mut header_buf)?;
    let header: JournalHeader = match bincode::deserialize(&header_buf) {
        Ok(header) => header,
        Err(e) => {
            return Ok(ReadOutcome::Torn(format!("undecodable header: {}", e)))
        },
    };

    let next_offset = header_end + header.payload_len;
    if next_offset > file_len {
        return Ok(ReadOutcome::Torn(format!(
            "payload of {} bytes for {} exceeds file end",
            header.payload_len, header.key
        )));
    }

    Ok(ReadOutcome::Entry {
        header,
        payload_offset: header_end,
        next_offset,
    })
}

pub(crate) fn encode_frame(df: &mut DataFrame) -> PolarsResult<Vec<u8>> {
    let mut buffer = Vec::new();
    IpcWriter::new(&mut buffer).finish(df)?;
    Ok(buffer)
}

pub(crate) fn decode_frame(bytes: Vec<u8>) -> PolarsResult<DataFrame> {
    IpcReader::new(Cursor::new(bytes)).finish()
}

pub(crate) fn frame_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}
