//! Persistent, single-file checkpoint store.
//!
//! The store keeps named polars tables under structured [`StoreKey`]s. Every
//! mutation is appended to the file as one journal entry and synced before
//! the in-memory index is updated, so a table either exists completely or
//! not at all. A crash while writing leaves a torn trailing entry, which is
//! discarded the next time the store is opened.
//!
//! Pipeline stages use [`CheckpointStore::exists`] to decide whether their
//! work has already been done.

mod journal;
mod key;

use std::fs::{
    File,
    OpenOptions,
};
use std::io::{
    Read,
    Seek,
    SeekFrom,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
    Context,
    Result,
};
use indexmap::IndexMap;
use journal::{
    decode_frame,
    encode_entry,
    encode_frame,
    frame_columns,
    read_entry,
    JournalHeader,
    JournalOp,
    ReadOutcome,
    MAGIC,
};
pub use key::{
    Stage,
    StoreKey,
};
use log::*;
use polars::prelude::*;
use tempfile::NamedTempFile;

use crate::error::DmpError;

#[derive(Debug, Clone)]
struct Segment {
    offset: u64,
    len:    u64,
    n_rows: u64,
    label:  Option<String>,
}

#[derive(Debug, Clone)]
struct TableEntry {
    columns:  Vec<String>,
    segments: Vec<Segment>,
}

impl TableEntry {
    fn n_rows(&self) -> u64 {
        self.segments.iter().map(|s| s.n_rows).sum()
    }
}

pub struct CheckpointStore {
    path:  PathBuf,
    file:  File,
    index: IndexMap<StoreKey, TableEntry>,
    end:   u64,
}

impl CheckpointStore {
    /// Opens the store at `path`, creating it if it does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open store {:?}", path))?;

        let file_len = file.metadata()?.len();
        if file_len == 0 {
            file.write_all(MAGIC)?;
            file.sync_data()?;
            info!("Created new store {:?}", path);
            return Ok(Self {
                path,
                file,
                index: IndexMap::new(),
                end: MAGIC.len() as u64,
            });
        }

        let mut magic = [0u8; 8];
        let has_magic = file_len >= MAGIC.len() as u64
            && file.read_exact(&mut magic).is_ok()
            && &magic == MAGIC;
        if !has_magic {
            return Err(DmpError::CorruptStore {
                path,
                reason: "missing store header".to_string(),
            }
            .into());
        }

        let mut store = Self {
            path,
            file,
            index: IndexMap::new(),
            end: MAGIC.len() as u64,
        };
        store.replay(file_len)?;
        info!(
            "Opened store {:?} with {} tables",
            store.path,
            store.index.len()
        );
        Ok(store)
    }

    /// Rebuilds the index from the journal, truncating a torn tail.
    fn replay(
        &mut self,
        file_len: u64,
    ) -> Result<()> {
        let mut offset = MAGIC.len() as u64;
        loop {
            match read_entry(&mut self.file, offset, file_len)? {
                ReadOutcome::Entry {
                    header,
                    payload_offset,
                    next_offset,
                } => {
                    self.apply(header, payload_offset);
                    offset = next_offset;
                },
                ReadOutcome::End => break,
                ReadOutcome::Torn(reason) => {
                    warn!(
                        "Discarding incomplete entry at byte {} of {:?}: {}",
                        offset, self.path, reason
                    );
                    self.file.set_len(offset)?;
                    self.file.sync_data()?;
                    break;
                },
            }
        }
        self.end = offset;
        Ok(())
    }

    fn apply(
        &mut self,
        header: JournalHeader,
        payload_offset: u64,
    ) {
        let segment = Segment {
            offset: payload_offset,
            len:    header.payload_len,
            n_rows: header.n_rows,
            label:  header.label,
        };
        match header.op {
            JournalOp::Put => {
                self.index.insert(header.key, TableEntry {
                    columns:  header.columns,
                    segments: vec![segment],
                });
            },
            JournalOp::Append => {
                self.index
                    .entry(header.key)
                    .or_insert_with(|| {
                        TableEntry {
                            columns:  header.columns,
                            segments: Vec::new(),
                        }
                    })
                    .segments
                    .push(segment);
            },
            JournalOp::Remove => {
                self.index.shift_remove(&header.key);
            },
        }
    }

    /// Appends one entry to the journal and syncs it to disk.
    fn commit(
        &mut self,
        header: JournalHeader,
        payload: &[u8],
    ) -> Result<()> {
        let encoded = encode_entry(&header, payload)?;
        self.file.seek(SeekFrom::Start(self.end))?;
        self.file
            .write_all(&encoded.bytes)
            .with_context(|| format!("Failed to write {} to store", header.key))?;
        self.file.sync_data()?;

        let payload_offset = self.end + encoded.payload_start;
        self.end += encoded.bytes.len() as u64;
        debug!(
            "Committed {:?} {} ({} rows, {} stage)",
            header.op,
            header.key,
            header.n_rows,
            header.key.stage()
        );
        self.apply(header, payload_offset);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(
        &self,
        key: &StoreKey,
    ) -> bool {
        self.index.contains_key(key)
    }

    /// Keys of all tables, in order of first commit.
    pub fn keys(&self) -> impl Iterator<Item = &StoreKey> {
        self.index.keys()
    }

    /// Number of rows of a table, read from the journal headers.
    pub fn n_rows(
        &self,
        key: &StoreKey,
    ) -> Option<u64> {
        self.index.get(key).map(TableEntry::n_rows)
    }

    pub fn columns(
        &self,
        key: &StoreKey,
    ) -> Option<&[String]> {
        self.index
            .get(key)
            .map(|entry| entry.columns.as_slice())
    }

    /// Labels of the appended parts of `key`, in append order. Read from the
    /// journal headers, so empty parts are listed too.
    pub fn labels(
        &self,
        key: &StoreKey,
    ) -> Vec<&str> {
        self.index
            .get(key)
            .map(|entry| {
                entry
                    .segments
                    .iter()
                    .filter_map(|s| s.label.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stores `df` under `key`, replacing any previous content.
    pub fn put(
        &mut self,
        key: &StoreKey,
        df: &mut DataFrame,
    ) -> Result<()> {
        let payload = encode_frame(df)?;
        let header = JournalHeader {
            op:          JournalOp::Put,
            key:         key.clone(),
            columns:     frame_columns(df),
            label:       None,
            n_rows:      df.height() as u64,
            payload_len: payload.len() as u64,
        };
        self.commit(header, &payload)
    }

    /// Adds the rows of `df` to `key` as a part named `label`, creating the
    /// table if needed. Rows are not deduplicated.
    pub fn append(
        &mut self,
        key: &StoreKey,
        label: &str,
        df: &mut DataFrame,
    ) -> Result<()> {
        let columns = frame_columns(df);
        if let Some(entry) = self.index.get(key) {
            if entry.columns != columns {
                return Err(DmpError::schema(format!(
                    "cannot append columns {:?} to {} with columns {:?}",
                    columns, key, entry.columns
                ))
                .into());
            }
        }

        let payload = encode_frame(df)?;
        let header = JournalHeader {
            op: JournalOp::Append,
            key: key.clone(),
            columns,
            label: Some(label.to_string()),
            n_rows: df.height() as u64,
            payload_len: payload.len() as u64,
        };
        self.commit(header, &payload)
    }

    /// Reads the table under `key`, optionally filtered by `predicate`.
    ///
    /// The predicate is applied to each part as it is decoded, so only the
    /// matching rows are held together.
    pub fn select(
        &self,
        key: &StoreKey,
        predicate: Option<Expr>,
    ) -> Result<DataFrame> {
        let entry = self
            .index
            .get(key)
            .ok_or_else(|| DmpError::MissingCheckpoint(key.to_string()))?;

        let mut reader = File::open(&self.path)?;
        let mut df: Option<DataFrame> = None;
        for segment in entry.segments.iter() {
            let mut frame = read_segment(&mut reader, segment)
                .with_context(|| format!("Failed to read {} from store", key))?;
            if let Some(predicate) = &predicate {
                frame = frame.lazy().filter(predicate.clone()).collect()?;
            }
            match df.as_mut() {
                Some(df) => {
                    df.vstack_mut(&frame)?;
                },
                None => df = Some(frame),
            }
        }
        Ok(df.unwrap_or_default())
    }

    /// Drops `key`. Removing an absent key does nothing.
    pub fn remove(
        &mut self,
        key: &StoreKey,
    ) -> Result<()> {
        if !self.exists(key) {
            debug!("Nothing to remove for {}", key);
            return Ok(());
        }
        let header = JournalHeader {
            op:          JournalOp::Remove,
            key:         key.clone(),
            columns:     Vec::new(),
            label:       None,
            n_rows:      0,
            payload_len: 0,
        };
        self.commit(header, &[])
    }

    /// Rewrites the file with live tables only and atomically replaces it.
    pub fn compact(&mut self) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary store in {:?}", dir))?;
        tmp.write_all(MAGIC)?;

        let mut reader = File::open(&self.path)?;
        let mut offset = MAGIC.len() as u64;
        let mut index = IndexMap::with_capacity(self.index.len());

        for (key, entry) in self.index.iter() {
            let mut segments = Vec::with_capacity(entry.segments.len());
            for (i, segment) in entry.segments.iter().enumerate() {
                let payload = read_payload(&mut reader, segment)?;
                let header = JournalHeader {
                    op:          if i == 0 {
                        JournalOp::Put
                    }
                    else {
                        JournalOp::Append
                    },
                    key:         key.clone(),
                    columns:     entry.columns.clone(),
                    label:       segment.label.clone(),
                    n_rows:      segment.n_rows,
                    payload_len: segment.len,
                };
                let encoded = encode_entry(&header, &payload)?;
                tmp.write_all(&encoded.bytes)?;
                segments.push(Segment {
                    offset: offset + encoded.payload_start,
                    ..segment.clone()
                });
                offset += encoded.bytes.len() as u64;
            }
            index.insert(key.clone(), TableEntry {
                columns: entry.columns.clone(),
                segments,
            });
        }
        tmp.as_file().sync_all()?;

        let before = self.end;
        self.file = tmp
            .persist(&self.path)
            .with_context(|| format!("Failed to replace store {:?}", self.path))?;
        self.index = index;
        self.end = offset;
        info!(
            "Compacted store {:?}: {} -> {} bytes",
            self.path, before, self.end
        );
        Ok(())
    }

    /// Flushes and releases the store.
    pub fn close(self) -> Result<()> {
        self.file.sync_all()?;
        info!("Closed store {:?}", self.path);
        Ok(())
    }
}

fn read_payload(
    reader: &mut File,
    segment: &Segment,
) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(segment.offset))?;
    let mut buffer = vec![0u8; segment.len as usize];
    reader.read_exact(&mut buffer)?;
    Ok(buffer)
}

fn read_segment(
    reader: &mut File,
    segment: &Segment,
) -> Result<DataFrame> {
    Ok(decode_frame(read_payload(reader, segment)?)?)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn frame(
        positions: Vec<u64>,
        chr: &str,
    ) -> DataFrame {
        let n = positions.len();
        DataFrame::new(vec![
            Column::new("chr".into(), vec![chr; n]),
            Column::new("position".into(), positions),
        ])
        .unwrap()
    }

    fn positions(df: &DataFrame) -> Result<Vec<u64>> {
        Ok(df.column("position")?.u64()?.into_no_null_iter().collect())
    }

    #[test]
    fn put_select_remove() -> Result<()> {
        let dir = TempDir::new()?;
        let mut store = CheckpointStore::open(dir.path().join("store.bsxdmp"))?;
        let key = StoreKey::Combined;
        assert!(!store.exists(&key));

        store.put(&key, &mut frame(vec![1, 2, 3], "Chr1"))?;
        assert!(store.exists(&key));
        assert_eq!(store.n_rows(&key), Some(3));

        store.put(&key, &mut frame(vec![7], "Chr2"))?;
        let df = store.select(&key, None)?;
        assert_eq!(df.height(), 1);

        store.remove(&key)?;
        assert!(!store.exists(&key));
        store.remove(&key)?;
        Ok(())
    }

    #[test]
    fn append_unions_and_filters() -> Result<()> {
        let dir = TempDir::new()?;
        let mut store = CheckpointStore::open(dir.path().join("store.bsxdmp"))?;
        let key = StoreKey::RawUnion;
        store.append(&key, "a", &mut frame(vec![1, 2], "Chr1"))?;
        store.append(&key, "b", &mut frame(vec![2, 3], "Chr2"))?;
        store.append(&key, "c", &mut frame(vec![4], "Chr2"))?;

        assert_eq!(store.select(&key, None)?.height(), 5);
        let chr2 = store.select(&key, Some(col("chr").eq(lit("Chr2"))))?;
        assert_eq!(positions(&chr2)?, vec![2, 3, 4]);
        let none = store.select(&key, Some(col("chr").eq(lit("Chr9"))))?;
        assert_eq!(none.height(), 0);
        assert_eq!(frame_columns(&none), vec!["chr", "position"]);
        Ok(())
    }

    #[test]
    fn labels_survive_reopen_and_include_empty_parts() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("store.bsxdmp");
        {
            let mut store = CheckpointStore::open(&path)?;
            store.append(&StoreKey::RawUnion, "a", &mut frame(vec![1], "Chr1"))?;
            store.append(&StoreKey::RawUnion, "empty", &mut frame(vec![], "Chr1"))?;
            assert!(store.labels(&StoreKey::Filtered).is_empty());
            store.close()?;
        }
        let store = CheckpointStore::open(&path)?;
        assert_eq!(store.labels(&StoreKey::RawUnion), vec!["a", "empty"]);
        assert_eq!(store.n_rows(&StoreKey::RawUnion), Some(1));
        Ok(())
    }

    #[test]
    fn append_rejects_other_columns() -> Result<()> {
        let dir = TempDir::new()?;
        let mut store = CheckpointStore::open(dir.path().join("store.bsxdmp"))?;
        let key = StoreKey::Filtered;
        store.append(&key, "Chr1", &mut frame(vec![1], "Chr1"))?;

        let mut other = DataFrame::new(vec![Column::new("pos".into(), vec![1u64])])?;
        let err = store.append(&key, "Chr2", &mut other).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DmpError>(),
            Some(DmpError::SchemaMismatch(_))
        ));
        Ok(())
    }

    #[test]
    fn missing_key_is_an_error() -> Result<()> {
        let dir = TempDir::new()?;
        let store = CheckpointStore::open(dir.path().join("store.bsxdmp"))?;
        let err = store.select(&StoreKey::Adjusted, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DmpError>(),
            Some(DmpError::MissingCheckpoint(_))
        ));
        Ok(())
    }

    #[test]
    fn reopen_restores_index() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("store.bsxdmp");
        let pair = StoreKey::pair_test("Chr1", "a", "b");
        {
            let mut store = CheckpointStore::open(&path)?;
            store.append(&StoreKey::RawUnion, "a", &mut frame(vec![1], "Chr1"))?;
            store.append(&StoreKey::RawUnion, "b", &mut frame(vec![5], "Chr1"))?;
            store.put(&pair, &mut frame(vec![9, 10], "Chr1"))?;
            store.remove(&StoreKey::RawUnion)?;
            store.close()?;
        }
        let store = CheckpointStore::open(&path)?;
        assert!(!store.exists(&StoreKey::RawUnion));
        assert_eq!(store.keys().collect::<Vec<_>>(), vec![&pair]);
        assert_eq!(store.select(&pair, None)?.height(), 2);
        Ok(())
    }

    #[test]
    fn torn_tail_is_discarded() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("store.bsxdmp");
        let committed_len = {
            let mut store = CheckpointStore::open(&path)?;
            store.put(&StoreKey::Filtered, &mut frame(vec![1, 2, 3], "Chr1"))?;
            let committed_len = std::fs::metadata(&path)?.len();
            store.put(&StoreKey::Combined, &mut frame(vec![4, 5], "Chr1"))?;
            store.close()?;
            committed_len
        };
        let full_len = std::fs::metadata(&path)?.len();
        OpenOptions::new()
            .write(true)
            .open(&path)?
            .set_len(full_len - 7)?;

        let mut store = CheckpointStore::open(&path)?;
        assert!(store.exists(&StoreKey::Filtered));
        assert!(!store.exists(&StoreKey::Combined));
        assert_eq!(std::fs::metadata(&path)?.len(), committed_len);

        store.put(&StoreKey::Combined, &mut frame(vec![4, 5], "Chr1"))?;
        drop(store);
        let store = CheckpointStore::open(&path)?;
        assert_eq!(store.select(&StoreKey::Combined, None)?.height(), 2);
        Ok(())
    }

    #[test]
    fn foreign_file_is_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("not_a_store");
        std::fs::write(&path, b"chr\tposition\n")?;
        let err = CheckpointStore::open(&path).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<DmpError>(),
            Some(DmpError::CorruptStore { .. })
        ));
        Ok(())
    }

    #[test]
    fn compact_keeps_live_tables() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("store.bsxdmp");
        let mut store = CheckpointStore::open(&path)?;
        store.append(&StoreKey::RawUnion, "a", &mut frame((0..500).collect(), "Chr1"))?;
        store.append(&StoreKey::Filtered, "Chr1", &mut frame(vec![1, 2], "Chr1"))?;
        store.append(&StoreKey::Filtered, "Chr2", &mut frame(vec![3], "Chr2"))?;
        store.remove(&StoreKey::RawUnion)?;
        let before = std::fs::metadata(&path)?.len();

        store.compact()?;
        assert!(std::fs::metadata(&path)?.len() < before);
        assert_eq!(store.select(&StoreKey::Filtered, None)?.height(), 3);

        store.append(&StoreKey::Filtered, "Chr3", &mut frame(vec![4], "Chr3"))?;
        store.close()?;
        let store = CheckpointStore::open(&path)?;
        assert_eq!(store.n_rows(&StoreKey::Filtered), Some(4));
        assert_eq!(store.labels(&StoreKey::Filtered), vec!["Chr1", "Chr2", "Chr3"]);
        assert!(!store.exists(&StoreKey::RawUnion));
        Ok(())
    }
}
