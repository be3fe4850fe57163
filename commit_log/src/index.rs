use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use byteorder::ByteOrder;
use memmap::MmapMut;
use tracing::debug;

use crate::config::Config;
use crate::encoding::{Enc, ENTRY_WIDTH, OFF_WIDTH};
use crate::error::{Error, Result};

/// Sentinel accepted by `Index::read` to fetch the last entry
pub const LAST_ENTRY: i64 = -1;

/// Index
///
/// A wrapper for writing/reading entries to the index file.
///
/// Every store has an index companion, e.g.:
///
/// 00000000000011812312.store
/// 00000000000011812312.index
///
/// e.g.:
///                          current cursor (size)      capacity
///                                 ^                       ^
/// |-------------------------------|-----------------------|
/// | offset-pos | offset-pos | ... | zeroed padding        |----> time
/// |-------------------------------|-----------------------|
///
/// The role of the index is to provide pointers to records in the store file.
/// Each entry of the index is 12 bytes long, 4 bytes are used for the relative offset
/// of the record, the other 8 bytes for the position of its frame in the store file.
///
/// Important:
///   The file is grown to its full capacity on open, so it can be memory-mapped once,
///   and trimmed back to the bytes actually used on close. The size of the file is all
///   there is to recover the index after a restart, an index dropped without `close`
///   will come back with its padding counted as entries.
///
///   Writes take `&mut self`, whoever owns the index serializes them, reads of
///   entries already written can be shared.
///
#[derive(Debug)]
pub struct Index {
    /// File Descriptor
    file: File,

    /// Path of the index file
    path: PathBuf,

    /// Memory map of the whole capacity
    entries: MappedEntries,

    /// Current size of the index in bytes (used as a cursor when writing)
    size: u64,
}

impl Index {
    /// Create a new Index / reads the existing Index
    pub fn open<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let capacity = config.segment.max_index_bytes;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let size = file.metadata()?.len();
        if size % ENTRY_WIDTH != 0 {
            return Err(Error::Corrupted(format!(
                "index {} holds {} bytes, not a multiple of {}",
                path.display(),
                size,
                ENTRY_WIDTH
            )));
        }
        if size > capacity {
            return Err(Error::Corrupted(format!(
                "index {} holds {} bytes, over its capacity of {}",
                path.display(),
                size,
                capacity
            )));
        }

        file.set_len(capacity)?;
        let entries = MappedEntries::map(&file)?;
        debug!(path = %path.display(), size, capacity, "opened index");

        Ok(Self {
            file,
            path,
            entries,
            size,
        })
    }

    /// Write an entry to the index
    ///
    /// `offset` must be the next relative offset, i.e. the amount of entries written.
    pub fn write(&mut self, offset: u32, position: u64) -> Result<()> {
        if self.is_maxed() {
            return Err(Error::CapacityExhausted {
                size: self.size,
                capacity: self.capacity(),
            });
        }

        let next = self.len();
        if u64::from(offset) != next {
            return Err(Error::OffsetOutOfOrder {
                expected: next as u32,
                actual: offset,
            });
        }

        self.entries
            .write_entry(next, offset, position)
            .ok_or(Error::CapacityExhausted {
                size: self.size,
                capacity: self.capacity(),
            })?;
        self.size += ENTRY_WIDTH;

        Ok(())
    }

    /// Read an entry from the index, `LAST_ENTRY` reads the last one written
    pub fn read(&self, offset: i64) -> Result<(u32, u64)> {
        if self.is_empty() {
            return Err(Error::EndOfData { offset: 0, size: 0 });
        }

        let entry = match offset {
            LAST_ENTRY => self.len() - 1,
            n if n < 0 => {
                return Err(Error::EndOfData {
                    offset: 0,
                    size: self.size,
                })
            }
            n => n as u64,
        };

        let at = entry.saturating_mul(ENTRY_WIDTH);
        if at.saturating_add(ENTRY_WIDTH) > self.size {
            return Err(Error::EndOfData {
                offset: at,
                size: self.size,
            });
        }

        self.entries.read_entry(entry).ok_or(Error::EndOfData {
            offset: at,
            size: self.size,
        })
    }

    /// Sync the memory map and the file, then trim the padding and close the file
    pub fn close(self) -> Result<()> {
        let Index {
            file,
            path,
            entries,
            size,
        } = self;

        entries.flush()?;
        file.sync_all()?;
        drop(entries);

        file.set_len(size)?;
        debug!(path = %path.display(), size, "closed index");

        Ok(())
    }

    /// Path of the index file
    pub fn name(&self) -> &Path {
        &self.path
    }

    /// Amount of entries written
    pub fn len(&self) -> u64 {
        self.size / ENTRY_WIDTH
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Bytes used by entries
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Bytes available for entries, used or not
    pub fn capacity(&self) -> u64 {
        self.entries.capacity()
    }

    /// Check if another entry would overflow the capacity
    pub fn is_maxed(&self) -> bool {
        self.size + ENTRY_WIDTH > self.capacity()
    }
}

/// MappedEntries
///
/// The memory-mapped region of the index file, seen as an array of fixed-width
/// entries. Every access is bounds-checked against the mapped length.
#[derive(Debug)]
struct MappedEntries {
    mmap: MmapMut,
}

impl MappedEntries {
    fn map(file: &File) -> io::Result<Self> {
        // The index owns the file exclusively for as long as it is mapped.
        let mmap = unsafe { MmapMut::map_mut(file)? };
        Ok(Self { mmap })
    }

    fn capacity(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn range(&self, entry: u64) -> Option<(usize, usize)> {
        let start = entry.checked_mul(ENTRY_WIDTH)?;
        let end = start.checked_add(ENTRY_WIDTH)?;
        if end > self.capacity() {
            return None;
        }
        Some((start as usize, end as usize))
    }

    fn read_entry(&self, entry: u64) -> Option<(u32, u64)> {
        let (start, end) = self.range(entry)?;
        let (offset, position) = self.mmap[start..end].split_at(OFF_WIDTH as usize);

        Some((Enc::read_u32(offset), Enc::read_u64(position)))
    }

    fn write_entry(&mut self, entry: u64, offset: u32, position: u64) -> Option<()> {
        let (start, end) = self.range(entry)?;
        let (off_buf, pos_buf) = self.mmap[start..end].split_at_mut(OFF_WIDTH as usize);
        Enc::write_u32(off_buf, offset);
        Enc::write_u64(pos_buf, position);

        Some(())
    }

    fn flush(&self) -> io::Result<()> {
        self.mmap.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn config() -> Config {
        Config::new().max_index_bytes(1024)
    }

    #[test]
    fn test_create() {
        let tmp_dir = tempdir().unwrap();
        let path = tmp_dir.path().join("00000000000000000000.index");

        let i = Index::open(&path, &config()).unwrap();

        assert!(path.exists());
        assert_eq!(i.name(), path.as_path());
        assert_eq!(i.size(), 0);
        assert_eq!(i.capacity(), 1024);
        // the file is grown to its capacity while open
        assert_eq!(fs::metadata(&path).unwrap().len(), 1024);
    }

    #[test]
    fn test_invalid_create() {
        let tmp_dir = tempdir().unwrap();
        let path = tmp_dir.path().join("missing").join("0.index");

        match Index::open(path, &config()) {
            Err(Error::Io(_)) => {}
            other => panic!("expected an I/O error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_empty() {
        let tmp_dir = tempdir().unwrap();
        let i = Index::open(tmp_dir.path().join("test.index"), &config()).unwrap();

        assert!(i.read(LAST_ENTRY).unwrap_err().is_end_of_data());
        assert!(i.read(0).unwrap_err().is_end_of_data());
    }

    #[test]
    fn test_write_read() {
        let tmp_dir = tempdir().unwrap();
        let mut i = Index::open(tmp_dir.path().join("test.index"), &config()).unwrap();
        let entries = [(0, 0), (1, 10), (2, 35)];

        for &(offset, position) in entries.iter() {
            i.write(offset, position).unwrap();
            assert_eq!(i.read(i64::from(offset)).unwrap(), (offset, position));
        }

        for (n, entry) in entries.iter().enumerate() {
            assert_eq!(&i.read(n as i64).unwrap(), entry);
        }
        assert_eq!(i.len(), 3);
        assert_eq!(i.size(), 36);
    }

    #[test]
    fn test_read_last() {
        let tmp_dir = tempdir().unwrap();
        let mut i = Index::open(tmp_dir.path().join("test.index"), &config()).unwrap();

        i.write(0, 0).unwrap();
        assert_eq!(i.read(LAST_ENTRY).unwrap(), (0, 0));

        i.write(1, 10).unwrap();
        assert_eq!(i.read(LAST_ENTRY).unwrap(), i.read(1).unwrap());
    }

    #[test]
    fn test_invalid_read() {
        let tmp_dir = tempdir().unwrap();
        let mut i = Index::open(tmp_dir.path().join("test.index"), &config()).unwrap();
        i.write(0, 0).unwrap();
        i.write(1, 10).unwrap();

        assert!(i.read(2).unwrap_err().is_end_of_data());
        assert!(i.read(1000).unwrap_err().is_end_of_data());
        assert!(i.read(-2).unwrap_err().is_end_of_data());
    }

    #[test]
    fn test_capacity() {
        let tmp_dir = tempdir().unwrap();
        let mut i = Index::open(tmp_dir.path().join("test.index"), &config()).unwrap();

        for offset in 0..85u32 {
            i.write(offset, u64::from(offset) * 19).unwrap();
        }
        assert!(i.is_maxed());

        let err = i.write(85, 85 * 19).unwrap_err();
        assert!(err.is_capacity_exhausted());
        assert_eq!(i.size(), 85 * 12);
        assert_eq!(i.read(LAST_ENTRY).unwrap(), (84, 84 * 19));
    }

    #[test]
    fn test_write_out_of_order() {
        let tmp_dir = tempdir().unwrap();
        let mut i = Index::open(tmp_dir.path().join("test.index"), &config()).unwrap();

        match i.write(1, 0) {
            Err(Error::OffsetOutOfOrder { expected, actual }) => {
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("expected an out of order error, got {:?}", other),
        }

        i.write(0, 0).unwrap();
        assert!(i.write(0, 10).is_err());
        assert_eq!(i.size(), 12);
    }

    #[test]
    fn test_close_trims_padding() {
        let tmp_dir = tempdir().unwrap();
        let path = tmp_dir.path().join("test.index");

        let mut i = Index::open(&path, &config()).unwrap();
        i.write(0, 0).unwrap();
        i.write(1, 10).unwrap();
        i.close().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(
            bytes,
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 10]
        );
    }

    #[test]
    fn test_reopen() {
        let tmp_dir = tempdir().unwrap();
        let path = tmp_dir.path().join("test.index");

        let mut i = Index::open(&path, &config()).unwrap();
        i.write(0, 0).unwrap();
        i.write(1, 10).unwrap();
        i.close().unwrap();

        // index should build its state from the existing file
        let mut i = Index::open(&path, &config()).unwrap();
        assert_eq!(i.read(LAST_ENTRY).unwrap(), (1, 10));
        assert_eq!(i.len(), 2);

        i.write(2, 21).unwrap();
        assert_eq!(i.read(2).unwrap(), (2, 21));
    }

    #[test]
    fn test_reopen_corrupted() {
        let tmp_dir = tempdir().unwrap();
        let path = tmp_dir.path().join("test.index");
        fs::write(&path, [0u8; 13]).unwrap();

        match Index::open(&path, &config()) {
            Err(Error::Corrupted(_)) => {}
            other => panic!("expected a corrupted index, got {:?}", other),
        }
    }

    #[test]
    fn test_reopen_over_capacity() {
        let tmp_dir = tempdir().unwrap();
        let path = tmp_dir.path().join("test.index");
        fs::write(&path, vec![0u8; 1200]).unwrap();

        match Index::open(&path, &config()) {
            Err(Error::Corrupted(_)) => {}
            other => panic!("expected a corrupted index, got {:?}", other),
        }
        assert_eq!(fs::metadata(&path).unwrap().len(), 1200);
    }

    #[test]
    fn test_mapped_entries_bounds() {
        let tmp_dir = tempdir().unwrap();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(tmp_dir.path().join("test.index"))
            .unwrap();
        file.set_len(30).unwrap();

        let mut entries = MappedEntries::map(&file).unwrap();
        assert!(entries.write_entry(1, 1, 10).is_some());
        assert_eq!(entries.read_entry(1), Some((1, 10)));
        assert!(entries.write_entry(2, 2, 20).is_none());
        assert_eq!(entries.read_entry(2), None);
        assert_eq!(entries.read_entry(u64::MAX), None);
    }
}
