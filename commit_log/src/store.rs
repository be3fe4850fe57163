use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::mem;
use std::path::{Path, PathBuf};

use byteorder::{ReadBytesExt, WriteBytesExt};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::encoding::{Enc, LEN_WIDTH};
use crate::error::{Error, Result};

/// Store
///
/// A wrapper for the store-file, where records are kept.
///
/// The store is an append-only file, every record is framed with its length so it
/// can be read back later given only the position where the frame starts.
///
/// e.g.:
///                                          current cursor (size)
///                                                 ^
/// |-----------------------------------------------|
/// | len | record 0 | len | record 1 |  ...        |----> time
/// |-----------------------------------------------|
/// ^                ^
/// position 0       position 8 + len(record 0)
///
/// Important:
///   Writes go through a buffer, they are not on disk until the buffer is flushed
///   (by a read, `flush` or `close`). `size` counts buffered bytes as well.
///
///   A single lock serializes every operation, reads included, since a read has to
///   flush the shared buffer first.
///
#[derive(Debug)]
pub struct Store {
    /// Path of the store-file
    path: PathBuf,

    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// Write buffer around the file, opened in append mode
    buf: BufWriter<File>,

    /// Logical size of the store in bytes, buffered bytes included
    size: u64,
}

impl Store {
    /// Create a new store / reopen an existing store-file
    ///
    /// The size is recovered from the length of the file on disk, so a store can be
    /// reopened after a restart.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let size = file.metadata()?.len();
        debug!(path = %path.display(), size, "opened store");

        Ok(Self {
            path,
            inner: Mutex::new(Inner {
                buf: BufWriter::new(file),
                size,
            }),
        })
    }

    /// Append a record, returning the amount of bytes written (length prefix
    /// included) and the position where the frame starts.
    pub fn append(&self, record: &[u8]) -> Result<(u64, u64)> {
        let mut inner = self.inner.lock();
        let position = inner.size;

        if let Err(e) = inner.write_frame(record) {
            warn!(path = %self.path.display(), position, error = %e, "rolling back append");
            inner.rollback(position)?;
            return Err(e.into());
        }

        let written = LEN_WIDTH + record.len() as u64;
        inner.size += written;

        Ok((written, position))
    }

    /// Read the record whose frame starts at the given position
    pub fn read_at(&self, position: u64) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        inner.buf.flush()?;

        let mut len = [0u8; LEN_WIDTH as usize];
        inner.read_exact_at(&mut len, position)?;
        let len = (&len[..]).read_u64::<Enc>()?;

        let mut record = vec![0u8; inner.checked_len(position + LEN_WIDTH, len)?];
        inner.read_exact_at(&mut record, position + LEN_WIDTH)?;

        Ok(record)
    }

    /// Fill the buffer with raw bytes of the store-file, starting at the given offset
    pub fn read_range(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.buf.flush()?;

        inner.read_exact_at(buf, offset)
    }

    /// Flush the buffer to the store-file
    pub fn flush(&self) -> Result<()> {
        self.inner.lock().buf.flush()?;
        Ok(())
    }

    /// Current size in bytes, including the records not flushed yet
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Path of the store-file
    pub fn name(&self) -> &Path {
        &self.path
    }

    /// Flush the buffer and close the store-file
    pub fn close(self) -> Result<()> {
        let inner = self.inner.into_inner();
        let file = inner.buf.into_inner().map_err(|e| e.into_error())?;
        drop(file);

        debug!(path = %self.path.display(), size = inner.size, "closed store");
        Ok(())
    }
}

impl Inner {
    fn write_frame(&mut self, record: &[u8]) -> io::Result<()> {
        self.buf.write_u64::<Enc>(record.len() as u64)?;
        self.buf.write_all(record)
    }

    /// Discard every byte past `position`, buffered or already on disk, keeping
    /// the frames appended before it.
    fn rollback(&mut self, position: u64) -> io::Result<()> {
        let file = self.buf.get_ref().try_clone()?;
        let capacity = self.buf.capacity();
        let stale = mem::replace(&mut self.buf, BufWriter::with_capacity(capacity, file));

        let (file, pending) = stale.into_parts();
        let pending = pending.unwrap_or_else(|panicked| panicked.into_inner());

        let on_disk = file.metadata()?.len();
        if on_disk >= position {
            file.set_len(position)?;
        } else {
            let keep = ((position - on_disk) as usize).min(pending.len());
            self.buf.write_all(&pending[..keep])?;
        }

        Ok(())
    }

    /// Length of a read starting at `offset`, as long as it stays within `size`
    fn checked_len(&self, offset: u64, len: u64) -> Result<usize> {
        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(len as usize),
            _ => Err(Error::EndOfData {
                offset,
                size: self.size,
            }),
        }
    }

    /// Positional read of the file, the append mode keeps writes at the end
    /// regardless of the cursor.
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        self.checked_len(offset, buf.len() as u64)?;

        let mut file = self.buf.get_ref();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::EndOfData {
                offset,
                size: self.size,
            },
            _ => Error::Io(e),
        })
    }
}
