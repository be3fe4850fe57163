//! Commit Log storage
//!
//! The two file-backed halves of a commit log segment:
//!
//!  * [`Store`], an append-only file of length-prefixed records.
//!  * [`Index`], a memory-mapped file of fixed-width entries mapping a relative
//!    offset to the position of its record in the store.
//!
//! A segment keeps one of each in lock-step, for every record appended to the
//! store it writes exactly one entry to the index:
//!
//! ```text
//!  append(record) ---> Store ---> position ---> Index.write(offset, position)
//!
//!  read(offset)   ---> Index.read(offset) ---> position ---> Store.read_at(position)
//! ```
//!
//! e.g.:
//!
//! ```no_run
//! use commit_log::{Config, Index, Store, LAST_ENTRY};
//!
//! let config = Config::new().max_index_bytes(1024);
//! let store = Store::open("/tmp/00000000000000000000.store")?;
//! let mut index = Index::open("/tmp/00000000000000000000.index", &config)?;
//!
//! let (_, position) = store.append(b"hello world")?;
//! index.write(index.len() as u32, position)?;
//!
//! let (_, position) = index.read(LAST_ENTRY)?;
//! assert_eq!(store.read_at(position)?, b"hello world");
//!
//! index.close()?;
//! store.close()?;
//! # Ok::<(), commit_log::Error>(())
//! ```
//!
//! Rolling over to a new pair once `Config::segment` limits are reached is left to
//! the owner of the pair.

mod config;
mod encoding;
mod error;
mod index;
mod store;

pub use self::config::{Config, SegmentConfig};
pub use self::encoding::{Enc, ENTRY_WIDTH, LEN_WIDTH, OFF_WIDTH, POS_WIDTH};
pub use self::error::{Error, Result};
pub use self::index::{Index, LAST_ENTRY};
pub use self::store::Store;
