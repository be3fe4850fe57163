//! Encoding
//!
//! Byte order and field widths shared by the store and the index. Both files
//! are written with the same fixed byte order so they stay portable across
//! machines, no matter the native endianness.
//!
//! Store frame:
//!
//! |------------------------------------|
//! | length (8 bytes) | payload (length) |
//! |------------------------------------|
//!
//! Index entry:
//!
//! |-----------------------------------------|
//! | relative offset (4) | store position (8) |
//! |-----------------------------------------|

use byteorder::BigEndian;

/// Byte order used for every integer written to disk
pub type Enc = BigEndian;

/// Amount of bytes used by the length prefix of a store frame
pub const LEN_WIDTH: u64 = 8;

/// Amount of bytes used by the relative offset of an index entry
pub const OFF_WIDTH: u64 = 4;

/// Amount of bytes used by the store position of an index entry
pub const POS_WIDTH: u64 = 8;

/// Amount of bytes for each entry on the index
pub const ENTRY_WIDTH: u64 = OFF_WIDTH + POS_WIDTH;
