//! dirwatch protocol - the inotify record stream and its decoding.
//!
//! This crate provides:
//! - [`ChangeCategory`] bitflags for event masks and the [`CATEGORY_NAMES`] display table
//! - [`RawEvent`] matching the kernel's `struct inotify_event` layout
//! - [`segment`] to split one read buffer into [`Record`]s
//! - [`decode`] to turn a [`Record`] into a [`DecodedEvent`]
//!
//! No I/O happens here; the bytes come from whatever session filled the buffer.
//!
//! # Example
//!
//! ```rust
//! use dirwatch_protocol::{ChangeCategory, RawEvent, decode, segment};
//!
//! let mask = ChangeCategory::IN_CREATE | ChangeCategory::IN_ISDIR;
//! let bytes = RawEvent::new(1, mask, 0).to_bytes_with_name(b"subdir");
//!
//! for record in segment(&bytes).unwrap() {
//!     let event = decode(record);
//!     assert_eq!(event.name.as_deref(), Some("subdir"));
//!     assert!(event.is_dir());
//! }
//! ```

mod decode;
mod event;
mod segment;

pub use decode::{DecodedEvent, decode};
pub use event::{
    CATEGORY_NAMES, ChangeCategory, MAX_NAME_LEN, MIN_READ_BUFFER, RawEvent, event_size_with_name,
};
pub use segment::{ProtocolError, Record, Records, segment};
