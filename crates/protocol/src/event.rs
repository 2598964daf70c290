//! Change categories and the raw inotify event layout.
//!
//! The record layout is binary-compatible with the kernel's
//! `struct inotify_event`, so buffers read straight from an inotify
//! descriptor can be segmented and decoded without copying.

use bitflags::bitflags;

bitflags! {
    /// Set of change categories carried in an event mask.
    ///
    /// Bit values match the kernel's inotify mask values exactly. Flags are
    /// declared in reporting order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChangeCategory: u32 {
        /// File was accessed (e.g., read).
        const IN_ACCESS = 0x0000_0001;
        /// Metadata changed (e.g., permissions, timestamps).
        const IN_ATTRIB = 0x0000_0004;
        /// Writable file was closed.
        const IN_CLOSE_WRITE = 0x0000_0008;
        /// File or directory not opened for writing was closed.
        const IN_CLOSE_NOWRITE = 0x0000_0010;
        /// File/directory created in watched directory.
        const IN_CREATE = 0x0000_0100;
        /// File/directory deleted from watched directory.
        const IN_DELETE = 0x0000_0200;
        /// Watched file/directory was itself deleted.
        const IN_DELETE_SELF = 0x0000_0400;
        /// File was modified.
        const IN_MODIFY = 0x0000_0002;
        /// Watched file/directory was itself moved.
        const IN_MOVE_SELF = 0x0000_0800;
        /// File/directory moved out of watched directory.
        const IN_MOVED_FROM = 0x0000_0040;
        /// File/directory moved into watched directory.
        const IN_MOVED_TO = 0x0000_0080;
        /// File/directory was opened.
        const IN_OPEN = 0x0000_0020;
        /// Watch was removed (explicitly or automatically).
        const IN_IGNORED = 0x0000_8000;
        /// Subject of event is a directory.
        const IN_ISDIR = 0x4000_0000;
        /// Event queue overflowed (wd is -1).
        const IN_Q_OVERFLOW = 0x0000_4000;
        /// Filesystem containing watched object was unmounted.
        const IN_UNMOUNT = 0x0000_2000;

        /// Every category above. Sessions always register with this mask;
        /// filtering is left to whoever presents the events.
        const WATCH_ALL = Self::IN_ACCESS.bits()
            | Self::IN_ATTRIB.bits()
            | Self::IN_CLOSE_WRITE.bits()
            | Self::IN_CLOSE_NOWRITE.bits()
            | Self::IN_CREATE.bits()
            | Self::IN_DELETE.bits()
            | Self::IN_DELETE_SELF.bits()
            | Self::IN_MODIFY.bits()
            | Self::IN_MOVE_SELF.bits()
            | Self::IN_MOVED_FROM.bits()
            | Self::IN_MOVED_TO.bits()
            | Self::IN_OPEN.bits()
            | Self::IN_IGNORED.bits()
            | Self::IN_ISDIR.bits()
            | Self::IN_Q_OVERFLOW.bits()
            | Self::IN_UNMOUNT.bits();
    }
}

/// Display names for every single-bit category, in declaration order.
pub const CATEGORY_NAMES: [(ChangeCategory, &str); 16] = [
    (ChangeCategory::IN_ACCESS, "IN_ACCESS"),
    (ChangeCategory::IN_ATTRIB, "IN_ATTRIB"),
    (ChangeCategory::IN_CLOSE_WRITE, "IN_CLOSE_WRITE"),
    (ChangeCategory::IN_CLOSE_NOWRITE, "IN_CLOSE_NOWRITE"),
    (ChangeCategory::IN_CREATE, "IN_CREATE"),
    (ChangeCategory::IN_DELETE, "IN_DELETE"),
    (ChangeCategory::IN_DELETE_SELF, "IN_DELETE_SELF"),
    (ChangeCategory::IN_MODIFY, "IN_MODIFY"),
    (ChangeCategory::IN_MOVE_SELF, "IN_MOVE_SELF"),
    (ChangeCategory::IN_MOVED_FROM, "IN_MOVED_FROM"),
    (ChangeCategory::IN_MOVED_TO, "IN_MOVED_TO"),
    (ChangeCategory::IN_OPEN, "IN_OPEN"),
    (ChangeCategory::IN_IGNORED, "IN_IGNORED"),
    (ChangeCategory::IN_ISDIR, "IN_ISDIR"),
    (ChangeCategory::IN_Q_OVERFLOW, "IN_Q_OVERFLOW"),
    (ChangeCategory::IN_UNMOUNT, "IN_UNMOUNT"),
];

impl ChangeCategory {
    /// Names of every category present in this set, in declaration order.
    ///
    /// Each category is tested independently, so a mask carrying both
    /// `IN_CREATE` and `IN_ISDIR` yields both names.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        CATEGORY_NAMES
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
    }
}

/// Longest single path component the kernel will report (`NAME_MAX`).
pub const MAX_NAME_LEN: usize = 255;

/// Smallest read buffer guaranteed to hold at least one event.
pub const MIN_READ_BUFFER: usize = RawEvent::HEADER_SIZE + MAX_NAME_LEN + 1;

/// Fixed-size header of a raw inotify record.
///
/// Binary-compatible with the kernel's `struct inotify_event`; the
/// variable-length name follows the header in the stream.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Watch descriptor, unspecified for queue overflow events.
    pub wd: i32,
    /// Category mask.
    pub mask: u32,
    /// Unique cookie associating related events (for rename).
    pub cookie: u32,
    /// Length of the name field, padding included.
    pub len: u32,
    // name: [u8; len] follows
}

impl RawEvent {
    /// Size of the fixed portion of the record.
    pub const HEADER_SIZE: usize = std::mem::size_of::<Self>();

    /// Create a header with no name.
    #[must_use]
    pub const fn new(wd: i32, mask: ChangeCategory, cookie: u32) -> Self {
        Self {
            wd,
            mask: mask.bits(),
            cookie,
            len: 0,
        }
    }

    /// Total size of this record including the name, or `None` if the
    /// length field cannot be addressed on this platform.
    #[must_use]
    pub const fn total_size(&self) -> Option<usize> {
        Self::HEADER_SIZE.checked_add(self.len as usize)
    }

    /// Serialize the header to bytes.
    #[must_use]
    pub fn header_to_bytes(&self) -> [u8; Self::HEADER_SIZE] {
        let mut buf = [0u8; Self::HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.wd.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.mask.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.cookie.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.len.to_ne_bytes());
        buf
    }

    /// Serialize this record with the given name.
    ///
    /// The name is NUL-terminated and padded to the next 4-byte boundary,
    /// matching kernel behavior. An empty name produces a header-only record.
    #[must_use]
    pub fn to_bytes_with_name(&self, name: &[u8]) -> Vec<u8> {
        if name.is_empty() {
            return Self { len: 0, ..*self }.header_to_bytes().to_vec();
        }

        let padded_len = padded_name_len(name.len());
        let header = Self {
            len: padded_len as u32,
            ..*self
        };

        let mut buf = Vec::with_capacity(Self::HEADER_SIZE + padded_len);
        buf.extend_from_slice(&header.header_to_bytes());
        buf.extend_from_slice(name);
        buf.resize(Self::HEADER_SIZE + padded_len, 0);
        buf
    }

    /// Parse a header from the front of `buf`.
    ///
    /// Returns `None` if the buffer is too small.
    #[must_use]
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        let header = buf.get(..Self::HEADER_SIZE)?;

        Some(Self {
            wd: i32::from_ne_bytes(header[0..4].try_into().ok()?),
            mask: u32::from_ne_bytes(header[4..8].try_into().ok()?),
            cookie: u32::from_ne_bytes(header[8..12].try_into().ok()?),
            len: u32::from_ne_bytes(header[12..16].try_into().ok()?),
        })
    }

    /// The mask as a category set. Unknown bits are kept.
    #[must_use]
    pub const fn categories(&self) -> ChangeCategory {
        ChangeCategory::from_bits_retain(self.mask)
    }
}

/// Name length including NUL terminator, rounded up to 4-byte alignment.
const fn padded_name_len(name_len: usize) -> usize {
    (name_len + 1 + 3) & !3
}

/// Total encoded size of a record carrying a name of `name_len` bytes.
#[must_use]
pub const fn event_size_with_name(name_len: usize) -> usize {
    if name_len == 0 {
        RawEvent::HEADER_SIZE
    } else {
        RawEvent::HEADER_SIZE + padded_name_len(name_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_header_size() {
        // inotify_event header is always 16 bytes
        assert_eq!(RawEvent::HEADER_SIZE, 16);
        assert_eq!(MIN_READ_BUFFER, 16 + 256);
    }

    #[test]
    fn test_header_roundtrip() {
        let event = RawEvent::new(-1, ChangeCategory::IN_Q_OVERFLOW, 7);
        let parsed = RawEvent::from_bytes(&event.header_to_bytes()).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.total_size(), Some(16));
    }

    #[test]
    fn test_from_bytes_short_buffer() {
        assert!(RawEvent::from_bytes(&[0u8; 15]).is_none());
    }

    #[test]
    fn test_event_with_name() {
        let event = RawEvent::new(1, ChangeCategory::IN_CREATE, 0);
        let bytes = event.to_bytes_with_name(b"test.txt");

        // Header (16) + "test.txt" (8) + null (1) = 25, padded to 28
        assert_eq!(bytes.len(), 16 + 12);

        let parsed = RawEvent::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.len, 12);
        assert_eq!(&bytes[16..24], b"test.txt");
        assert!(bytes[24..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_event_size_calculation() {
        assert_eq!(event_size_with_name(0), 16);
        // "a" -> 1 + 1 null = 2, padded to 4
        assert_eq!(event_size_with_name(1), 16 + 4);
        // "abc" -> 3 + 1 null = 4, no padding needed
        assert_eq!(event_size_with_name(3), 16 + 4);
        // "abcd" -> 4 + 1 null = 5, padded to 8
        assert_eq!(event_size_with_name(4), 16 + 8);
        assert!(event_size_with_name(MAX_NAME_LEN) <= MIN_READ_BUFFER);
    }

    #[test]
    fn test_watch_all_covers_every_named_category() {
        for (flag, _) in CATEGORY_NAMES {
            assert!(ChangeCategory::WATCH_ALL.contains(flag));
        }
        assert_eq!(
            ChangeCategory::WATCH_ALL.bits().count_ones() as usize,
            CATEGORY_NAMES.len()
        );
    }

    #[test]
    fn test_names_follow_declaration_order() {
        let mask = ChangeCategory::IN_ISDIR | ChangeCategory::IN_CREATE;
        let names: Vec<_> = mask.names().collect();
        assert_eq!(names, ["IN_CREATE", "IN_ISDIR"]);

        let mask = ChangeCategory::IN_OPEN | ChangeCategory::IN_ACCESS | ChangeCategory::IN_MODIFY;
        let names: Vec<_> = mask.names().collect();
        assert_eq!(names, ["IN_ACCESS", "IN_MODIFY", "IN_OPEN"]);
    }

    #[test]
    fn test_unknown_bits_are_retained() {
        let event = RawEvent {
            wd: 1,
            mask: 0x0100_0100,
            cookie: 0,
            len: 0,
        };
        let categories = event.categories();
        assert_eq!(categories.bits(), 0x0100_0100);
        assert_eq!(categories.names().collect::<Vec<_>>(), ["IN_CREATE"]);
    }
}
