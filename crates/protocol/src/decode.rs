//! Turning raw records into structured events.

use crate::event::ChangeCategory;
use crate::segment::Record;

/// A decoded change event.
///
/// Lives for one dispatch cycle: built from a [`Record`], handed to a
/// reporter, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    /// Watch descriptor the event belongs to. Unspecified for overflow events.
    pub wd: i32,
    /// Every category set in the record's mask.
    pub mask: ChangeCategory,
    /// Pairs the `IN_MOVED_FROM` and `IN_MOVED_TO` halves of a rename; 0 if unused.
    pub cookie: u32,
    /// Length of the raw name field, padding included.
    pub len: u32,
    /// Name of the directory entry, for events about an entry of a watched directory.
    pub name: Option<String>,
}

impl DecodedEvent {
    /// Whether the subject of the event is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.mask.contains(ChangeCategory::IN_ISDIR)
    }

    /// Whether this is the queue overflow sentinel, whose `wd` carries no meaning.
    #[must_use]
    pub fn is_overflow(&self) -> bool {
        self.mask.contains(ChangeCategory::IN_Q_OVERFLOW)
    }
}

/// Decode one record produced by [`segment`](crate::segment).
///
/// The name is cut at the first NUL byte, which drops the terminator and the
/// alignment padding. Names that are empty after trimming are reported as
/// absent.
#[must_use]
pub fn decode(record: Record<'_>) -> DecodedEvent {
    let header = record.header();

    let name = record
        .name_bytes()
        .split(|&b| b == 0)
        .next()
        .filter(|name| !name.is_empty())
        .map(|name| String::from_utf8_lossy(name).into_owned());

    DecodedEvent {
        wd: header.wd,
        mask: header.categories(),
        cookie: header.cookie,
        len: header.len,
        name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RawEvent;
    use crate::segment::segment;

    fn decode_one(bytes: &[u8]) -> DecodedEvent {
        decode(segment(bytes).unwrap().next().unwrap())
    }

    #[test]
    fn test_decode_reconstructs_fields() {
        let mask = ChangeCategory::IN_MOVED_TO;
        let bytes = RawEvent::new(4, mask, 0xdead_beef).to_bytes_with_name(b"renamed.txt");

        let event = decode_one(&bytes);
        assert_eq!(event.wd, 4);
        assert_eq!(event.mask, mask);
        assert_eq!(event.cookie, 0xdead_beef);
        assert_eq!(event.len, 12);
        assert_eq!(event.name.as_deref(), Some("renamed.txt"));
    }

    #[test]
    fn test_decode_without_name() {
        let bytes = RawEvent::new(1, ChangeCategory::IN_DELETE_SELF, 0).header_to_bytes();

        let event = decode_one(&bytes);
        assert_eq!(event.len, 0);
        assert_eq!(event.name, None);
    }

    #[test]
    fn test_directory_create_reports_both_categories() {
        let mask = ChangeCategory::IN_CREATE | ChangeCategory::IN_ISDIR;
        let bytes = RawEvent::new(1, mask, 0).to_bytes_with_name(b"subdir");

        let event = decode_one(&bytes);
        assert!(event.is_dir());
        assert!(event.mask.contains(ChangeCategory::IN_CREATE));
        assert_eq!(event.mask.names().collect::<Vec<_>>(), ["IN_CREATE", "IN_ISDIR"]);
    }

    #[test]
    fn test_overflow_sentinel_decodes() {
        let bytes = RawEvent::new(-1, ChangeCategory::IN_Q_OVERFLOW, 0).header_to_bytes();

        let event = decode_one(&bytes);
        assert!(event.is_overflow());
        assert_eq!(event.wd, -1);
    }

    #[test]
    fn test_name_field_of_only_padding_is_absent() {
        let header = RawEvent {
            wd: 2,
            mask: ChangeCategory::IN_OPEN.bits(),
            cookie: 0,
            len: 8,
        };
        let mut bytes = header.header_to_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 8]);

        assert_eq!(decode_one(&bytes).name, None);
    }

    #[test]
    fn test_non_utf8_name_is_lossy() {
        let bytes = RawEvent::new(1, ChangeCategory::IN_CREATE, 0).to_bytes_with_name(b"bad\xffname");
        assert_eq!(decode_one(&bytes).name.as_deref(), Some("bad\u{fffd}name"));
    }
}
