//! `Range` header handling
//!
//! Only a single `bytes=` range is supported. Anything else, including
//! a range outside the file, is answered with 416.

/// Inclusive byte window `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes in the window
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for a file of `size` bytes
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

/// What to send for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// No `Range` header: the whole file with 200
    Full,
    /// A satisfiable range: 206
    Partial(ByteRange),
    /// 416 with `Content-Range: bytes */<size>`
    Unsatisfiable,
}

impl RangeRequest {
    /// Decide from the raw `Range` header and the file size
    pub fn from_header(header: Option<&str>, size: u64) -> Self {
        let Some(header) = header else {
            return RangeRequest::Full;
        };

        match parse(header).and_then(|spec| spec.resolve(size)) {
            Some(range) => RangeRequest::Partial(range),
            None => RangeRequest::Unsatisfiable,
        }
    }
}

/// `Content-Range` value for a 416 response
pub fn unsatisfied_range(size: u64) -> String {
    format!("bytes */{}", size)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeSpec {
    /// `bytes=<start>-` or `bytes=<start>-<end>`
    From { start: u64, end: Option<u64> },
    /// `bytes=-<len>`
    Suffix(u64),
}

impl RangeSpec {
    fn resolve(self, size: u64) -> Option<ByteRange> {
        if size == 0 {
            return None;
        }
        let last = size - 1;

        match self {
            RangeSpec::From { start, end } => {
                let end = end.unwrap_or(last);
                if start > last || end > last || start > end {
                    return None;
                }
                Some(ByteRange { start, end })
            }
            RangeSpec::Suffix(0) => None,
            RangeSpec::Suffix(len) => Some(ByteRange {
                start: size.saturating_sub(len),
                end: last,
            }),
        }
    }
}

fn parse(header: &str) -> Option<RangeSpec> {
    let spec = header.trim().strip_prefix("bytes=")?.trim();
    if spec.contains(',') {
        return None;
    }

    let (start, end) = spec.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    match (start.is_empty(), end.is_empty()) {
        (false, true) => Some(RangeSpec::From {
            start: number(start)?,
            end: None,
        }),
        (false, false) => Some(RangeSpec::From {
            start: number(start)?,
            end: Some(number(end)?),
        }),
        (true, false) => Some(RangeSpec::Suffix(number(end)?)),
        (true, true) => None,
    }
}

fn number(s: &str) -> Option<u64> {
    if s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial(start: u64, end: u64) -> RangeRequest {
        RangeRequest::Partial(ByteRange { start, end })
    }

    #[test]
    fn test_no_header_is_full() {
        assert_eq!(RangeRequest::from_header(None, 1000), RangeRequest::Full);
        assert_eq!(RangeRequest::from_header(None, 0), RangeRequest::Full);
    }

    #[test]
    fn test_closed_range() {
        assert_eq!(RangeRequest::from_header(Some("bytes=0-99"), 1000), partial(0, 99));
        assert_eq!(
            RangeRequest::from_header(Some("bytes=999-999"), 1000),
            partial(999, 999)
        );
    }

    #[test]
    fn test_open_range_runs_to_end() {
        assert_eq!(RangeRequest::from_header(Some("bytes=500-"), 1000), partial(500, 999));
        assert_eq!(RangeRequest::from_header(Some("bytes=0-"), 1000), partial(0, 999));
    }

    #[test]
    fn test_suffix_range() {
        assert_eq!(RangeRequest::from_header(Some("bytes=-200"), 1000), partial(800, 999));
        assert_eq!(RangeRequest::from_header(Some("bytes=-5000"), 1000), partial(0, 999));
        assert_eq!(
            RangeRequest::from_header(Some("bytes=-0"), 1000),
            RangeRequest::Unsatisfiable
        );
    }

    #[test]
    fn test_out_of_bounds_is_unsatisfiable() {
        for header in ["bytes=2000-2100", "bytes=1000-", "bytes=0-1000", "bytes=50-10"] {
            assert_eq!(
                RangeRequest::from_header(Some(header), 1000),
                RangeRequest::Unsatisfiable,
                "{}",
                header
            );
        }
    }

    #[test]
    fn test_malformed_is_unsatisfiable() {
        for header in [
            "",
            "bytes=",
            "bytes=-",
            "bytes=abc-def",
            "bytes=+5-10",
            "items=0-10",
            "bytes=0-10,20-30",
            "bytes=10",
        ] {
            assert_eq!(
                RangeRequest::from_header(Some(header), 1000),
                RangeRequest::Unsatisfiable,
                "{}",
                header
            );
        }
    }

    #[test]
    fn test_empty_file_has_no_ranges() {
        assert_eq!(
            RangeRequest::from_header(Some("bytes=0-"), 0),
            RangeRequest::Unsatisfiable
        );
    }

    #[test]
    fn test_content_range() {
        let range = ByteRange { start: 0, end: 99 };
        assert_eq!(range.length(), 100);
        assert_eq!(range.content_range(1000), "bytes 0-99/1000");
        assert_eq!(unsatisfied_range(1000), "bytes */1000");
    }
}
