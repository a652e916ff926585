//! Format version parsing
//!
//! Every PFM text file starts with (or carries) a banner such as
//! `PFM Software - PFM library V6.30`. The `<major>.<minor>` after
//! `library V` is the on-disk format version that gates header keys,
//! record layouts and list file syntax.

use std::fmt;

const BANNER_MARKER: &str = "library V";

/// On-disk format version, compared as `major.minor` with a two digit minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion {
    pub major: u16,
    pub minor: u16,
}

impl FormatVersion {
    /// Version written by this library
    pub const CURRENT: FormatVersion = FormatVersion::new(6, 30);

    /// First version with an attribute array and packed validity word
    pub const ATTRIBUTES: FormatVersion = FormatVersion::new(4, 0);

    /// First version with a coverage map and sounding error fields
    pub const COVERAGE: FormatVersion = FormatVersion::new(5, 0);

    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Full banner string for this version
    pub fn banner(&self) -> String {
        format!("PFM Software - PFM library V{}", self)
    }

    /// Extract the version from any text containing `library V<major>.<minor>`.
    ///
    /// A single minor digit is read as tenths, so `V4.7` and `V4.70` compare
    /// equal.
    pub fn from_banner(text: &str) -> Option<Self> {
        let start = text.find(BANNER_MARKER)? + BANNER_MARKER.len();
        let rest = &text[start..];

        let major_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if major_len == 0 {
            return None;
        }
        let major: u16 = rest[..major_len].parse().ok()?;

        let minor_text = rest[major_len..].strip_prefix('.').unwrap_or("");
        let minor_digits: String = minor_text.chars().take_while(char::is_ascii_digit).take(2).collect();
        let minor = match minor_digits.len() {
            0 => 0,
            1 => minor_digits.parse::<u16>().ok()? * 10,
            _ => minor_digits.parse().ok()?,
        };

        Some(Self { major, minor })
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}
