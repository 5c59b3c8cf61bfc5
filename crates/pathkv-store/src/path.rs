//! Dotted key parsing.
//!
//! A raw key such as `"user.address.city"` splits into the top-level
//! record key (`user`) and the path inside that record's value
//! (`["address", "city"]`). There is no escaping, so a field whose name
//! contains `.` cannot be addressed.

use std::fmt;

/// A parsed key: the record it lives in plus the nested path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    /// Top-level key; the primary key of the backing row.
    pub top: String,
    /// Segments below the record root. Empty means the whole record.
    pub rest: Vec<String>,
}

impl KeyPath {
    /// Split `raw` on `.`.
    ///
    /// Empty segments after the first are dropped, so `"a."` addresses the
    /// whole record `a` and `"a..b"` is the same as `"a.b"`.
    pub fn parse(raw: &str) -> Self {
        let mut segments = raw.split('.');
        let top = segments.next().unwrap_or_default().to_string();
        let rest = segments
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { top, rest }
    }

    /// Whether the key addresses the entire record value.
    pub fn is_whole_record(&self) -> bool {
        self.rest.is_empty()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.top)?;
        for segment in &self.rest {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

impl From<&str> for KeyPath {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}
