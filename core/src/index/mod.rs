//! The append-only index — one summary row per written profile.
//!
//! Rows hold `token, ip, method, url, time, parent` in comma-separated
//! form. Search walks the file from its end so the newest rows come first.

pub mod csv;
pub mod reverse;

pub use reverse::ReverseLineReader;

use serde::{Deserialize, Serialize};

use crate::profile::Profile;

// ---------------------------------------------------------------------------
// IndexEntry
// ---------------------------------------------------------------------------

/// Summary of one profile as recorded in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub token: String,
    pub ip: String,
    pub method: String,
    pub url: String,
    pub time: u64,
    pub parent: Option<String>,
}

impl IndexEntry {
    pub fn from_profile(profile: &Profile) -> Self {
        IndexEntry {
            token: profile.token().to_string(),
            ip: profile.ip().to_string(),
            method: profile.method().to_string(),
            url: profile.url().to_string(),
            time: profile.time(),
            parent: profile.parent_token().map(str::to_string),
        }
    }

    /// The index row for this entry, terminator included.
    pub fn to_record(&self) -> String {
        let time = self.time.to_string();
        csv::encode_record(&[
            self.token.as_str(),
            self.ip.as_str(),
            self.method.as_str(),
            self.url.as_str(),
            time.as_str(),
            self.parent.as_deref().unwrap_or(""),
        ])
    }

    /// Parse an index row. Fails on short rows and non-numeric times.
    pub fn from_record(line: &str) -> Result<IndexEntry, String> {
        let mut fields = csv::decode_record(line);
        if fields.len() < 6 {
            return Err(format!("expected 6 fields, found {}", fields.len()));
        }
        fields.truncate(6);
        let time = fields[4]
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("bad time field: {:?}", fields[4]))?;
        let [token, ip, method, url, _, parent]: [String; 6] = fields
            .try_into()
            .map_err(|v: Vec<String>| format!("expected 6 fields, found {}", v.len()))?;
        Ok(IndexEntry {
            token,
            ip,
            method,
            url,
            time,
            parent: Some(parent).filter(|p| !p.is_empty()),
        })
    }
}

// ---------------------------------------------------------------------------
// SearchFilter
// ---------------------------------------------------------------------------

/// Criteria for `find`. Empty or absent fields match every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub ip: Option<String>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub limit: usize,
}

impl SearchFilter {
    /// Match everything, newest `limit` rows.
    pub fn latest(limit: usize) -> Self {
        SearchFilter {
            limit,
            ..SearchFilter::default()
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Substring match on ip, url and method.
    pub fn matches(&self, entry: &IndexEntry) -> bool {
        contains(&entry.ip, self.ip.as_deref())
            && contains(&entry.url, self.url.as_deref())
            && contains(&entry.method, self.method.as_deref())
    }
}

fn contains(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(n) if !n.is_empty() => haystack.contains(n),
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(token: &str, ip: &str, method: &str, url: &str) -> IndexEntry {
        IndexEntry {
            token: token.into(),
            ip: ip.into(),
            method: method.into(),
            url: url.into(),
            time: 1_300_000_000,
            parent: None,
        }
    }

    #[test]
    fn record_from_profile() {
        let mut p = Profile::new("abc");
        p.set_ip("10.1.1.1");
        p.set_method("GET");
        p.set_url("/home");
        p.set_time(42);
        p.set_parent_token(Some("par".into()));
        let e = IndexEntry::from_profile(&p);
        assert_eq!(e.to_record(), "abc,10.1.1.1,GET,/home,42,par\n");
    }

    #[test]
    fn missing_parent_is_empty_field() {
        let e = entry("abc", "::1", "GET", "/");
        assert!(e.to_record().ends_with(",\n"));
        let back = IndexEntry::from_record(e.to_record().trim_end()).unwrap();
        assert_eq!(back.parent, None);
    }

    #[test]
    fn parse_quoted_url() {
        let mut e = entry("t", "127.0.0.1", "GET", "/search?q=a,b");
        e.parent = Some("p".into());
        let back = IndexEntry::from_record(e.to_record().trim_end()).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn short_row_is_rejected() {
        assert!(IndexEntry::from_record("t,127.0.0.1,GET").is_err());
    }

    #[test]
    fn non_numeric_time_is_rejected() {
        assert!(IndexEntry::from_record("t,ip,GET,/,soon,").is_err());
    }

    #[test]
    fn extra_fields_are_ignored() {
        let e = IndexEntry::from_record("t,ip,GET,/,9,p,extra").unwrap();
        assert_eq!(e.parent.as_deref(), Some("p"));
        assert_eq!(e.time, 9);
    }

    #[test]
    fn empty_filter_matches_all() {
        let f = SearchFilter::latest(10);
        assert!(f.matches(&entry("a", "1.2.3.4", "GET", "/")));
        let f = SearchFilter::latest(10).with_ip("").with_url("");
        assert!(f.matches(&entry("a", "1.2.3.4", "GET", "/")));
    }

    #[test]
    fn filters_are_substring_matches() {
        let e = entry("a", "127.0.0.1", "POST", "http://example.com/login");
        assert!(SearchFilter::latest(1).with_ip("127").matches(&e));
        assert!(SearchFilter::latest(1).with_url("example.com").matches(&e));
        assert!(SearchFilter::latest(1).with_method("POS").matches(&e));
        assert!(!SearchFilter::latest(1).with_ip("192").matches(&e));
        assert!(!SearchFilter::latest(1).with_method("GET").matches(&e));
    }

    #[test]
    fn all_filters_must_match() {
        let e = entry("a", "127.0.0.1", "GET", "/admin");
        let f = SearchFilter::latest(1).with_ip("127").with_url("/admin").with_method("POST");
        assert!(!f.matches(&e));
    }
}
