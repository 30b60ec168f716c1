//! Volume locators: `[protocol://]path[?key=value&...]`.
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::VolumeError;

/// A parsed volume locator.
///
/// The protocol selects a reader (the `raw` protocol carries the decode
/// hints in the query string), the path names the file on disk and the
/// query holds reader-specific parameters in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VolumeUrl {
    protocol: Option<String>,
    path: String,
    query: Vec<(String, String)>,
}

impl VolumeUrl {
    /// Parse a locator string. Parsing never fails: a string without
    /// `://` is a plain path and a string without `?` has no query.
    pub fn parse(url: &str) -> Self {
        let (protocol, rest) = match url.find("://") {
            Some(i) if i > 0 && url[..i].chars().all(|c| c.is_ascii_alphanumeric()) => {
                (Some(url[..i].to_string()), &url[i + 3..])
            }
            _ => (None, url),
        };
        let (path, query) = match rest.find('?') {
            Some(i) => (&rest[..i], Some(&rest[i + 1..])),
            None => (rest, None),
        };
        let query = query
            .map(|q| {
                q.split('&')
                    .filter(|kv| !kv.is_empty())
                    .map(|kv| match kv.find('=') {
                        Some(i) => (kv[..i].to_string(), kv[i + 1..].to_string()),
                        None => (kv.to_string(), String::new()),
                    })
                    .collect()
            })
            .unwrap_or_default();
        VolumeUrl {
            protocol,
            path: path.to_string(),
            query,
        }
    }

    /// Create a locator with the given protocol and path and no query.
    pub fn new<P: AsRef<Path>>(protocol: Option<&str>, path: P) -> Self {
        VolumeUrl {
            protocol: protocol.map(str::to_string),
            path: path.as_ref().to_string_lossy().into_owned(),
            query: Vec::new(),
        }
    }

    /// The protocol, if any was given.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_ref().map(String::as_str)
    }

    /// Replace the protocol.
    pub fn set_protocol(&mut self, protocol: Option<&str>) {
        self.protocol = protocol.map(str::to_string);
    }

    /// The path component, as given.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The path component as a file system path.
    pub fn file_path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }

    /// All query parameters, in order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Look up a query parameter: first by exact key, then ignoring case.
    pub fn search_parameter(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .or_else(|| self.query.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)))
            .map(|(_, v)| v.as_str())
    }

    /// Set a query parameter, replacing an existing value for the same key.
    pub fn add_search_parameter<V: ToString>(&mut self, key: &str, value: V) {
        let value = value.to_string();
        match self.query.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.query.push((key.to_string(), value)),
        }
    }

    /// Remove a query parameter, returning its value.
    pub fn remove_search_parameter(&mut self, key: &str) -> Option<String> {
        let i = self.query.iter().position(|(k, _)| k == key)?;
        Some(self.query.remove(i).1)
    }

    /// The lower case extension of the path, if any. A trailing `.gz` is
    /// skipped, so `head.pvm.gz` has extension `pvm`.
    pub fn extension(&self) -> Option<String> {
        let p = Path::new(&self.path);
        let mut ext = p.extension()?.to_string_lossy().to_ascii_lowercase();
        if ext == "gz" {
            ext = Path::new(p.file_stem()?)
                .extension()?
                .to_string_lossy()
                .to_ascii_lowercase();
        }
        Some(ext)
    }
}

impl fmt::Display for VolumeUrl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(p) = &self.protocol {
            write!(f, "{}://", p)?;
        }
        f.write_str(&self.path)?;
        for (i, (k, v)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, k, v)?;
        }
        Ok(())
    }
}

impl FromStr for VolumeUrl {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self, VolumeError> {
        Ok(VolumeUrl::parse(s))
    }
}

impl<'a> From<&'a str> for VolumeUrl {
    fn from(s: &'a str) -> Self {
        VolumeUrl::parse(s)
    }
}

impl<'a> From<&'a Path> for VolumeUrl {
    fn from(p: &'a Path) -> Self {
        VolumeUrl::new(None, p)
    }
}

#[cfg(test)]
mod tests {
    use super::VolumeUrl;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_full() {
        let url = VolumeUrl::parse("raw:///data/a.raw?dim_x=4&Format=UCHAR&flag");
        assert_eq!(url.protocol(), Some("raw"));
        assert_eq!(url.path(), "/data/a.raw");
        assert_eq!(url.search_parameter("dim_x"), Some("4"));
        assert_eq!(url.search_parameter("format"), Some("UCHAR"));
        assert_eq!(url.search_parameter("flag"), Some(""));
        assert_eq!(url.search_parameter("dim_y"), None);
    }

    #[test]
    fn parse_plain_path() {
        let url = VolumeUrl::parse("C:\\vol\\head.dat");
        assert_eq!(url.protocol(), None);
        assert_eq!(url.path(), "C:\\vol\\head.dat");
        assert!(url.query().is_empty());
        assert_eq!(url.extension(), Some("dat".to_string()));
    }

    #[test]
    fn display_round_trip() {
        let mut url = VolumeUrl::new(Some("dat"), "/data/head.dat");
        url.add_search_parameter("timeframe", 2);
        url.add_search_parameter("timeframe", 3);
        let s = url.to_string();
        assert_eq!(s, "dat:///data/head.dat?timeframe=3");
        assert_eq!(VolumeUrl::parse(&s), url);
    }

    #[test]
    fn gz_extension() {
        assert_eq!(
            VolumeUrl::parse("/a/b.pvm.gz").extension(),
            Some("pvm".to_string())
        );
    }
}
