//! Line oriented tokenizer for key/value text headers.
//!
//! A [`TextHeaderReader`] splits each meaningful line of a header into a key
//! and its arguments. The character sets used for whitespace, comments and
//! key separators are part of each reader's configuration, so one type serves
//! `Key: value` headers as well as `key=value` headers.
//!
//! [`TextHeaderReader`]: ./struct.TextHeaderReader.html
use crate::error::Result;
use crate::util::open_file;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::str::FromStr;

/// Default whitespace characters.
pub const DEFAULT_WHITESPACE: &str = " \t\r\n";
/// Default comment characters.
pub const DEFAULT_COMMENT_CHARS: &str = "#";

/// One tokenized header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine {
    /// The leading token, lower case when read with case folding.
    pub key: String,
    /// The remainder of the line, trailing whitespace removed.
    pub args: String,
}

impl HeaderLine {
    /// A typed reader over the arguments.
    pub fn arg_stream(&self) -> ArgStream {
        ArgStream::new(&self.args)
    }
}

/// Tokenizer for line oriented text headers.
#[derive(Debug)]
pub struct TextHeaderReader<R> {
    source: R,
    whitespace: String,
    comment_chars: String,
    separators: String,
    terminator: Option<u8>,
    terminated: bool,
    bytes_consumed: u64,
}

impl TextHeaderReader<BufReader<File>> {
    /// Open a header file for reading.
    ///
    /// # Errors
    ///
    /// - `VolumeError::NotFound` if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = open_file(path)?;
        Ok(TextHeaderReader::new(BufReader::new(file)))
    }
}

impl<R: BufRead> TextHeaderReader<R> {
    /// Create a reader over the given source with the default character
    /// sets: whitespace `" \t\r\n"`, comments `#`, whitespace as separators.
    pub fn new(source: R) -> Self {
        TextHeaderReader {
            source,
            whitespace: DEFAULT_WHITESPACE.to_string(),
            comment_chars: DEFAULT_COMMENT_CHARS.to_string(),
            separators: DEFAULT_WHITESPACE.to_string(),
            terminator: None,
            terminated: false,
            bytes_consumed: 0,
        }
    }

    /// Replace the set of characters separating a key from its arguments.
    pub fn set_separators(&mut self, chars: &str) {
        self.separators = chars.to_string();
    }

    /// Replace the set of characters which start a comment line.
    pub fn set_comment_chars(&mut self, chars: &str) {
        self.comment_chars = chars.to_string();
    }

    /// Replace the set of whitespace characters.
    pub fn set_whitespace(&mut self, chars: &str) {
        self.whitespace = chars.to_string();
    }

    /// Stop reading at the first occurrence of the given byte, which ends
    /// the header. Bytes after it are never consumed.
    pub fn set_terminator(&mut self, byte: Option<u8>) {
        self.terminator = byte;
    }

    /// The number of bytes consumed from the source so far, including a
    /// terminator byte once reached.
    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    /// Whether the terminator byte has been reached.
    pub fn terminated(&self) -> bool {
        self.terminated
    }

    /// Retrieve the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Read the next meaningful line, splitting it into key and arguments.
    /// Blank lines and comment lines are skipped. With `fold_case`, the key
    /// is lower cased; the arguments never are.
    ///
    /// Returns `Ok(None)` at the end of the header.
    pub fn next_line(&mut self, fold_case: bool) -> Result<Option<HeaderLine>> {
        loop {
            let line = match self.read_raw_line()? {
                Some(line) => line,
                None => return Ok(None),
            };
            if let Some(parsed) = self.tokenize(&line, fold_case) {
                return Ok(Some(parsed));
            }
        }
    }

    /// Read the next meaningful line as a plain `(key, args)` pair, with the
    /// key kept as written.
    pub fn next_line_plain(&mut self) -> Result<Option<(String, String)>> {
        Ok(self.next_line(false)?.map(|l| (l.key, l.args)))
    }

    fn tokenize(&self, line: &str, fold_case: bool) -> Option<HeaderLine> {
        let ws = |c: char| self.whitespace.contains(c);
        let line = line.trim_start_matches(ws);
        let first = line.chars().next()?;
        if self.comment_chars.contains(first) {
            return None;
        }
        let sep = |c: char| self.separators.contains(c);
        let (key, rest) = match line.find(sep) {
            Some(i) => line.split_at(i),
            None => (line, ""),
        };
        let key = key.trim_end_matches(ws);
        let args = rest
            .trim_start_matches(|c: char| sep(c) || ws(c))
            .trim_end_matches(ws);
        let key = if fold_case {
            key.to_lowercase()
        } else {
            key.to_string()
        };
        Some(HeaderLine {
            key,
            args: args.to_string(),
        })
    }

    /// Read one line, without its line feed. A terminator byte ends the
    /// line and the header.
    fn read_raw_line(&mut self) -> Result<Option<String>> {
        if self.terminated {
            return Ok(None);
        }
        let terminator = self.terminator;
        let mut line = Vec::new();
        let mut any = false;
        loop {
            let (done, used) = {
                let buf = self.source.fill_buf()?;
                if buf.is_empty() {
                    break;
                }
                any = true;
                let stop = buf
                    .iter()
                    .position(|&b| b == b'\n' || Some(b) == terminator);
                match stop {
                    Some(i) => {
                        line.extend_from_slice(&buf[..i]);
                        if Some(buf[i]) == terminator {
                            self.terminated = true;
                        }
                        (true, i + 1)
                    }
                    None => {
                        line.extend_from_slice(buf);
                        (false, buf.len())
                    }
                }
            };
            self.source.consume(used);
            self.bytes_consumed += used as u64;
            if done {
                break;
            }
        }
        if !any {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

impl<R: BufRead + Seek> TextHeaderReader<R> {
    /// Rewind to the start of the source and return its first line
    /// verbatim, without the line feed. Reading continues after that line.
    pub fn magic_number(&mut self) -> Result<String> {
        let _ = self.source.seek(SeekFrom::Start(0))?;
        self.bytes_consumed = 0;
        self.terminated = false;
        let line = self.read_raw_line()?.unwrap_or_default();
        Ok(line.trim_end_matches('\r').to_string())
    }
}

/// A whitespace separated token reader over header arguments.
///
/// Once a token fails to parse, or the arguments run out, the stream enters
/// a sticky failed state, which callers check after consuming a key's
/// arguments.
#[derive(Debug, Clone)]
pub struct ArgStream<'a> {
    rest: &'a str,
    failed: bool,
}

impl<'a> ArgStream<'a> {
    /// Create a token reader over the given text.
    pub fn new(text: &'a str) -> Self {
        ArgStream {
            rest: text,
            failed: false,
        }
    }

    /// Read the next token, or `None` at the end of the text.
    pub fn token(&mut self) -> Option<&'a str> {
        if self.failed {
            return None;
        }
        let s = self.rest.trim_start();
        if s.is_empty() {
            self.failed = true;
            self.rest = s;
            return None;
        }
        let end = s.find(char::is_whitespace).unwrap_or_else(|| s.len());
        let (tok, rest) = s.split_at(end);
        self.rest = rest;
        Some(tok)
    }

    /// Read and parse the next token.
    pub fn read<T: FromStr>(&mut self) -> Option<T> {
        let tok = self.token()?;
        match tok.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                self.failed = true;
                None
            }
        }
    }

    /// Read three values into an array.
    pub fn read_array3<T: FromStr + Default + Copy>(&mut self) -> Option<[T; 3]> {
        let mut out = [T::default(); 3];
        for v in out.iter_mut() {
            *v = self.read()?;
        }
        Some(out)
    }

    /// The unread remainder of the text, trimmed.
    pub fn rest(&self) -> &'a str {
        self.rest.trim()
    }

    /// Whether a read failed.
    pub fn failed(&self) -> bool {
        self.failed
    }
}

/// Parse a `(x, y, z)` triple. Text before the opening parenthesis is
/// skipped. Returns `None` if the triple is incomplete or malformed; the
/// caller decides whether that is an error.
pub fn parse_vec3(text: &str) -> Option<[f32; 3]> {
    let start = text.find('(')?;
    let inner = &text[start + 1..];
    let inner = match inner.find(')') {
        Some(end) => &inner[..end],
        None => inner,
    };
    let mut out = [0f32; 3];
    let mut parts = inner.split(',');
    for v in out.iter_mut() {
        *v = parts.next()?.trim().parse().ok()?;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    const HEADER: &str = "# a comment\n\
                          ObjectFileName: nucleon.raw\n\
                          \n\
                          \t  Resolution:  41 41 41  \r\n\
                          Format:UCHAR\n\
                          # trailing\n\
                          Lonely";

    #[test]
    fn tokenize_dat_style() {
        let mut r = TextHeaderReader::new(Cursor::new(HEADER));
        r.set_separators(" \t:");
        let l = r.next_line(true).unwrap().unwrap();
        assert_eq!(l.key, "objectfilename");
        assert_eq!(l.args, "nucleon.raw");
        let l = r.next_line(true).unwrap().unwrap();
        assert_eq!(l.key, "resolution");
        assert_eq!(l.args, "41 41 41");
        let l = r.next_line(true).unwrap().unwrap();
        assert_eq!(l.key, "format");
        assert_eq!(l.args, "UCHAR");
        let (k, a) = r.next_line_plain().unwrap().unwrap();
        assert_eq!(k, "Lonely");
        assert_eq!(a, "");
        assert_eq!(r.next_line(true).unwrap(), None);
        assert_eq!(r.next_line(true).unwrap(), None);
    }

    #[test]
    fn args_keep_case() {
        let mut r = TextHeaderReader::new(Cursor::new("ByteOrder: BigEndian\n"));
        r.set_separators(":");
        let l = r.next_line(true).unwrap().unwrap();
        assert_eq!(l.key, "byteorder");
        assert_eq!(l.args, "BigEndian");
    }

    #[test]
    fn terminator_stops_header() {
        let data: &[u8] = b"ntf=2\n;comment\nnbx=4\x0c\x00\x00\x80\x3f";
        let mut r = TextHeaderReader::new(Cursor::new(data));
        r.set_separators("=");
        r.set_comment_chars(";");
        r.set_terminator(Some(0x0c));
        let l = r.next_line(false).unwrap().unwrap();
        assert_eq!((l.key.as_str(), l.args.as_str()), ("ntf", "2"));
        let l = r.next_line(false).unwrap().unwrap();
        assert_eq!((l.key.as_str(), l.args.as_str()), ("nbx", "4"));
        assert_eq!(r.next_line(false).unwrap(), None);
        assert!(r.terminated());
        assert_eq!(r.bytes_consumed(), 21);
    }

    #[test]
    fn magic_number_rewinds() {
        let mut r = TextHeaderReader::new(Cursor::new("PVM2\n4 4 4\n"));
        let _ = r.next_line(false).unwrap();
        assert_eq!(r.magic_number().unwrap(), "PVM2");
        let l = r.next_line(false).unwrap().unwrap();
        assert_eq!(l.key, "4");
        assert_eq!(l.args, "4 4");
    }

    #[test]
    fn arg_stream_fail_state() {
        let mut s = ArgStream::new("41 41 x");
        assert_eq!(s.read::<i32>(), Some(41));
        assert_eq!(s.read::<i32>(), Some(41));
        assert!(!s.failed());
        assert_eq!(s.read::<i32>(), None);
        assert!(s.failed());
        assert_eq!(s.read::<i32>(), None);

        let mut s = ArgStream::new("1.5 2.5");
        assert_eq!(s.read_array3::<f32>(), None);
        assert!(s.failed());
    }

    #[test]
    fn vec3() {
        assert_eq!(parse_vec3("origin (1, 2.5, -3)"), Some([1., 2.5, -3.]));
        assert_eq!(parse_vec3("(1, 2)"), None);
        assert_eq!(parse_vec3("1, 2, 3"), None);
    }
}
