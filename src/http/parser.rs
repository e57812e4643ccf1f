//! HTTP/1.1 request head parser.
//!
//! Operates on raw byte buffers. The connection driver feeds it whatever has
//! been read so far; the parser either returns a complete head with the
//! number of bytes it consumed or asks for more data.
//!
//! ```text
//! <METHOD> <PATH> <VERSION>\r\n
//! <Name>: <Value>\r\n
//! ...
//! \r\n
//! ```

use super::request::Headers;
use std::str;
use tracing::debug;

/// Separator between a header name and its value.
const HEADER_SEPARATOR: &str = ": ";

/// Start line and headers of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Head {
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: Headers,
}

/// Protocol parsing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Start line is not valid UTF-8
    InvalidUtf8,
    /// Start line has fewer than three tokens
    InvalidStartLine(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidUtf8 => write!(f, "Invalid UTF-8 in start line"),
            ParseError::InvalidStartLine(line) => write!(f, "Invalid start line: {:?}", line),
        }
    }
}

impl std::error::Error for ParseError {}

/// Result of parsing a request head
#[derive(Debug)]
pub enum ParseResult {
    /// Complete head with bytes consumed, including the blank line
    Complete(Head, usize),
    /// Need more data
    Incomplete,
    /// Parse error
    Error(ParseError),
}

/// Parse a request head from the start of `input`.
///
/// The start line is validated as soon as it is complete, so a garbage first
/// line fails without waiting for the rest of the head.
pub fn parse_head(input: &[u8]) -> ParseResult {
    let start_end = match find_crlf(input) {
        Some(pos) => pos,
        None => return ParseResult::Incomplete,
    };

    let (method, path, version) = match parse_start_line(&input[..start_end]) {
        Ok(parts) => parts,
        Err(e) => return ParseResult::Error(e),
    };

    let mut headers = Headers::new();
    let mut pos = start_end + 2;

    loop {
        let rest = &input[pos..];
        let line_end = match find_crlf(rest) {
            Some(end) => end,
            None => return ParseResult::Incomplete,
        };
        pos += line_end + 2;

        // Blank line terminates the head
        if line_end == 0 {
            break;
        }

        match parse_header_line(&rest[..line_end]) {
            Some((name, value)) => headers.insert(name, value),
            None => debug!(
                line = %String::from_utf8_lossy(&rest[..line_end]),
                "Skipping malformed header line"
            ),
        }
    }

    ParseResult::Complete(
        Head {
            method,
            path,
            version,
            headers,
        },
        pos,
    )
}

/// Split a start line into method, path and protocol version.
///
/// Tokens are separated by single spaces; anything past the third token is
/// ignored.
fn parse_start_line(line: &[u8]) -> Result<(String, String, String), ParseError> {
    let line = str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8)?;

    let parts: Vec<&str> = line.split(' ').collect();
    if parts.len() < 3 {
        return Err(ParseError::InvalidStartLine(line.to_string()));
    }

    Ok((
        parts[0].to_string(),
        parts[1].to_string(),
        parts[2].to_string(),
    ))
}

/// Split a header line on the first `": "`.
///
/// Returns `None` for lines without the separator or with non-UTF-8 bytes.
fn parse_header_line(line: &[u8]) -> Option<(&str, &str)> {
    str::from_utf8(line).ok()?.split_once(HEADER_SEPARATOR)
}

/// Find \r\n in buffer, returning the position of \r.
fn find_crlf(buffer: &[u8]) -> Option<usize> {
    (0..buffer.len().saturating_sub(1)).find(|&i| buffer[i] == b'\r' && buffer[i + 1] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(input: &[u8]) -> (Head, usize) {
        match parse_head(input) {
            ParseResult::Complete(head, consumed) => (head, consumed),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_get() {
        let input = b"GET / HTTP/1.1\r\n\r\n";
        let (head, consumed) = complete(input);
        assert_eq!(head.method, "GET");
        assert_eq!(head.path, "/");
        assert_eq!(head.version, "HTTP/1.1");
        assert_eq!(head.headers.len(), 0);
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_parse_headers() {
        let input = b"GET /user-agent HTTP/1.1\r\nHost: localhost:4221\r\nUser-Agent: foobar/1.2.3\r\nAccept: */*\r\n\r\n";
        let (head, consumed) = complete(input);
        assert_eq!(head.path, "/user-agent");
        assert_eq!(head.headers.len(), 3);
        assert_eq!(head.headers.get("Host"), Some("localhost:4221"));
        assert_eq!(head.headers.get("User-Agent"), Some("foobar/1.2.3"));
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_header_value_keeps_later_separators() {
        let (head, _) = complete(b"GET / HTTP/1.1\r\nX-Note: a: b\r\n\r\n");
        assert_eq!(head.headers.get("X-Note"), Some("a: b"));
    }

    #[test]
    fn test_duplicate_header_last_wins() {
        let (head, _) = complete(b"GET / HTTP/1.1\r\nX-Id: 1\r\nX-Id: 2\r\n\r\n");
        assert_eq!(head.headers.get("X-Id"), Some("2"));
    }

    #[test]
    fn test_malformed_header_line_skipped() {
        let (head, _) = complete(b"GET / HTTP/1.1\r\nNoSeparator\r\nX-Ok: yes\r\nAlso:bad\r\n\r\n");
        assert_eq!(head.headers.len(), 1);
        assert_eq!(head.headers.get("X-Ok"), Some("yes"));
    }

    #[test]
    fn test_consumed_stops_at_blank_line() {
        let input = b"POST /files/a HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let (head, consumed) = complete(input);
        assert_eq!(head.method, "POST");
        assert_eq!(head.headers.content_length(), Some(5));
        assert_eq!(&input[consumed..], b"hello");
    }

    #[test]
    fn test_incomplete() {
        let inputs: [&[u8]; 7] = [
            b"",
            b"GET / HTTP/1.1",
            b"GET / HTTP/1.1\r\n",
            b"GET / HTTP/1.1\r\nHost: x\r\n",
            b"GET / HTTP/1.1\r\nHost: x\r\n\r",
            // Bare \n never terminates a line
            b"GET / HTTP/1.1\n\n",
            b"GET / HTTP/1.1\r\nHost: x\n\n",
        ];
        for input in inputs {
            match parse_head(input) {
                ParseResult::Incomplete => {}
                other => panic!("unexpected for {:?}: {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_short_start_line() {
        match parse_head(b"GET /\r\n\r\n") {
            ParseResult::Error(ParseError::InvalidStartLine(line)) => assert_eq!(line, "GET /"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_bad_start_line_fails_before_headers_complete() {
        match parse_head(b"GARBAGE\r\nHost: x") {
            ParseResult::Error(ParseError::InvalidStartLine(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_non_utf8_start_line() {
        match parse_head(b"GET /\xff HTTP/1.1\r\n\r\n") {
            ParseResult::Error(ParseError::InvalidUtf8) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_extra_start_line_tokens_ignored() {
        let (head, _) = complete(b"GET /echo/a HTTP/1.1 extra\r\n\r\n");
        assert_eq!(head.path, "/echo/a");
        assert_eq!(head.version, "HTTP/1.1");
    }
}
