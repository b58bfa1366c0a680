//! Frame extraction from the server's never-closing XML stream.
//!
//! The server opens the stream with `<protocol>` and only closes it when
//! the connection ends, so the stream as a whole is never a complete XML
//! document. What the client can act on are the top-level children of
//! that virtual root: one `<room>…</room>`, one `<joined …/>`, and so on.
//! Each of those is a *frame*.
//!
//! [`FrameExtractor`] buffers raw bytes and tracks element depth with a
//! tiny tag scanner. Whenever depth returns to zero a frame is complete,
//! whatever its tag name is. It never blocks and never parses attribute
//! values; it only needs to know where a tag starts and ends.
//!
//! ```text
//! <protocol>  <joined roomId="r"/>  <room roomId="r"><data class="moveRequest"/></room>  <room ...
//! ^^^^^^^^^^  ^^^^^^^^^^^^^^^^^^^^  ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^  ^^^^^^^^^^
//!  root,         frame 1                         frame 2                                  partial,
//!  dropped                                                                                kept
//! ```

/// What kind of markup a scanned tag is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    /// `<name ...>` or `<name .../>`.
    Open { self_closing: bool, is_root: bool },
    /// `</name>`.
    Close,
    /// Comments, processing instructions, CDATA, doctype.
    Other,
}

/// One scanned piece of markup, as absolute offsets into the buffer.
#[derive(Debug, Clone, Copy)]
struct Token {
    start: usize,
    end: usize,
    kind: Kind,
}

#[derive(Debug)]
enum Scan {
    Token(Token),
    /// A `<` was found at this offset but its markup is not complete yet.
    Incomplete(usize),
    /// No `<` after the cursor.
    Exhausted,
}

/// Name of the stream's root element. It is never a frame.
const ROOT: &[u8] = b"protocol";

/// Buffers bytes and yields complete top-level elements.
#[derive(Debug, Default)]
pub struct FrameExtractor {
    buffer: Vec<u8>,
}

impl FrameExtractor {
    /// Creates an empty extractor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends freshly received bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Removes and returns the next complete frame, if there is one.
    ///
    /// Noise between frames (whitespace, the `<protocol>` root, the
    /// closing `</protocol>`, comments, declarations) is discarded. Bytes
    /// of a frame that is not complete yet stay in the buffer untouched.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let mut cursor = 0;

        // Skip to the start of the next top-level element.
        let frame_start = loop {
            match scan(&self.buffer, cursor) {
                Scan::Exhausted => {
                    self.discard(self.buffer.len());
                    return None;
                }
                Scan::Incomplete(start) => {
                    self.discard(start);
                    return None;
                }
                Scan::Token(token) => match token.kind {
                    Kind::Open {
                        self_closing: true,
                        is_root: false,
                    } => return Some(self.take(token.start, token.end)),
                    Kind::Open { is_root: false, .. } => {
                        cursor = token.end;
                        break token.start;
                    }
                    // The root opener, its closer, and anything that is
                    // not an element.
                    _ => cursor = token.end,
                },
            }
        };

        // Walk until the element that opened at `frame_start` closes.
        let mut depth = 1usize;
        loop {
            match scan(&self.buffer, cursor) {
                Scan::Exhausted | Scan::Incomplete(_) => {
                    self.discard(frame_start);
                    return None;
                }
                Scan::Token(token) => {
                    match token.kind {
                        Kind::Open {
                            self_closing: false,
                            ..
                        } => depth += 1,
                        Kind::Close => depth -= 1,
                        _ => {}
                    }
                    cursor = token.end;
                    if depth == 0 {
                        return Some(self.take(frame_start, cursor));
                    }
                }
            }
        }
    }

    /// Returns the bytes currently buffered.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns `true` if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drops everything buffered. Used when a connection is replaced.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Removes `start..end` as a frame, dropping the noise before it.
    fn take(&mut self, start: usize, end: usize) -> Vec<u8> {
        let frame = self.buffer[start..end].to_vec();
        self.buffer.drain(..end);
        frame
    }

    fn discard(&mut self, upto: usize) {
        if upto > 0 {
            tracing::trace!(bytes = upto, "discarding inter-frame bytes");
            self.buffer.drain(..upto);
        }
    }
}

/// Finds the next piece of markup at or after `from`.
fn scan(buf: &[u8], from: usize) -> Scan {
    let Some(offset) = buf[from..].iter().position(|&b| b == b'<') else {
        return Scan::Exhausted;
    };
    let start = from + offset;
    let rest = &buf[start..];

    const MARKERS: [&[u8]; 3] = [b"<!--", b"<![CDATA[", b"<?"];
    if MARKERS
        .iter()
        .any(|m| rest.len() < m.len() && m.starts_with(rest))
    {
        return Scan::Incomplete(start);
    }

    let scanned = if rest.starts_with(b"<!--") {
        find_after(rest, b"-->").map(|len| (len, Kind::Other))
    } else if rest.starts_with(b"<![CDATA[") {
        find_after(rest, b"]]>").map(|len| (len, Kind::Other))
    } else if rest.starts_with(b"<?") {
        find_after(rest, b"?>").map(|len| (len, Kind::Other))
    } else if rest.starts_with(b"<!") {
        find_after(rest, b">").map(|len| (len, Kind::Other))
    } else if rest.starts_with(b"</") {
        find_after(rest, b">").map(|len| (len, Kind::Close))
    } else {
        open_tag_len(rest).map(|len| {
            let self_closing = rest[len - 2] == b'/';
            let name_len = rest[1..]
                .iter()
                .position(|&b| b.is_ascii_whitespace() || b == b'/' || b == b'>')
                .unwrap_or(rest.len() - 1);
            let is_root = &rest[1..1 + name_len] == ROOT;
            (len, Kind::Open { self_closing, is_root })
        })
    };

    match scanned {
        Some((len, kind)) => Scan::Token(Token {
            start,
            end: start + len,
            kind,
        }),
        None => Scan::Incomplete(start),
    }
}

/// Length of `rest` up to and including the first occurrence of `pat`.
fn find_after(rest: &[u8], pat: &[u8]) -> Option<usize> {
    rest.windows(pat.len())
        .position(|w| w == pat)
        .map(|i| i + pat.len())
}

/// Length of the start tag at the front of `rest`, honouring quoted
/// attribute values (which may contain `>`).
fn open_tag_len(rest: &[u8]) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in rest.iter().enumerate().skip(1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i + 1),
            None => {}
        }
    }
    None
}
