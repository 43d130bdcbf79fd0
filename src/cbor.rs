//! A minimal CBOR reader for the subset of RFC 8949 that Webauthn
//! structures actually use: integers, byte strings, text strings, arrays,
//! maps, tags and simple values, all with definite lengths.
//!
//! A general purpose CBOR library is deliberately not used here. The
//! attestation object and COSE_Key shapes are tiny, and a permissive
//! decoder is a security liability - indefinite lengths are rejected
//! outright, every item must be explicitly consumed, and the decoder never
//! allocates for string content (byte and text strings are returned as
//! sub-slices of the input).

use crate::error::{WebauthnError, WebauthnResult};

// Upper bound on the number of items consumed by a single skip. Webauthn
// structures are a handful of entries deep; anything approaching this is
// hostile input.
const SKIP_ITEM_LIMIT: usize = 1 << 16;

const MAJOR_UINT: u8 = 0;
const MAJOR_NINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

/// A positioned cursor over a CBOR byte slice.
pub(crate) struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Decoder { buf, pos: 0 }
    }

    fn malformed<T>(&self) -> WebauthnResult<T> {
        Err(WebauthnError::MalformedCbor(self.pos))
    }

    fn take(&mut self, len: usize) -> WebauthnResult<&'a [u8]> {
        if self.buf.len() - self.pos < len {
            return self.malformed();
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    // Read an item header, returning the major type and its argument.
    // Widths longer than necessary are tolerated (they decode to the same
    // value); indefinite lengths and the reserved additional-info values
    // are not.
    fn header(&mut self) -> WebauthnResult<(u8, u64)> {
        let initial = self.take(1)?[0];
        let major = initial >> 5;
        let additional = initial & 0x1f;
        let argument = match additional {
            0..=23 => u64::from(additional),
            24 => u64::from(self.take(1)?[0]),
            25 => {
                let b = self.take(2)?;
                u64::from(u16::from_be_bytes([b[0], b[1]]))
            }
            26 => {
                let b = self.take(4)?;
                u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            }
            27 => {
                let b = self.take(8)?;
                u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
            }
            // 28-30 are reserved, 31 is indefinite length.
            _ => return self.malformed(),
        };
        Ok((major, argument))
    }

    /// The major type of the next item, without consuming it.
    pub(crate) fn peek_major(&self) -> WebauthnResult<u8> {
        match self.buf.get(self.pos) {
            Some(initial) => Ok(initial >> 5),
            None => self.malformed(),
        }
    }

    /// Decode the next item as an unsigned integer.
    pub(crate) fn uint(&mut self) -> WebauthnResult<u64> {
        let start = self.pos;
        let (major, argument) = self.header()?;
        if major != MAJOR_UINT {
            return Err(WebauthnError::MalformedCbor(start));
        }
        Ok(argument)
    }

    /// Decode the next item as a signed integer. Accepts major type 0 and
    /// major type 1 (value = -1 - n). Values outside i64 are malformed.
    pub(crate) fn int(&mut self) -> WebauthnResult<i64> {
        let start = self.pos;
        let (major, argument) = self.header()?;
        let magnitude = i64::try_from(argument).map_err(|_| WebauthnError::MalformedCbor(start))?;
        match major {
            MAJOR_UINT => Ok(magnitude),
            MAJOR_NINT => Ok(-1 - magnitude),
            _ => Err(WebauthnError::MalformedCbor(start)),
        }
    }

    /// Decode the next item as a definite-length byte string.
    pub(crate) fn bytes(&mut self) -> WebauthnResult<&'a [u8]> {
        let start = self.pos;
        let (major, argument) = self.header()?;
        if major != MAJOR_BYTES {
            return Err(WebauthnError::MalformedCbor(start));
        }
        let len = usize::try_from(argument).map_err(|_| WebauthnError::MalformedCbor(start))?;
        self.take(len)
    }

    /// Decode the next item as a definite-length UTF-8 text string.
    pub(crate) fn text(&mut self) -> WebauthnResult<&'a str> {
        let start = self.pos;
        let (major, argument) = self.header()?;
        if major != MAJOR_TEXT {
            return Err(WebauthnError::MalformedCbor(start));
        }
        let len = usize::try_from(argument).map_err(|_| WebauthnError::MalformedCbor(start))?;
        let raw = self.take(len)?;
        std::str::from_utf8(raw).map_err(|_| WebauthnError::MalformedCbor(start))
    }

    /// Decode the next item as an array header, returning the entry count.
    pub(crate) fn array(&mut self) -> WebauthnResult<usize> {
        let start = self.pos;
        let (major, argument) = self.header()?;
        if major != MAJOR_ARRAY {
            return Err(WebauthnError::MalformedCbor(start));
        }
        usize::try_from(argument).map_err(|_| WebauthnError::MalformedCbor(start))
    }

    /// Decode the next item as a map of n entries, invoking `entry_fn`
    /// exactly n times with the decoder positioned at each key. The entry
    /// function must consume both the key and the value; its first error
    /// aborts the map.
    pub(crate) fn map<F>(&mut self, mut entry_fn: F) -> WebauthnResult<()>
    where
        F: FnMut(&mut Decoder<'a>) -> WebauthnResult<()>,
    {
        let start = self.pos;
        let (major, argument) = self.header()?;
        if major != MAJOR_MAP {
            return Err(WebauthnError::MalformedCbor(start));
        }
        let entries = usize::try_from(argument).map_err(|_| WebauthnError::MalformedCbor(start))?;
        for _ in 0..entries {
            entry_fn(self)?;
        }
        Ok(())
    }

    /// Capture the encoded span of the next complete item without
    /// interpreting it.
    pub(crate) fn raw(&mut self) -> WebauthnResult<&'a [u8]> {
        let start = self.pos;
        self.skip()?;
        Ok(&self.buf[start..self.pos])
    }

    /// Consume and discard one complete item, including nested content.
    pub(crate) fn skip(&mut self) -> WebauthnResult<()> {
        let mut pending: usize = 1;
        let mut consumed = 0;
        while pending > 0 {
            consumed += 1;
            if consumed > SKIP_ITEM_LIMIT {
                return self.malformed();
            }
            let start = self.pos;
            let (major, argument) = self.header()?;
            pending -= 1;
            match major {
                MAJOR_UINT | MAJOR_NINT | MAJOR_SIMPLE => {}
                MAJOR_BYTES | MAJOR_TEXT => {
                    let len =
                        usize::try_from(argument).map_err(|_| WebauthnError::MalformedCbor(start))?;
                    self.take(len)?;
                }
                MAJOR_ARRAY => {
                    let len =
                        usize::try_from(argument).map_err(|_| WebauthnError::MalformedCbor(start))?;
                    pending = pending
                        .checked_add(len)
                        .ok_or(WebauthnError::MalformedCbor(start))?;
                }
                MAJOR_MAP => {
                    let len = usize::try_from(argument)
                        .ok()
                        .and_then(|n| n.checked_mul(2))
                        .ok_or(WebauthnError::MalformedCbor(start))?;
                    pending = pending
                        .checked_add(len)
                        .ok_or(WebauthnError::MalformedCbor(start))?;
                }
                MAJOR_TAG => {
                    pending = pending
                        .checked_add(1)
                        .ok_or(WebauthnError::MalformedCbor(start))?;
                }
                _ => return Err(WebauthnError::MalformedCbor(start)),
            }
        }
        Ok(())
    }

    /// True once the whole input has been consumed.
    pub(crate) fn done(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// The unread tail of the input.
    pub(crate) fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

/// A canonical (shortest-form, definite-length) CBOR writer, just wide
/// enough to re-encode COSE_Key maps.
pub(crate) struct Writer {
    out: Vec<u8>,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Writer { out: Vec::new() }
    }

    fn head(&mut self, major: u8, argument: u64) {
        let major = major << 5;
        if argument < 24 {
            self.out.push(major | argument as u8);
        } else if argument <= u64::from(u8::MAX) {
            self.out.push(major | 24);
            self.out.push(argument as u8);
        } else if argument <= u64::from(u16::MAX) {
            self.out.push(major | 25);
            self.out.extend_from_slice(&(argument as u16).to_be_bytes());
        } else if argument <= u64::from(u32::MAX) {
            self.out.push(major | 26);
            self.out.extend_from_slice(&(argument as u32).to_be_bytes());
        } else {
            self.out.push(major | 27);
            self.out.extend_from_slice(&argument.to_be_bytes());
        }
    }

    pub(crate) fn int(&mut self, value: i64) {
        if value >= 0 {
            self.head(MAJOR_UINT, value as u64);
        } else {
            self.head(MAJOR_NINT, !(value as u64));
        }
    }

    pub(crate) fn bytes(&mut self, value: &[u8]) {
        self.head(MAJOR_BYTES, value.len() as u64);
        self.out.extend_from_slice(value);
    }

    pub(crate) fn map(&mut self, entries: u64) {
        self.head(MAJOR_MAP, entries);
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.out
    }
}
