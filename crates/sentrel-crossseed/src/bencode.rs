//! A small bencode decoder/encoder (BEP 3), used to parse `.torrent`
//! metadata and Gazelle `action=download` payloads, and to re-encode the
//! `info` dictionary for infohash computation.
//!
//! [`BencodeValue::Dict`] is backed by a [`BTreeMap`], so encoding keys in
//! lexicographic order falls out of the map's own iteration order rather
//! than needing an explicit sort step.

use std::collections::BTreeMap;

use crate::error::BencodeError;

/// One decoded bencode value: `int | string | list | map<string, value>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BencodeValue {
    /// A signed integer.
    Int(i64),
    /// A byte string. Not every bencode string is valid UTF-8 (e.g. the
    /// `pieces` field is raw SHA-1 digests), so this holds raw bytes.
    Bytes(Vec<u8>),
    /// An ordered list of values.
    List(Vec<BencodeValue>),
    /// A dictionary. Keys are required to be UTF-8 byte strings, which
    /// holds for every key used in practice by `.torrent` metadata and the
    /// Gazelle API.
    Dict(BTreeMap<String, BencodeValue>),
}

impl BencodeValue {
    /// Convenience constructor for a UTF-8 string value.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Bytes(value.into().into_bytes())
    }

    /// Borrow this value's bytes if it is a [`BencodeValue::Bytes`].
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Int(_) | Self::List(_) | Self::Dict(_) => None,
        }
    }

    /// Borrow this value's UTF-8 string if it is a [`BencodeValue::Bytes`]
    /// containing valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    /// Borrow this value's integer if it is a [`BencodeValue::Int`].
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Bytes(_) | Self::List(_) | Self::Dict(_) => None,
        }
    }

    /// Borrow this value's dictionary if it is a [`BencodeValue::Dict`].
    #[must_use]
    pub const fn as_dict(&self) -> Option<&BTreeMap<String, BencodeValue>> {
        match self {
            Self::Dict(dict) => Some(dict),
            Self::Int(_) | Self::Bytes(_) | Self::List(_) => None,
        }
    }

    /// Borrow this value's list if it is a [`BencodeValue::List`].
    #[must_use]
    pub const fn as_list(&self) -> Option<&[BencodeValue]> {
        match self {
            Self::List(list) => Some(list),
            Self::Int(_) | Self::Bytes(_) | Self::Dict(_) => None,
        }
    }

    /// Encode this value to its canonical bencode byte representation.
    /// Dictionary keys are emitted in the map's natural (lexicographic)
    /// order, satisfying the BEP 3 requirement that encoders sort keys.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Int(value) => {
                out.push(b'i');
                out.extend_from_slice(value.to_string().as_bytes());
                out.push(b'e');
            }
            Self::Bytes(bytes) => {
                out.extend_from_slice(bytes.len().to_string().as_bytes());
                out.push(b':');
                out.extend_from_slice(bytes);
            }
            Self::List(items) => {
                out.push(b'l');
                for item in items {
                    item.encode_into(out);
                }
                out.push(b'e');
            }
            Self::Dict(entries) => {
                out.push(b'd');
                for (key, value) in entries {
                    Self::Bytes(key.clone().into_bytes()).encode_into(out);
                    value.encode_into(out);
                }
                out.push(b'e');
            }
        }
    }
}

/// Decode one bencode value from `bytes`, rejecting any trailing input
/// after the top-level value.
///
/// # Errors
///
/// Returns a [`BencodeError`] if `bytes` does not hold a single, complete,
/// well-formed bencode value.
pub fn decode(bytes: &[u8]) -> Result<BencodeValue, BencodeError> {
    let mut cursor = Cursor { bytes, pos: 0 };
    let value = cursor.decode_value()?;
    if cursor.pos != bytes.len() {
        return Err(BencodeError::TrailingData);
    }
    Ok(value)
}

/// Encode `value` to its canonical bencode byte representation.
#[must_use]
pub fn encode(value: &BencodeValue) -> Vec<u8> {
    value.encode()
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn decode_value(&mut self) -> Result<BencodeValue, BencodeError> {
        match self.peek().ok_or(BencodeError::UnexpectedEof)? {
            b'i' => self.decode_int(),
            b'l' => self.decode_list(),
            b'd' => self.decode_dict(),
            b'0'..=b'9' => self.decode_bytes().map(BencodeValue::Bytes),
            _ => Err(BencodeError::UnknownTag),
        }
    }

    fn decode_int(&mut self) -> Result<BencodeValue, BencodeError> {
        self.pos += 1; // consume 'i'
        let end = self.find(b'e')?;
        let token = std::str::from_utf8(&self.bytes[self.pos..end]).map_err(|_| BencodeError::InvalidInteger)?;
        if token.is_empty()
            || token == "-0"
            || (token.starts_with('0') && token.len() > 1)
            || (token.starts_with("-0") && token.len() > 2)
        {
            return Err(BencodeError::InvalidInteger);
        }
        let value = token.parse::<i64>().map_err(|_| BencodeError::InvalidInteger)?;
        self.pos = end + 1;
        Ok(BencodeValue::Int(value))
    }

    fn decode_bytes(&mut self) -> Result<Vec<u8>, BencodeError> {
        let colon = self.find(b':')?;
        let len_token = std::str::from_utf8(&self.bytes[self.pos..colon]).map_err(|_| BencodeError::InvalidLength)?;
        if len_token.is_empty() || (len_token.starts_with('0') && len_token.len() > 1) {
            return Err(BencodeError::InvalidLength);
        }
        let len: usize = len_token.parse().map_err(|_| BencodeError::InvalidLength)?;
        let start = colon + 1;
        let end = start.checked_add(len).ok_or(BencodeError::InvalidLength)?;
        if end > self.bytes.len() {
            return Err(BencodeError::InvalidLength);
        }
        self.pos = end;
        Ok(self.bytes[start..end].to_vec())
    }

    fn decode_list(&mut self) -> Result<BencodeValue, BencodeError> {
        self.pos += 1; // consume 'l'
        let mut items = Vec::new();
        loop {
            match self.peek().ok_or(BencodeError::UnexpectedEof)? {
                b'e' => {
                    self.pos += 1;
                    return Ok(BencodeValue::List(items));
                }
                _ => items.push(self.decode_value()?),
            }
        }
    }

    fn decode_dict(&mut self) -> Result<BencodeValue, BencodeError> {
        self.pos += 1; // consume 'd'
        let mut entries = BTreeMap::new();
        loop {
            match self.peek().ok_or(BencodeError::UnexpectedEof)? {
                b'e' => {
                    self.pos += 1;
                    return Ok(BencodeValue::Dict(entries));
                }
                _ => {
                    let key_bytes = self.decode_bytes()?;
                    let key = String::from_utf8(key_bytes).map_err(|_| BencodeError::InvalidKeyEncoding)?;
                    let value = self.decode_value()?;
                    entries.insert(key, value);
                }
            }
        }
    }

    fn find(&self, needle: u8) -> Result<usize, BencodeError> {
        self.bytes[self.pos..]
            .iter()
            .position(|&b| b == needle)
            .map(|offset| self.pos + offset)
            .ok_or(BencodeError::UnexpectedEof)
    }
}
