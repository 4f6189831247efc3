//! # Payload Montage
//!
//! Frame payloads are a sequence of fields, each preceded by its length as a
//! little-endian `u16`. Concentrators sometimes send a tail that does not fit
//! this layout; it is kept verbatim as an unread entry so that composing the
//! montage again reproduces the original payload.

use crate::constants::MONTAGE_PREFIX_SIZE;
use crate::error::{GatewayError, Result};

/// Decomposed payload: length-prefixed fields plus any unparseable tail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Montage {
    fields: Vec<Vec<u8>>,
    unread: Vec<Vec<u8>>,
}

impl Montage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits `payload` into fields.
    ///
    /// Stops at the first prefix that is truncated, zero, or longer than the
    /// remaining bytes; that prefix and everything after it become one
    /// unread entry.
    pub fn decompose(payload: &[u8]) -> Self {
        let mut montage = Montage::new();
        let mut rest = payload;

        while !rest.is_empty() {
            if rest.len() < MONTAGE_PREFIX_SIZE {
                montage.unread.push(rest.to_vec());
                break;
            }
            let len = usize::from(u16::from_le_bytes([rest[0], rest[1]]));
            let body = &rest[MONTAGE_PREFIX_SIZE..];
            if len == 0 || body.len() < len {
                montage.unread.push(rest.to_vec());
                break;
            }
            montage.fields.push(body[..len].to_vec());
            rest = &body[len..];
        }

        montage
    }

    /// Serializes fields with their prefixes, then the unread entries as-is.
    pub fn compose(&self) -> Result<Vec<u8>> {
        let size = self
            .fields
            .iter()
            .map(|f| f.len() + MONTAGE_PREFIX_SIZE)
            .chain(self.unread.iter().map(Vec::len))
            .sum();
        let mut out = Vec::with_capacity(size);
        for field in &self.fields {
            let len = u16::try_from(field.len()).map_err(|_| GatewayError::InvalidDataLength)?;
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(field);
        }
        for entry in &self.unread {
            out.extend_from_slice(entry);
        }
        Ok(out)
    }

    pub fn push_field(&mut self, field: impl Into<Vec<u8>>) -> &mut Self {
        self.fields.push(field.into());
        self
    }

    pub fn push_fields<I, F>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Vec<u8>>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn push_unread(&mut self, entry: impl Into<Vec<u8>>) -> &mut Self {
        self.unread.push(entry.into());
        self
    }

    pub fn fields(&self) -> &[Vec<u8>] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&[u8]> {
        self.fields.get(index).map(Vec::as_slice)
    }

    pub fn unread(&self) -> &[Vec<u8>] {
        &self.unread
    }

    /// Number of decoded fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
