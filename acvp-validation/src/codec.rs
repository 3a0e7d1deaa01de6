#![deny(unsafe_code)]
#![allow(missing_docs)]
#![warn(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Hex/binary conversion with capacity bounds.
//!
//! Every buffer that receives server-supplied data has a fixed maximum.
//! Decoding rejects input that would exceed it instead of growing.

use std::fmt;

use acvp_prelude::prelude::AcvpError;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Codec failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Hex input must contain an even number of characters.
    #[error("Hex string has odd length {0}")]
    OddLength(usize),
    /// Decoded data would not fit the destination.
    #[error("Decoded length {0} exceeds capacity {1}")]
    Overflow(usize, usize),
    /// A character outside `[0-9a-fA-F]`.
    #[error("Invalid hex character {0:?} at index {1}")]
    InvalidCharacter(char, usize),
    /// The destination could not be allocated.
    #[error("Allocation of {0} bytes failed")]
    Allocation(usize),
}

impl From<CodecError> for AcvpError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Allocation(_) => AcvpError::AllocationFailure(err.to_string()),
            CodecError::OddLength(_)
            | CodecError::Overflow(_, _)
            | CodecError::InvalidCharacter(_, _) => AcvpError::InvalidArgument(err.to_string()),
        }
    }
}

/// Decode a hex string into at most `max` bytes.
///
/// # Errors
/// Returns an error if `src` has odd length, contains a non-hex character,
/// or decodes to more than `max` bytes.
pub fn hexstr_to_bin(src: &str, max: usize) -> Result<Vec<u8>, CodecError> {
    if src.len() % 2 != 0 {
        return Err(CodecError::OddLength(src.len()));
    }
    let needed = src.len() / 2;
    if needed > max {
        return Err(CodecError::Overflow(needed, max));
    }
    hex::decode(src).map_err(|e| match e {
        hex::FromHexError::InvalidHexCharacter { c, index } => {
            CodecError::InvalidCharacter(c, index)
        }
        hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
            CodecError::OddLength(src.len())
        }
    })
}

/// Encode bytes as an uppercase hex string.
#[must_use]
pub fn bin_to_hexstr(src: &[u8]) -> String {
    hex::encode_upper(src)
}

/// Encode bytes as uppercase hex, refusing output longer than `max_chars`.
///
/// # Errors
/// Returns [`CodecError::Overflow`] if the encoding needs more than `max_chars`.
pub fn bin_to_hexstr_bounded(src: &[u8], max_chars: usize) -> Result<String, CodecError> {
    let needed = src.len().saturating_mul(2);
    if needed > max_chars {
        return Err(CodecError::Overflow(needed, max_chars));
    }
    Ok(bin_to_hexstr(src))
}

/// Byte buffer with a fixed maximum length, wiped on drop.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct BoundedBuffer {
    data: Vec<u8>,
    max: usize,
}

impl BoundedBuffer {
    /// Create an empty buffer that will never hold more than `max` bytes.
    #[must_use]
    pub fn with_capacity(max: usize) -> Self {
        Self { data: Vec::new(), max }
    }

    /// Replace the contents with the decoding of `src`.
    ///
    /// On failure the buffer is left empty.
    ///
    /// # Errors
    /// Same conditions as [`hexstr_to_bin`], plus allocation failure.
    pub fn decode_hex(&mut self, src: &str) -> Result<(), CodecError> {
        self.clear();
        let decoded = hexstr_to_bin(src, self.max)?;
        self.set(&decoded)
    }

    /// Replace the contents with `bytes`.
    ///
    /// # Errors
    /// Returns [`CodecError::Overflow`] if `bytes` is longer than the maximum.
    pub fn set(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        if bytes.len() > self.max {
            return Err(CodecError::Overflow(bytes.len(), self.max));
        }
        self.clear();
        self.data
            .try_reserve_exact(bytes.len())
            .map_err(|_| CodecError::Allocation(bytes.len()))?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Shorten the contents to `len` bytes. Longer lengths are ignored.
    pub fn truncate(&mut self, len: usize) {
        if len < self.data.len() {
            self.data[len..].zeroize();
            self.data.truncate(len);
        }
    }

    /// Wipe and empty the buffer. The maximum is kept.
    pub fn clear(&mut self) {
        self.data.zeroize();
    }

    /// Current contents.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Current length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for BoundedBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for BoundedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedBuffer").field("len", &self.data.len()).field("max", &self.max).finish()
    }
}
