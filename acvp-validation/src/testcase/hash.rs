#![deny(unsafe_code)]
#![allow(missing_docs)]
#![warn(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Hash (SHA-1 / SHA-2) test cases.

use acvp_prelude::prelude::{AcvpError, Result};
use serde_json::{Value, json};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{AlgorithmModule, CaseContext};
use crate::codec::{BoundedBuffer, bin_to_hexstr, bin_to_hexstr_bounded};
use crate::document::{JsonObject, get_opt_u64, get_str};
use crate::mct::run_mct;
use crate::registry::{Cipher, TestCase, invoke_handler};

/// Largest message, in bits.
pub const HASH_MSG_BIT_MAX: usize = 65536;
/// Largest message, in bytes.
pub const HASH_MSG_BYTE_MAX: usize = HASH_MSG_BIT_MAX / 8;
/// Largest digest, in bytes.
pub const HASH_MD_BYTE_MAX: usize = 64;

/// Hash test types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashTestType {
    /// Algorithm functional test: one digest per case.
    Aft,
    /// Monte Carlo test: a chain of digests per case.
    Mct,
}

impl HashTestType {
    /// Parse the `testType` group field.
    ///
    /// # Errors
    /// `InvalidArgument` for anything but `AFT` or `MCT`.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "AFT" => Ok(HashTestType::Aft),
            "MCT" => Ok(HashTestType::Mct),
            other => Err(AcvpError::InvalidArgument(format!("testType {other}"))),
        }
    }
}

/// Hash test-case record.
///
/// The handler hashes [`HashTestCase::msg`] and stores the result with
/// [`HashTestCase::set_md`]. During a Monte Carlo test the message is
/// replaced before every round with the concatenation of the three rolling
/// slots, so handlers need no MCT awareness.
#[derive(Debug, Zeroize, ZeroizeOnDrop)]
pub struct HashTestCase {
    #[zeroize(skip)]
    cipher: Cipher,
    tc_id: u64,
    #[zeroize(skip)]
    test_type: HashTestType,
    msg: BoundedBuffer,
    md: BoundedBuffer,
}

impl HashTestCase {
    /// Build a record from the hex message.
    ///
    /// `len_bits`, when given, is the message length in bits and may be
    /// shorter than the hex string (`msg: "00"` with `len: 0` is the empty
    /// message).
    ///
    /// # Errors
    /// `InvalidArgument` if the message is not hex, exceeds
    /// [`HASH_MSG_BYTE_MAX`], or `len_bits` is longer than the message.
    pub fn new(
        cipher: Cipher,
        tc_id: u64,
        test_type: HashTestType,
        msg_hex: &str,
        len_bits: Option<u64>,
    ) -> Result<Self> {
        if cipher.digest_len().is_none() {
            return Err(AcvpError::InvalidArgument(format!("{cipher} is not a hash")));
        }
        let mut msg = BoundedBuffer::with_capacity(HASH_MSG_BYTE_MAX);
        msg.decode_hex(msg_hex)?;
        if let Some(bits) = len_bits {
            let bytes = usize::try_from(bits.div_ceil(8))
                .map_err(|_| AcvpError::InvalidArgument(format!("len {bits}")))?;
            if bytes > msg.len() {
                return Err(AcvpError::InvalidArgument(format!(
                    "len {bits} exceeds the {} byte message",
                    msg.len()
                )));
            }
            msg.truncate(bytes);
        }
        Ok(Self {
            cipher,
            tc_id,
            test_type,
            msg,
            md: BoundedBuffer::with_capacity(HASH_MD_BYTE_MAX),
        })
    }

    #[must_use]
    pub fn cipher(&self) -> Cipher {
        self.cipher
    }

    #[must_use]
    pub fn tc_id(&self) -> u64 {
        self.tc_id
    }

    #[must_use]
    pub fn test_type(&self) -> HashTestType {
        self.test_type
    }

    /// Message to hash.
    #[must_use]
    pub fn msg(&self) -> &[u8] {
        self.msg.as_slice()
    }

    /// Digest stored by the handler.
    #[must_use]
    pub fn md(&self) -> &[u8] {
        self.md.as_slice()
    }

    /// Store the digest.
    ///
    /// # Errors
    /// `InvalidArgument` if the digest is longer than [`HASH_MD_BYTE_MAX`].
    pub fn set_md(&mut self, md: &[u8]) -> Result<()> {
        Ok(self.md.set(md)?)
    }

    /// The stored digest, if it has the length of the cipher's output.
    fn checked_md(&self) -> Result<&[u8]> {
        let expected = self.cipher.digest_len().unwrap_or(HASH_MD_BYTE_MAX);
        if self.md.len() != expected {
            return Err(AcvpError::CryptoModuleFailure(format!(
                "{} tcId {} produced a {} byte digest, expected {expected}",
                self.cipher,
                self.tc_id,
                self.md.len()
            )));
        }
        Ok(self.md.as_slice())
    }

    fn take_md(&mut self) -> Result<Vec<u8>> {
        self.checked_md()?;
        let md = self.md.as_slice().to_vec();
        self.md.clear();
        Ok(md)
    }

    fn mct(&mut self, ctx: CaseContext<'_>) -> Result<Value> {
        let expected = self.cipher.digest_len().unwrap_or(HASH_MD_BYTE_MAX);
        if self.msg.len() != expected {
            return Err(AcvpError::InvalidArgument(format!(
                "MCT seed is {} bytes, {} needs {expected}",
                self.msg.len(),
                self.cipher
            )));
        }
        let seed = self.msg.as_slice().to_vec();
        let entries = run_mct(ctx.mct, &seed, |input| {
            self.msg.set(input)?;
            invoke_handler(ctx.handler, TestCase::Hash(&mut *self))?;
            self.take_md()
        })?;
        let results: Vec<Value> = entries
            .iter()
            .map(|e| json!({ "msg": bin_to_hexstr(&e.msg), "md": bin_to_hexstr(&e.md) }))
            .collect();
        Ok(Value::Array(results))
    }
}

/// Group parameters for hash vector sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashGroup {
    pub test_type: HashTestType,
}

/// The hash family module.
#[derive(Debug)]
pub struct HashModule;

impl AlgorithmModule for HashModule {
    type Group = HashGroup;
    type Record = HashTestCase;

    fn parse_group(_cipher: Cipher, group: &JsonObject) -> Result<HashGroup> {
        let test_type = HashTestType::parse(get_str(group, "testType")?)?;
        Ok(HashGroup { test_type })
    }

    fn init(cipher: Cipher, group: &HashGroup, tc_id: u64, test: &JsonObject) -> Result<HashTestCase> {
        let msg = get_str(test, "msg")?;
        if msg.len() > HASH_MSG_BYTE_MAX * 2 {
            return Err(AcvpError::InvalidArgument(format!(
                "msg of {} characters exceeds {}",
                msg.len(),
                HASH_MSG_BYTE_MAX * 2
            )));
        }
        let len_bits = get_opt_u64(test, "len")?;
        debug!(tc_id, test_type = ?group.test_type, msg_bytes = msg.len() / 2, "hash test case");
        HashTestCase::new(cipher, tc_id, group.test_type, msg, len_bits)
    }

    fn as_test_case(record: &mut HashTestCase) -> TestCase<'_> {
        TestCase::Hash(record)
    }

    fn output(record: &HashTestCase, response: &mut JsonObject) -> Result<()> {
        let md = record.checked_md()?;
        let md = bin_to_hexstr_bounded(md, HASH_MD_BYTE_MAX * 2)?;
        response.insert("md".to_string(), Value::String(md));
        Ok(())
    }

    fn process(
        record: &mut HashTestCase,
        group: &HashGroup,
        ctx: CaseContext<'_>,
        response: &mut JsonObject,
    ) -> Result<()> {
        match group.test_type {
            HashTestType::Aft => {
                invoke_handler(ctx.handler, TestCase::Hash(&mut *record))?;
                Self::output(record, response)
            }
            HashTestType::Mct => {
                let results = record.mct(ctx)?;
                response.insert("resultsArray".to_string(), results);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_len_truncates_message() {
        let tc = HashTestCase::new(Cipher::Sha256, 1, HashTestType::Aft, "00", Some(0)).unwrap();
        assert!(tc.msg().is_empty());

        let tc = HashTestCase::new(Cipher::Sha256, 1, HashTestType::Aft, "a1b2c3", Some(12)).unwrap();
        assert_eq!(tc.msg(), &[0xa1, 0xb2]);

        assert!(HashTestCase::new(Cipher::Sha256, 1, HashTestType::Aft, "a1", Some(16)).is_err());
    }

    #[test]
    fn test_message_bound() {
        let at_limit = "ab".repeat(HASH_MSG_BYTE_MAX);
        assert!(HashTestCase::new(Cipher::Sha1, 1, HashTestType::Aft, &at_limit, None).is_ok());

        let over = "ab".repeat(HASH_MSG_BYTE_MAX + 1);
        let err = HashTestCase::new(Cipher::Sha1, 1, HashTestType::Aft, &over, None).unwrap_err();
        assert!(matches!(err, AcvpError::InvalidArgument(_)));
    }

    #[test]
    fn test_digest_bound() {
        let mut tc = HashTestCase::new(Cipher::Sha512, 1, HashTestType::Aft, "", None).unwrap();
        assert!(tc.set_md(&[0u8; 64]).is_ok());
        assert!(matches!(tc.set_md(&[0u8; 65]), Err(AcvpError::InvalidArgument(_))));
    }

    #[test]
    fn test_cmac_cipher_rejected() {
        assert!(HashTestCase::new(Cipher::CmacAes, 1, HashTestType::Aft, "", None).is_err());
    }

    #[test]
    fn test_parse_group_test_type() {
        let group = json!({"tgId": 1, "testType": "MCT"});
        let parsed = HashModule::parse_group(Cipher::Sha1, group.as_object().unwrap()).unwrap();
        assert_eq!(parsed.test_type, HashTestType::Mct);

        let missing = json!({"tgId": 1});
        assert!(matches!(
            HashModule::parse_group(Cipher::Sha1, missing.as_object().unwrap()),
            Err(AcvpError::MissingArgument(_))
        ));

        let invalid = json!({"tgId": 1, "testType": "LDT"});
        assert!(matches!(
            HashModule::parse_group(Cipher::Sha1, invalid.as_object().unwrap()),
            Err(AcvpError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_output_requires_digest() {
        let mut tc = HashTestCase::new(Cipher::Sha1, 4, HashTestType::Aft, "61", None).unwrap();
        let mut rsp = JsonObject::new();
        assert!(matches!(
            HashModule::output(&tc, &mut rsp),
            Err(AcvpError::CryptoModuleFailure(_))
        ));

        tc.set_md(&[0u8; 19]).unwrap();
        assert!(matches!(
            HashModule::output(&tc, &mut rsp),
            Err(AcvpError::CryptoModuleFailure(_))
        ));
        assert!(rsp.is_empty());

        tc.set_md(&[0xabu8; 20]).unwrap();
        HashModule::output(&tc, &mut rsp).unwrap();
        assert_eq!(rsp["md"], "AB".repeat(20));
    }
}
