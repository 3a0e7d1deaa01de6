#![deny(unsafe_code)]
#![allow(missing_docs)]
#![warn(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! CMAC (AES and TDES) test cases.
//!
//! Group lengths (`msgLen`, `macLen`, `keyLen`) are in bits on the wire and
//! are converted to bytes by truncating division.

use acvp_prelude::prelude::{AcvpError, DISPOSITION_FAILED, DISPOSITION_PASSED, Result};
use serde_json::Value;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::AlgorithmModule;
use crate::codec::{BoundedBuffer, bin_to_hexstr_bounded};
use crate::document::{JsonObject, get_opt_str, get_opt_u64, get_str, get_u64};
use crate::registry::{CapabilityParams, Cipher, CmacKeyParams, Domain, TestCase};

/// Largest message, in bytes (524288 bits).
pub const CMAC_MSG_BYTE_MAX: usize = 65536;
/// Largest single key, in bytes.
pub const CMAC_KEY_BYTE_MAX: usize = 32;
/// Largest MAC, in bytes.
pub const CMAC_MAC_BYTE_MAX: usize = 64;

/// Generate or verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmacDirection {
    Generate,
    Verify,
}

impl CmacDirection {
    /// Parse the `direction` group field.
    ///
    /// # Errors
    /// `InvalidArgument` for anything but `gen` or `ver`.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "gen" => Ok(CmacDirection::Generate),
            "ver" => Ok(CmacDirection::Verify),
            other => Err(AcvpError::InvalidArgument(format!("direction {other}"))),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CmacDirection::Generate => "gen",
            CmacDirection::Verify => "ver",
        }
    }
}

impl serde::Serialize for CmacDirection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Inputs for building a [`CmacTestCase`].
///
/// Absent hex fields are `None`; the constructor decides which are required.
#[derive(Debug, Clone, Default)]
pub struct CmacInputs<'a> {
    pub msg: Option<&'a str>,
    /// Message length in bytes.
    pub msg_len: usize,
    /// MAC length in bytes.
    pub mac_len: usize,
    /// AES key length in bits.
    pub key_len: Option<u32>,
    /// TDES keying option.
    pub keying_option: Option<u8>,
    /// AES key, or TDES key 1.
    pub key: Option<&'a str>,
    pub key2: Option<&'a str>,
    pub key3: Option<&'a str>,
    /// Expected MAC, required when verifying.
    pub mac: Option<&'a str>,
}

/// CMAC test-case record.
///
/// Generate: the handler computes the MAC of [`CmacTestCase::msg`] and stores
/// it with [`CmacTestCase::set_mac`]; output is truncated to `mac_len`.
/// Verify: the handler compares against [`CmacTestCase::mac`] and reports
/// with [`CmacTestCase::set_verified`].
#[derive(Debug, Zeroize, ZeroizeOnDrop)]
pub struct CmacTestCase {
    #[zeroize(skip)]
    cipher: Cipher,
    tc_id: u64,
    #[zeroize(skip)]
    direction: CmacDirection,
    msg: BoundedBuffer,
    msg_len: usize,
    key: BoundedBuffer,
    key2: BoundedBuffer,
    key3: BoundedBuffer,
    key_len: Option<u32>,
    keying_option: Option<u8>,
    mac: BoundedBuffer,
    mac_len: usize,
    verified: Option<bool>,
}

impl CmacTestCase {
    /// Build a record, decoding every hex field into its bounded buffer.
    ///
    /// # Errors
    /// `InvalidArgument` if a required field is absent (key, TDES keys 2 and
    /// 3, the MAC when verifying), a field is not hex, or a field exceeds its
    /// buffer.
    pub fn new(cipher: Cipher, tc_id: u64, direction: CmacDirection, inputs: &CmacInputs<'_>) -> Result<Self> {
        if !matches!(cipher, Cipher::CmacAes | Cipher::CmacTdes) {
            return Err(AcvpError::InvalidArgument(format!("{cipher} is not a CMAC")));
        }
        let key1 = inputs
            .key
            .ok_or_else(|| AcvpError::InvalidArgument(format!("{cipher} tcId {tc_id} has no key")))?;
        if cipher == Cipher::CmacTdes && (inputs.key2.is_none() || inputs.key3.is_none()) {
            return Err(AcvpError::InvalidArgument(format!(
                "{cipher} tcId {tc_id} needs key1, key2 and key3"
            )));
        }
        if direction == CmacDirection::Verify && (inputs.mac.is_none() || inputs.mac_len == 0) {
            return Err(AcvpError::InvalidArgument(format!(
                "{cipher} tcId {tc_id} verify needs mac and macLen"
            )));
        }
        if inputs.mac_len > CMAC_MAC_BYTE_MAX {
            return Err(AcvpError::InvalidArgument(format!("macLen {} bytes", inputs.mac_len)));
        }

        let mut tc = Self {
            cipher,
            tc_id,
            direction,
            msg: BoundedBuffer::with_capacity(CMAC_MSG_BYTE_MAX),
            msg_len: inputs.msg_len,
            key: BoundedBuffer::with_capacity(CMAC_KEY_BYTE_MAX),
            key2: BoundedBuffer::with_capacity(CMAC_KEY_BYTE_MAX),
            key3: BoundedBuffer::with_capacity(CMAC_KEY_BYTE_MAX),
            key_len: inputs.key_len,
            keying_option: inputs.keying_option,
            mac: BoundedBuffer::with_capacity(CMAC_MAC_BYTE_MAX),
            mac_len: inputs.mac_len,
            verified: None,
        };
        if let Some(msg) = inputs.msg {
            tc.msg.decode_hex(msg)?;
        }
        tc.key.decode_hex(key1)?;
        if cipher == Cipher::CmacTdes {
            tc.key2.decode_hex(inputs.key2.unwrap_or_default())?;
            tc.key3.decode_hex(inputs.key3.unwrap_or_default())?;
        }
        if direction == CmacDirection::Verify {
            tc.mac.decode_hex(inputs.mac.unwrap_or_default())?;
        }
        Ok(tc)
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
    pub fn direction(&self) -> CmacDirection {
        self.direction
    }

    #[must_use]
    pub fn msg(&self) -> &[u8] {
        self.msg.as_slice()
    }

    /// Message length in bytes from the group.
    #[must_use]
    pub fn msg_len(&self) -> usize {
        self.msg_len
    }

    /// AES key, or TDES key 1.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        self.key.as_slice()
    }

    /// TDES key 2 (empty for AES).
    #[must_use]
    pub fn key2(&self) -> &[u8] {
        self.key2.as_slice()
    }

    /// TDES key 3 (empty for AES).
    #[must_use]
    pub fn key3(&self) -> &[u8] {
        self.key3.as_slice()
    }

    #[must_use]
    pub fn key_len(&self) -> Option<u32> {
        self.key_len
    }

    #[must_use]
    pub fn keying_option(&self) -> Option<u8> {
        self.keying_option
    }

    /// Expected MAC when verifying, or the MAC the handler generated.
    #[must_use]
    pub fn mac(&self) -> &[u8] {
        self.mac.as_slice()
    }

    /// MAC length in bytes from the group.
    #[must_use]
    pub fn mac_len(&self) -> usize {
        self.mac_len
    }

    /// Store a generated MAC.
    ///
    /// # Errors
    /// `InvalidArgument` when verifying or if the MAC exceeds its buffer.
    pub fn set_mac(&mut self, mac: &[u8]) -> Result<()> {
        if self.direction == CmacDirection::Verify {
            return Err(AcvpError::InvalidArgument("set_mac on a verify case".to_string()));
        }
        Ok(self.mac.set(mac)?)
    }

    /// Record the verify disposition.
    pub fn set_verified(&mut self, passed: bool) {
        self.verified = Some(passed);
    }

    #[must_use]
    pub fn verified(&self) -> Option<bool> {
        self.verified
    }
}

/// Group parameters for CMAC vector sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmacGroup {
    pub direction: CmacDirection,
    /// Message length in bytes.
    pub msg_len: usize,
    /// MAC length in bytes.
    pub mac_len: usize,
    /// `msgLen` and `macLen` as sent, in bits.
    pub msg_bits: u32,
    pub mac_bits: u32,
    pub key_len: Option<u32>,
    pub keying_option: Option<u8>,
}

/// The CMAC family module.
#[derive(Debug)]
pub struct CmacModule;

fn bit_length(group: &JsonObject, field: &str) -> Result<(u32, usize)> {
    let bits = get_opt_u64(group, field)?.unwrap_or(0);
    let invalid = || AcvpError::InvalidArgument(format!("{field} {bits}"));
    let bits = u32::try_from(bits).map_err(|_| invalid())?;
    let bytes = usize::try_from(bits / 8).map_err(|_| invalid())?;
    Ok((bits, bytes))
}

fn check_domain(field: &str, bits: u32, domain: &Domain) -> Result<()> {
    if domain.contains(bits) {
        Ok(())
    } else {
        Err(AcvpError::InvalidArgument(format!(
            "{field} {bits} is outside the registered {}..={} step {}",
            domain.min, domain.max, domain.increment
        )))
    }
}

impl AlgorithmModule for CmacModule {
    type Group = CmacGroup;
    type Record = CmacTestCase;

    fn parse_group(cipher: Cipher, group: &JsonObject) -> Result<CmacGroup> {
        let mut key_len = None;
        let mut keying_option = None;
        match cipher {
            Cipher::CmacAes => {
                let bits = get_u64(group, "keyLen")?;
                key_len = Some(
                    u32::try_from(bits)
                        .map_err(|_| AcvpError::InvalidArgument(format!("keyLen {bits}")))?,
                );
            }
            Cipher::CmacTdes => {
                let option = get_opt_u64(group, "keyingOption")?.unwrap_or(0);
                if !(1..=2).contains(&option) {
                    return Err(AcvpError::InvalidArgument(format!("keyingOption {option}")));
                }
                keying_option = u8::try_from(option).ok();
            }
            other => {
                return Err(AcvpError::InvalidArgument(format!("{other} is not a CMAC")));
            }
        }

        let direction = CmacDirection::parse(get_str(group, "direction")?)?;
        let (msg_bits, msg_len) = bit_length(group, "msgLen")?;
        let (mac_bits, mac_len) = bit_length(group, "macLen")?;
        if mac_len == 0 {
            return Err(AcvpError::MissingArgument("macLen".to_string()));
        }
        Ok(CmacGroup { direction, msg_len, mac_len, msg_bits, mac_bits, key_len, keying_option })
    }

    fn check_capability(params: &CapabilityParams, group: &CmacGroup) -> Result<()> {
        let CapabilityParams::Cmac(cap) = params else {
            return Err(AcvpError::InvalidArgument("CMAC group on a non-CMAC capability".to_string()));
        };
        if !cap.directions.contains(&group.direction) {
            return Err(AcvpError::InvalidArgument(format!(
                "direction {} was not registered",
                group.direction.as_str()
            )));
        }
        check_domain("msgLen", group.msg_bits, &cap.msg_len)?;
        check_domain("macLen", group.mac_bits, &cap.mac_len)?;
        match &cap.key {
            CmacKeyParams::KeyLen(lens) => match group.key_len {
                Some(len) if lens.contains(&len) => Ok(()),
                other => Err(AcvpError::InvalidArgument(format!("keyLen {other:?} was not registered"))),
            },
            CmacKeyParams::KeyingOption(opts) => match group.keying_option {
                Some(opt) if opts.contains(&opt) => Ok(()),
                other => {
                    Err(AcvpError::InvalidArgument(format!("keyingOption {other:?} was not registered")))
                }
            },
        }
    }

    fn init(cipher: Cipher, group: &CmacGroup, tc_id: u64, test: &JsonObject) -> Result<CmacTestCase> {
        let msg = get_opt_str(test, "msg")?;
        match msg {
            Some(m) if !m.is_empty() && group.msg_len == 0 => {
                return Err(AcvpError::MissingArgument("msgLen".to_string()));
            }
            None if group.msg_len != 0 => {
                return Err(AcvpError::MissingArgument("msg".to_string()));
            }
            _ => {}
        }

        let (key, key2, key3) = match cipher {
            Cipher::CmacTdes => {
                (Some(get_str(test, "key1")?), Some(get_str(test, "key2")?), Some(get_str(test, "key3")?))
            }
            _ => (Some(get_str(test, "key")?), None, None),
        };
        let mac = match group.direction {
            CmacDirection::Verify => Some(get_str(test, "mac")?),
            CmacDirection::Generate => None,
        };
        debug!(tc_id, direction = group.direction.as_str(), msg_len = group.msg_len, "cmac test case");

        let inputs = CmacInputs {
            msg,
            msg_len: group.msg_len,
            mac_len: group.mac_len,
            key_len: group.key_len,
            keying_option: group.keying_option,
            key,
            key2,
            key3,
            mac,
        };
        CmacTestCase::new(cipher, tc_id, group.direction, &inputs)
    }

    fn as_test_case(record: &mut CmacTestCase) -> TestCase<'_> {
        TestCase::Cmac(record)
    }

    fn output(record: &CmacTestCase, response: &mut JsonObject) -> Result<()> {
        match record.direction {
            CmacDirection::Verify => {
                let passed = record.verified.ok_or_else(|| {
                    AcvpError::CryptoModuleFailure(format!(
                        "{} tcId {} reported no verify disposition",
                        record.cipher, record.tc_id
                    ))
                })?;
                let disposition = if passed { DISPOSITION_PASSED } else { DISPOSITION_FAILED };
                response.insert("result".to_string(), Value::String(disposition.to_string()));
            }
            CmacDirection::Generate => {
                let mac = record.mac.as_slice();
                if mac.len() < record.mac_len {
                    return Err(AcvpError::CryptoModuleFailure(format!(
                        "{} tcId {} produced {} MAC bytes, group needs {}",
                        record.cipher,
                        record.tc_id,
                        mac.len(),
                        record.mac_len
                    )));
                }
                let truncated = mac.get(..record.mac_len).unwrap_or(mac);
                let mac = bin_to_hexstr_bounded(truncated, CMAC_MAC_BYTE_MAX * 2)?;
                response.insert("mac".to_string(), Value::String(mac));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: &Value) -> &JsonObject {
        v.as_object().unwrap()
    }

    fn tdes_inputs<'a>() -> CmacInputs<'a> {
        CmacInputs {
            msg: Some("00112233"),
            msg_len: 4,
            mac_len: 8,
            keying_option: Some(1),
            key: Some("0123456789ABCDEF"),
            key2: Some("23456789ABCDEF01"),
            key3: Some("456789ABCDEF0123"),
            ..CmacInputs::default()
        }
    }

    #[test]
    fn test_tdes_constructor_requires_all_keys() {
        let ok = CmacTestCase::new(Cipher::CmacTdes, 1, CmacDirection::Generate, &tdes_inputs());
        assert_eq!(ok.unwrap().key2(), &hex::decode("23456789ABCDEF01").unwrap()[..]);

        let mut missing = tdes_inputs();
        missing.key3 = None;
        let err = CmacTestCase::new(Cipher::CmacTdes, 1, CmacDirection::Generate, &missing).unwrap_err();
        assert!(matches!(err, AcvpError::InvalidArgument(_)));
    }

    #[test]
    fn test_verify_constructor_requires_mac() {
        let err = CmacTestCase::new(Cipher::CmacTdes, 1, CmacDirection::Verify, &tdes_inputs()).unwrap_err();
        assert!(matches!(err, AcvpError::InvalidArgument(_)));

        let mut with_mac = tdes_inputs();
        with_mac.mac = Some("AABBCCDDEEFF0011");
        let tc = CmacTestCase::new(Cipher::CmacTdes, 1, CmacDirection::Verify, &with_mac).unwrap();
        assert_eq!(tc.mac().len(), 8);
    }

    #[test]
    fn test_generate_ignores_supplied_mac() {
        let mut inputs = tdes_inputs();
        inputs.mac = Some("not hex at all");
        let tc = CmacTestCase::new(Cipher::CmacTdes, 1, CmacDirection::Generate, &inputs).unwrap();
        assert!(tc.mac().is_empty());
    }

    #[test]
    fn test_oversized_key_rejected() {
        let key = "00".repeat(CMAC_KEY_BYTE_MAX + 1);
        let inputs = CmacInputs {
            msg: Some(""),
            mac_len: 16,
            key_len: Some(256),
            key: Some(&key),
            ..CmacInputs::default()
        };
        let err = CmacTestCase::new(Cipher::CmacAes, 1, CmacDirection::Generate, &inputs).unwrap_err();
        assert!(matches!(err, AcvpError::InvalidArgument(_)));
    }

    #[test]
    fn test_parse_group_fields() {
        let aes = json!({"tgId": 1, "direction": "gen", "keyLen": 128, "msgLen": 260, "macLen": 128});
        let group = CmacModule::parse_group(Cipher::CmacAes, obj(&aes)).unwrap();
        assert_eq!(group.msg_len, 32);
        assert_eq!(group.mac_len, 16);
        assert_eq!(group.key_len, Some(128));

        let no_key_len = json!({"tgId": 1, "direction": "gen", "macLen": 128});
        assert!(matches!(
            CmacModule::parse_group(Cipher::CmacAes, obj(&no_key_len)),
            Err(AcvpError::MissingArgument(_))
        ));

        let bad_option = json!({"tgId": 1, "direction": "gen", "keyingOption": 3, "macLen": 64});
        assert!(matches!(
            CmacModule::parse_group(Cipher::CmacTdes, obj(&bad_option)),
            Err(AcvpError::InvalidArgument(_))
        ));

        let bad_direction = json!({"tgId": 1, "direction": "sign", "keyLen": 128, "macLen": 128});
        assert!(matches!(
            CmacModule::parse_group(Cipher::CmacAes, obj(&bad_direction)),
            Err(AcvpError::InvalidArgument(_))
        ));

        let no_mac_len = json!({"tgId": 1, "direction": "gen", "keyLen": 128});
        assert!(matches!(
            CmacModule::parse_group(Cipher::CmacAes, obj(&no_mac_len)),
            Err(AcvpError::MissingArgument(m)) if m == "macLen"
        ));
    }

    #[test]
    fn test_group_must_fit_registered_capability() {
        let params = CapabilityParams::Cmac(crate::registry::CmacCapability {
            directions: vec![CmacDirection::Generate],
            msg_len: Domain::new(0, 1024, 8),
            mac_len: Domain::new(32, 128, 8),
            key: CmacKeyParams::KeyLen(vec![128]),
        });
        let group = |extra: Value| {
            let mut g = json!({"direction": "gen", "keyLen": 128, "msgLen": 256, "macLen": 64});
            for (k, v) in extra.as_object().unwrap() {
                g[k] = v.clone();
            }
            CmacModule::parse_group(Cipher::CmacAes, obj(&g)).unwrap()
        };

        assert!(CmacModule::check_capability(&params, &group(json!({}))).is_ok());
        for extra in [
            json!({"direction": "ver"}),
            json!({"keyLen": 256}),
            json!({"msgLen": 2048}),
            json!({"msgLen": 12}),
            json!({"macLen": 136}),
        ] {
            assert!(
                matches!(
                    CmacModule::check_capability(&params, &group(extra.clone())),
                    Err(AcvpError::InvalidArgument(_))
                ),
                "{extra}"
            );
        }
    }

    #[test]
    fn test_init_msg_and_msg_len_consistency() {
        let group = CmacGroup {
            direction: CmacDirection::Generate,
            msg_len: 0,
            mac_len: 16,
            msg_bits: 0,
            mac_bits: 128,
            key_len: Some(128),
            keying_option: None,
        };
        let empty = json!({"tcId": 1, "key": "00112233445566778899AABBCCDDEEFF"});
        assert!(CmacModule::init(Cipher::CmacAes, &group, 1, obj(&empty)).is_ok());

        let stray = json!({"tcId": 1, "msg": "AA", "key": "00112233445566778899AABBCCDDEEFF"});
        assert!(matches!(
            CmacModule::init(Cipher::CmacAes, &group, 1, obj(&stray)),
            Err(AcvpError::MissingArgument(m)) if m == "msgLen"
        ));

        let group = CmacGroup { msg_len: 1, ..group };
        assert!(matches!(
            CmacModule::init(Cipher::CmacAes, &group, 1, obj(&empty)),
            Err(AcvpError::MissingArgument(m)) if m == "msg"
        ));
    }

    #[test]
    fn test_output_generate_truncates_and_verify_reports() {
        let mut inputs = tdes_inputs();
        inputs.mac_len = 4;
        let mut tc = CmacTestCase::new(Cipher::CmacTdes, 2, CmacDirection::Generate, &inputs).unwrap();
        tc.set_mac(&[0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03, 0x04]).unwrap();
        let mut rsp = JsonObject::new();
        CmacModule::output(&tc, &mut rsp).unwrap();
        assert_eq!(rsp["mac"], "DEADBEEF");

        inputs.mac = Some("DEADBEEF");
        let mut tc = CmacTestCase::new(Cipher::CmacTdes, 3, CmacDirection::Verify, &inputs).unwrap();
        let mut rsp = JsonObject::new();
        assert!(CmacModule::output(&tc, &mut rsp).is_err());
        assert!(tc.set_mac(&[1]).is_err());
        tc.set_verified(false);
        CmacModule::output(&tc, &mut rsp).unwrap();
        assert_eq!(rsp["result"], "failed");
    }
}
