#![deny(unsafe_code)]
#![allow(missing_docs)]
#![warn(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Test session request.
//!
//! Builds `[{"acvVersion":"1.0"},{"isSample":..,"algorithms":[..]}]` from the
//! registered capabilities.

use acvp_prelude::prelude::{AcvpError, Result};
use serde::Serialize;
use serde_json::Value;

use crate::document::wrap_envelope;
use crate::registry::{
    CapabilityEntry, CapabilityParams, CapabilityRegistry, CmacKeyParams, Domain,
};
use crate::testcase::CmacDirection;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HashRegistration<'a> {
    algorithm: &'a str,
    revision: &'a str,
    in_bit: bool,
    in_empty: bool,
    message_length: [Domain; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CmacCapabilityBlock<'a> {
    direction: &'a [CmacDirection],
    msg_len: [Domain; 1],
    mac_len: [Domain; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    key_len: Option<&'a [u32]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keying_option: Option<&'a [u8]>,
}

#[derive(Debug, Serialize)]
struct CmacRegistration<'a> {
    algorithm: &'a str,
    revision: &'a str,
    capabilities: [CmacCapabilityBlock<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TestSessionRequest {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    is_sample: bool,
    algorithms: Vec<Value>,
}

/// Registration object for one capability.
///
/// # Errors
/// Serialization failure.
pub fn capability_json(entry: &CapabilityEntry) -> Result<Value> {
    let cipher = entry.cipher();
    let value = match entry.params() {
        CapabilityParams::Hash(hash) => serde_json::to_value(HashRegistration {
            algorithm: cipher.name(),
            revision: cipher.revision(),
            in_bit: hash.in_bit,
            in_empty: hash.in_empty,
            message_length: [hash.message_length],
        })?,
        CapabilityParams::Cmac(cmac) => {
            let (key_len, keying_option) = match &cmac.key {
                CmacKeyParams::KeyLen(lens) => (Some(lens.as_slice()), None),
                CmacKeyParams::KeyingOption(opts) => (None, Some(opts.as_slice())),
            };
            serde_json::to_value(CmacRegistration {
                algorithm: cipher.name(),
                revision: cipher.revision(),
                capabilities: [CmacCapabilityBlock {
                    direction: &cmac.directions,
                    msg_len: [cmac.msg_len],
                    mac_len: [cmac.mac_len],
                    key_len,
                    keying_option,
                }],
            })?
        }
    };
    Ok(value)
}

/// Build the test session request for every registered capability.
///
/// # Errors
/// `MissingArgument` if nothing is registered.
pub fn build_test_session_request(registry: &CapabilityRegistry, is_sample: bool) -> Result<Value> {
    if registry.is_empty() {
        return Err(AcvpError::MissingArgument("no capabilities registered".to_string()));
    }
    let algorithms = registry.iter().map(capability_json).collect::<Result<Vec<_>>>()?;
    let request = TestSessionRequest { is_sample, algorithms };
    Ok(wrap_envelope(serde_json::to_value(request)?))
}
