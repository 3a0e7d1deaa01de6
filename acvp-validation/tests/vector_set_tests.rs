#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

//! Vector-set harness integration tests
//!
//! End-to-end runs of hash (AFT and MCT) and CMAC vector sets through the
//! harness with real digest handlers.

use acvp_prelude::prelude::AcvpError;
use acvp_validation::{
    CapabilityParams, CapabilityRegistry, Cipher, CmacCapability, CmacDirection, CmacKeyParams,
    Domain, HarnessConfig, HashCapability, MctConfig, TestCase, VectorSetHarness,
};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const SHA256_ABC: &str = "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD";

fn sha256_handler(tc: &mut TestCase<'_>) -> anyhow::Result<()> {
    let TestCase::Hash(h) = tc else { anyhow::bail!("not a hash case") };
    let md = Sha256::digest(h.msg());
    h.set_md(&md)?;
    Ok(())
}

// HMAC-SHA256 stands in for the block-cipher MAC; the harness only moves bytes.
fn mac_handler(tc: &mut TestCase<'_>) -> anyhow::Result<()> {
    let TestCase::Cmac(c) = tc else { anyhow::bail!("not a cmac case") };
    let mut key = c.key().to_vec();
    key.extend_from_slice(c.key2());
    key.extend_from_slice(c.key3());
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&key).map_err(|e| anyhow::anyhow!("bad key: {e}"))?;
    mac.update(c.msg());
    let tag = mac.finalize().into_bytes();
    match c.direction() {
        CmacDirection::Generate => c.set_mac(&tag)?,
        CmacDirection::Verify => {
            let passed = tag.get(..c.mac_len()) == Some(c.mac());
            c.set_verified(passed);
        }
    }
    Ok(())
}

fn hmac_tag(key: &[u8], msg: &[u8], len: usize) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap();
    mac.update(msg);
    hex::encode_upper(&mac.finalize().into_bytes()[..len])
}

fn hash_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry
        .register_fn(Cipher::Sha256, CapabilityParams::Hash(HashCapability::default()), sha256_handler)
        .unwrap();
    registry
}

fn cmac_params(key: CmacKeyParams) -> CapabilityParams {
    CapabilityParams::Cmac(CmacCapability {
        directions: vec![CmacDirection::Generate, CmacDirection::Verify],
        msg_len: Domain::new(0, 524_288, 8),
        mac_len: Domain::new(32, 128, 8),
        key,
    })
}

fn cmac_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry
        .register_fn(Cipher::CmacAes, cmac_params(CmacKeyParams::KeyLen(vec![128, 256])), mac_handler)
        .unwrap();
    registry
        .register_fn(Cipher::CmacTdes, cmac_params(CmacKeyParams::KeyingOption(vec![1])), mac_handler)
        .unwrap();
    registry
}

#[test]
fn test_hash_aft_digest_of_abc() {
    let registry = hash_registry();
    let harness = VectorSetHarness::new(&registry, HarnessConfig::default());
    let doc = json!([{"acvVersion": "1.0"}, {
        "vsId": 1001, "algorithm": "SHA2-256",
        "testGroups": [{"tgId": 1, "testType": "AFT", "tests": [{"tcId": 1, "msg": "616263"}]}]
    }]);

    let rsp = harness.process(&doc).unwrap();
    assert_eq!(rsp.vs_id, 1001);
    assert_eq!(rsp.algorithm, "SHA2-256");
    assert_eq!(rsp.groups[0].tests[0], json!({"tcId": 1, "md": SHA256_ABC}));
}

#[test]
fn test_hash_aft_empty_message_via_len() {
    let registry = hash_registry();
    let harness = VectorSetHarness::new(&registry, HarnessConfig::default());
    let doc = json!({"vsId": 1, "algorithm": "SHA2-256", "testGroups": [
        {"tgId": 1, "testType": "AFT", "tests": [{"tcId": 1, "msg": "00", "len": 0}]}
    ]});
    let rsp = harness.process(&doc).unwrap();
    assert_eq!(
        rsp.groups[0].tests[0]["md"],
        hex::encode_upper(Sha256::digest(b"")).as_str()
    );
}

#[test]
fn test_hash_mct_two_rounds_chain() {
    let registry = hash_registry();
    let harness =
        VectorSetHarness::new(&registry, HarnessConfig::default().with_mct(MctConfig::new(2, 1)));
    let seed = [0x5au8; 32];
    let doc = json!({"vsId": 2, "algorithm": "SHA2-256", "testGroups": [
        {"tgId": 1, "testType": "MCT", "tests": [{"tcId": 7, "msg": hex::encode(seed)}]}
    ]});

    let rsp = harness.process(&doc).unwrap();
    let results = rsp.groups[0].tests[0]["resultsArray"].as_array().unwrap();
    assert_eq!(results.len(), 2);

    let first_msg = seed.repeat(3);
    let first_md = Sha256::digest(&first_msg);
    assert_eq!(results[0]["msg"], hex::encode_upper(&first_msg).as_str());
    assert_eq!(results[0]["md"], hex::encode_upper(first_md).as_str());

    let second_msg = first_md.repeat(3);
    assert_eq!(results[1]["msg"], hex::encode_upper(&second_msg).as_str());
    assert_eq!(results[1]["md"], hex::encode_upper(Sha256::digest(&second_msg)).as_str());
}

#[test]
fn test_hash_mct_default_counts_call_handler_outer_times_inner() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = CapabilityRegistry::new();
    registry
        .register_fn(Cipher::Sha1, CapabilityParams::Hash(HashCapability::default()), move |tc| {
            counter.fetch_add(1, Ordering::Relaxed);
            let TestCase::Hash(h) = tc else { anyhow::bail!("not a hash case") };
            let mut md = [0u8; 20];
            md[0] = h.msg()[59];
            h.set_md(&md)?;
            Ok(())
        })
        .unwrap();
    let harness = VectorSetHarness::new(&registry, HarnessConfig::default());
    let doc = json!({"vsId": 3, "algorithm": "SHA-1", "testGroups": [
        {"tgId": 1, "testType": "MCT", "tests": [{"tcId": 1, "msg": "00".repeat(20)}]}
    ]});

    let rsp = harness.process(&doc).unwrap();
    assert_eq!(rsp.groups[0].tests[0]["resultsArray"].as_array().unwrap().len(), 100);
    assert_eq!(calls.load(Ordering::Relaxed), 100 * 1000);
}

#[test]
fn test_hash_mct_seed_must_be_digest_length() {
    let registry = hash_registry();
    let harness = VectorSetHarness::new(&registry, HarnessConfig::default());
    let doc = json!({"vsId": 4, "algorithm": "SHA2-256", "testGroups": [
        {"tgId": 1, "testType": "MCT", "tests": [{"tcId": 1, "msg": "616263"}]}
    ]});
    assert!(matches!(harness.process(&doc), Err(AcvpError::InvalidArgument(_))));
}

#[test]
fn test_handler_failure_aborts_whole_vector_set() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = CapabilityRegistry::new();
    registry
        .register_fn(Cipher::Sha256, CapabilityParams::Hash(HashCapability::default()), move |tc| {
            if counter.fetch_add(1, Ordering::Relaxed) == 1 {
                anyhow::bail!("module self-test failed");
            }
            sha256_handler(tc)
        })
        .unwrap();
    let harness = VectorSetHarness::new(&registry, HarnessConfig::default());
    let doc = json!({"vsId": 5, "algorithm": "SHA2-256", "testGroups": [
        {"tgId": 1, "testType": "AFT", "tests": [
            {"tcId": 1, "msg": "00"}, {"tcId": 2, "msg": "01"}, {"tcId": 3, "msg": "02"}
        ]}
    ]});

    let err = harness.process(&doc).unwrap_err();
    assert!(matches!(err, AcvpError::CryptoModuleFailure(ref m) if m.contains("self-test")));
    assert_eq!(calls.load(Ordering::Relaxed), 2);
}

#[test]
fn test_hash_aft_short_digest_aborts_vector_set() {
    let mut registry = CapabilityRegistry::new();
    registry
        .register_fn(Cipher::Sha256, CapabilityParams::Hash(HashCapability::default()), |tc| {
            let TestCase::Hash(h) = tc else { anyhow::bail!("not a hash case") };
            h.set_md(&[1, 2, 3])?;
            Ok(())
        })
        .unwrap();
    let harness = VectorSetHarness::new(&registry, HarnessConfig::default());
    let doc = json!({"vsId": 13, "algorithm": "SHA2-256", "testGroups": [
        {"tgId": 1, "testType": "AFT", "tests": [{"tcId": 1, "msg": "616263"}]}
    ]});

    let err = harness.process(&doc).unwrap_err();
    assert!(matches!(err, AcvpError::CryptoModuleFailure(ref m) if m.contains("3 byte digest")), "{err:?}");
}

#[test]
fn test_hash_oversized_message_is_invalid() {
    let registry = hash_registry();
    let harness = VectorSetHarness::new(&registry, HarnessConfig::default());
    let doc = json!({"vsId": 6, "algorithm": "SHA2-256", "testGroups": [
        {"tgId": 1, "testType": "AFT", "tests": [{"tcId": 1, "msg": "00".repeat(8193)}]}
    ]});
    assert!(matches!(harness.process(&doc), Err(AcvpError::InvalidArgument(_))));
}

#[test]
fn test_cmac_aes_generate_and_verify() {
    let registry = cmac_registry();
    let harness = VectorSetHarness::new(&registry, HarnessConfig::default());
    let key = hex::decode("2B7E151628AED2A6ABF7158809CF4F3C").unwrap();
    let msg = hex::decode("6BC1BEE22E409F96E93D7E117393172A").unwrap();
    let good = hmac_tag(&key, &msg, 8);

    let doc = json!({"vsId": 7, "algorithm": "CMAC-AES", "testGroups": [
        {"tgId": 1, "direction": "gen", "keyLen": 128, "msgLen": 128, "macLen": 64,
         "tests": [{"tcId": 1, "key": hex::encode(&key), "msg": hex::encode(&msg)}]},
        {"tgId": 2, "direction": "ver", "keyLen": 128, "msgLen": 128, "macLen": 64,
         "tests": [
            {"tcId": 2, "key": hex::encode(&key), "msg": hex::encode(&msg), "mac": good},
            {"tcId": 3, "key": hex::encode(&key), "msg": hex::encode(&msg), "mac": "0000000000000000"}
         ]}
    ]});

    let rsp = harness.process(&doc).unwrap();
    assert_eq!(rsp.groups[0].tests[0], json!({"tcId": 1, "mac": good}));
    assert_eq!(rsp.groups[1].tests[0], json!({"tcId": 2, "result": "passed"}));
    assert_eq!(rsp.groups[1].tests[1], json!({"tcId": 3, "result": "failed"}));
}

#[test]
fn test_cmac_tdes_generate_requires_all_three_keys() {
    let registry = cmac_registry();
    let harness = VectorSetHarness::new(&registry, HarnessConfig::default());
    for missing in ["key2", "key3"] {
        let mut test = json!({
            "tcId": 1, "msg": "0011223344556677",
            "key1": "0123456789ABCDEF", "key2": "23456789ABCDEF01", "key3": "456789ABCDEF0123"
        });
        test.as_object_mut().unwrap().remove(missing);
        let doc = json!({"vsId": 8, "algorithm": "CMAC-TDES", "testGroups": [
            {"tgId": 1, "direction": "gen", "keyingOption": 1, "msgLen": 64, "macLen": 64,
             "tests": [test]}
        ]});
        let err = harness.process(&doc).unwrap_err();
        assert!(matches!(err, AcvpError::MissingArgument(ref f) if f == missing), "{err:?}");
    }
}

#[test]
fn test_cmac_tdes_generate_uses_all_keys() {
    let registry = cmac_registry();
    let harness = VectorSetHarness::new(&registry, HarnessConfig::default());
    let doc = json!({"vsId": 9, "algorithm": "CMAC-TDES", "testGroups": [
        {"tgId": 4, "direction": "gen", "keyingOption": 1, "msgLen": 64, "macLen": 32,
         "tests": [{"tcId": 11, "msg": "0011223344556677",
                    "key1": "0123456789ABCDEF", "key2": "23456789ABCDEF01", "key3": "456789ABCDEF0123"}]}
    ]});
    let rsp = harness.process(&doc).unwrap();

    let key = hex::decode("0123456789ABCDEF23456789ABCDEF01456789ABCDEF0123").unwrap();
    let msg = hex::decode("0011223344556677").unwrap();
    assert_eq!(rsp.groups[0].tests[0]["mac"], hmac_tag(&key, &msg, 4).as_str());
}

#[test]
fn test_cmac_verify_missing_mac_is_missing_argument() {
    let registry = cmac_registry();
    let harness = VectorSetHarness::new(&registry, HarnessConfig::default());
    let doc = json!({"vsId": 10, "algorithm": "CMAC-AES", "testGroups": [
        {"tgId": 1, "direction": "ver", "keyLen": 128, "msgLen": 0, "macLen": 64,
         "tests": [{"tcId": 1, "key": "00112233445566778899AABBCCDDEEFF"}]}
    ]});
    assert!(matches!(harness.process(&doc), Err(AcvpError::MissingArgument(ref f)) if f == "mac"));
}

#[test]
fn test_cmac_group_outside_registration_is_rejected() {
    let registry = cmac_registry();
    let harness = VectorSetHarness::new(&registry, HarnessConfig::default());
    let doc = json!({"vsId": 11, "algorithm": "CMAC-AES", "testGroups": [
        {"tgId": 1, "direction": "gen", "keyLen": 192, "msgLen": 128, "macLen": 64,
         "tests": [{"tcId": 1, "key": "00".repeat(24), "msg": "00".repeat(16)}]}
    ]});
    let err = harness.process(&doc).unwrap_err();
    assert!(matches!(err, AcvpError::InvalidArgument(ref m) if m.contains("keyLen")), "{err:?}");
}

#[test]
fn test_response_serializes_in_envelope() {
    let registry = hash_registry();
    let harness = VectorSetHarness::new(&registry, HarnessConfig::default());
    let rsp = harness
        .process_str(
            r#"[{"acvVersion":"1.0"},{"vsId":12,"algorithm":"SHA2-256","testGroups":[
                {"tgId":1,"testType":"AFT","tests":[{"tcId":1,"msg":"616263"}]}]}]"#,
        )
        .unwrap();
    let text = rsp.to_json_string(false).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed[0]["acvVersion"], "1.0");
    assert_eq!(parsed[1]["testGroups"][0]["tests"][0]["md"], SHA256_ABC);
}
