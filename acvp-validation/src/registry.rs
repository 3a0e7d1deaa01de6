#![deny(unsafe_code)]
#![allow(missing_docs)]
#![warn(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Capability registry.
//!
//! Maps an algorithm identifier to the crypto handler the application
//! registered for it, together with the capability parameters advertised to
//! the server. The harness only looks entries up; it never mutates them.

use std::fmt;

use acvp_prelude::prelude::{AcvpError, Result};
use serde::Serialize;
use tracing::debug;

use crate::testcase::{CmacDirection, CmacTestCase, HashTestCase};

/// Algorithm identifiers the client can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cipher {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha512_224,
    Sha512_256,
    CmacAes,
    CmacTdes,
}

/// Test-case module family an algorithm belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmFamily {
    Hash,
    Cmac,
}

impl Cipher {
    pub const ALL: [Cipher; 9] = [
        Cipher::Sha1,
        Cipher::Sha224,
        Cipher::Sha256,
        Cipher::Sha384,
        Cipher::Sha512,
        Cipher::Sha512_224,
        Cipher::Sha512_256,
        Cipher::CmacAes,
        Cipher::CmacTdes,
    ];

    /// Wire name of the algorithm.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Cipher::Sha1 => "SHA-1",
            Cipher::Sha224 => "SHA2-224",
            Cipher::Sha256 => "SHA2-256",
            Cipher::Sha384 => "SHA2-384",
            Cipher::Sha512 => "SHA2-512",
            Cipher::Sha512_224 => "SHA2-512/224",
            Cipher::Sha512_256 => "SHA2-512/256",
            Cipher::CmacAes => "CMAC-AES",
            Cipher::CmacTdes => "CMAC-TDES",
        }
    }

    /// Look up an algorithm by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    #[must_use]
    pub fn family(self) -> AlgorithmFamily {
        match self {
            Cipher::Sha1
            | Cipher::Sha224
            | Cipher::Sha256
            | Cipher::Sha384
            | Cipher::Sha512
            | Cipher::Sha512_224
            | Cipher::Sha512_256 => AlgorithmFamily::Hash,
            Cipher::CmacAes | Cipher::CmacTdes => AlgorithmFamily::Cmac,
        }
    }

    /// Protocol revision registered for the algorithm.
    #[must_use]
    pub fn revision(self) -> &'static str {
        "1.0"
    }

    /// Digest length in bytes for hash algorithms.
    #[must_use]
    pub fn digest_len(self) -> Option<usize> {
        match self {
            Cipher::Sha1 => Some(20),
            Cipher::Sha224 | Cipher::Sha512_224 => Some(28),
            Cipher::Sha256 | Cipher::Sha512_256 => Some(32),
            Cipher::Sha384 => Some(48),
            Cipher::Sha512 => Some(64),
            Cipher::CmacAes | Cipher::CmacTdes => None,
        }
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The live test-case record handed to a crypto handler.
#[derive(Debug)]
pub enum TestCase<'a> {
    Hash(&'a mut HashTestCase),
    Cmac(&'a mut CmacTestCase),
}

impl TestCase<'_> {
    #[must_use]
    pub fn cipher(&self) -> Cipher {
        match self {
            TestCase::Hash(tc) => tc.cipher(),
            TestCase::Cmac(tc) => tc.cipher(),
        }
    }

    #[must_use]
    pub fn tc_id(&self) -> u64 {
        match self {
            TestCase::Hash(tc) => tc.tc_id(),
            TestCase::Cmac(tc) => tc.tc_id(),
        }
    }
}

/// Application-supplied implementation of one algorithm.
///
/// A handler reads the inputs of the record and writes its outputs back
/// (`set_md`, `set_mac`, `set_verified`). Any error is reported to the
/// harness as a crypto-module failure and aborts the vector set.
pub trait CryptoHandler: Send + Sync {
    /// Run the operation for one test case.
    ///
    /// # Errors
    /// Any failure of the underlying module.
    fn handle(&self, tc: &mut TestCase<'_>) -> anyhow::Result<()>;
}

impl<F> CryptoHandler for F
where
    F: Fn(&mut TestCase<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, tc: &mut TestCase<'_>) -> anyhow::Result<()> {
        self(tc)
    }
}

/// Call `handler` and fold its error into the taxonomy.
///
/// # Errors
/// [`AcvpError::CryptoModuleFailure`] carrying the handler's error chain.
pub fn invoke_handler(handler: &dyn CryptoHandler, mut tc: TestCase<'_>) -> Result<()> {
    let tc_id = tc.tc_id();
    handler.handle(&mut tc).map_err(|e| {
        AcvpError::CryptoModuleFailure(format!("{} tcId {tc_id}: {e:#}", tc.cipher()))
    })
}

/// Inclusive range with a step, as advertised in registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Domain {
    pub min: u32,
    pub max: u32,
    pub increment: u32,
}

impl Domain {
    #[must_use]
    pub fn new(min: u32, max: u32, increment: u32) -> Self {
        Self { min, max, increment }
    }

    /// Whether `value` is one of the lengths this domain admits.
    #[must_use]
    pub fn contains(&self, value: u32) -> bool {
        value >= self.min
            && value <= self.max
            && (self.increment == 0 || (value - self.min) % self.increment == 0)
    }
}

/// Hash capability parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashCapability {
    pub in_bit: bool,
    pub in_empty: bool,
    /// Message lengths in bits.
    pub message_length: Domain,
}

impl Default for HashCapability {
    fn default() -> Self {
        Self { in_bit: false, in_empty: true, message_length: Domain::new(0, 65528, 8) }
    }
}

/// Key parameterisation for CMAC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmacKeyParams {
    /// AES key lengths in bits.
    KeyLen(Vec<u32>),
    /// TDES keying options (1 or 2).
    KeyingOption(Vec<u8>),
}

/// CMAC capability parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmacCapability {
    pub directions: Vec<CmacDirection>,
    /// Message lengths in bits.
    pub msg_len: Domain,
    /// MAC lengths in bits.
    pub mac_len: Domain,
    pub key: CmacKeyParams,
}

/// Parameters advertised for a registered algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityParams {
    Hash(HashCapability),
    Cmac(CmacCapability),
}

impl CapabilityParams {
    fn family(&self) -> AlgorithmFamily {
        match self {
            CapabilityParams::Hash(_) => AlgorithmFamily::Hash,
            CapabilityParams::Cmac(_) => AlgorithmFamily::Cmac,
        }
    }

    fn validate(&self, cipher: Cipher) -> Result<()> {
        if self.family() != cipher.family() {
            return Err(AcvpError::InvalidArgument(format!(
                "{cipher} cannot take {:?} parameters",
                self.family()
            )));
        }
        if let CapabilityParams::Cmac(cmac) = self {
            if cmac.directions.is_empty() {
                return Err(AcvpError::MissingArgument(format!("{cipher} direction")));
            }
            match (&cmac.key, cipher) {
                (CmacKeyParams::KeyLen(lens), Cipher::CmacAes) => {
                    if lens.is_empty() || lens.iter().any(|l| ![128, 192, 256].contains(l)) {
                        return Err(AcvpError::InvalidArgument(format!("{cipher} keyLen {lens:?}")));
                    }
                }
                (CmacKeyParams::KeyingOption(opts), Cipher::CmacTdes) => {
                    if opts.is_empty() || opts.iter().any(|o| !(1..=2).contains(o)) {
                        return Err(AcvpError::InvalidArgument(format!(
                            "{cipher} keyingOption {opts:?}"
                        )));
                    }
                }
                _ => {
                    return Err(AcvpError::InvalidArgument(format!(
                        "{cipher} key parameters do not match the cipher"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A registered algorithm.
pub struct CapabilityEntry {
    cipher: Cipher,
    params: CapabilityParams,
    handler: Box<dyn CryptoHandler>,
}

impl CapabilityEntry {
    #[must_use]
    pub fn cipher(&self) -> Cipher {
        self.cipher
    }

    #[must_use]
    pub fn params(&self) -> &CapabilityParams {
        &self.params
    }

    #[must_use]
    pub fn handler(&self) -> &dyn CryptoHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for CapabilityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityEntry")
            .field("cipher", &self.cipher)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Registered algorithms, in registration order.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    entries: Vec<CapabilityEntry>,
}

impl CapabilityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `cipher`.
    ///
    /// # Errors
    /// [`AcvpError::InvalidArgument`] if the cipher is already registered or
    /// the parameters do not fit it.
    pub fn register<H>(&mut self, cipher: Cipher, params: CapabilityParams, handler: H) -> Result<()>
    where
        H: CryptoHandler + 'static,
    {
        if self.lookup(cipher).is_some() {
            return Err(AcvpError::InvalidArgument(format!("{cipher} is already registered")));
        }
        params.validate(cipher)?;
        debug!(algorithm = %cipher, "registered capability");
        self.entries.push(CapabilityEntry { cipher, params, handler: Box::new(handler) });
        Ok(())
    }

    /// Register a closure as the handler for `cipher`.
    ///
    /// # Errors
    /// Same as [`CapabilityRegistry::register`].
    pub fn register_fn<F>(&mut self, cipher: Cipher, params: CapabilityParams, handler: F) -> Result<()>
    where
        F: Fn(&mut TestCase<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(cipher, params, handler)
    }

    #[must_use]
    pub fn lookup(&self, cipher: Cipher) -> Option<&CapabilityEntry> {
        self.entries.iter().find(|e| e.cipher == cipher)
    }

    /// Resolve a wire algorithm name to its registered entry.
    ///
    /// # Errors
    /// [`AcvpError::UnsupportedOperation`] for unknown names and for known
    /// algorithms nobody registered.
    pub fn lookup_by_name(&self, name: &str) -> Result<&CapabilityEntry> {
        let cipher = Cipher::from_name(name)
            .ok_or_else(|| AcvpError::UnsupportedOperation(format!("unknown algorithm {name}")))?;
        self.lookup(cipher).ok_or_else(|| {
            AcvpError::UnsupportedOperation(format!("no capability registered for {name}"))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapabilityEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn noop(_tc: &mut TestCase<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn test_cipher_names_round_trip() {
        for cipher in Cipher::ALL {
            assert_eq!(Cipher::from_name(cipher.name()), Some(cipher));
        }
        assert_eq!(Cipher::from_name("SHA3-256"), None);
        assert_eq!(Cipher::Sha512_256.digest_len(), Some(32));
        assert_eq!(Cipher::CmacAes.family(), AlgorithmFamily::Cmac);
    }

    #[test]
    fn test_lookup_by_name_distinguishes_unknown_and_unregistered() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register(Cipher::Sha256, CapabilityParams::Hash(HashCapability::default()), noop)
            .unwrap();

        assert_eq!(registry.lookup_by_name("SHA2-256").unwrap().cipher(), Cipher::Sha256);
        let unknown = registry.lookup_by_name("MD5").unwrap_err();
        assert!(matches!(unknown, AcvpError::UnsupportedOperation(m) if m.contains("unknown")));
        let missing = registry.lookup_by_name("SHA2-384").unwrap_err();
        assert!(matches!(missing, AcvpError::UnsupportedOperation(m) if m.contains("no capability")));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = CapabilityRegistry::new();
        let params = CapabilityParams::Hash(HashCapability::default());
        registry.register(Cipher::Sha1, params.clone(), noop).unwrap();
        assert!(matches!(
            registry.register(Cipher::Sha1, params, noop),
            Err(AcvpError::InvalidArgument(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_params_must_match_cipher() {
        let mut registry = CapabilityRegistry::new();
        let tdes_opts = CapabilityParams::Cmac(CmacCapability {
            directions: vec![CmacDirection::Generate],
            msg_len: Domain::new(0, 65536, 8),
            mac_len: Domain::new(32, 64, 8),
            key: CmacKeyParams::KeyingOption(vec![1]),
        });
        assert!(registry.register(Cipher::CmacAes, tdes_opts.clone(), noop).is_err());
        assert!(registry.register(Cipher::Sha1, tdes_opts.clone(), noop).is_err());
        assert!(registry.register(Cipher::CmacTdes, tdes_opts, noop).is_ok());
    }

    #[test]
    fn test_handler_error_becomes_crypto_failure() {
        let failing = |_tc: &mut TestCase<'_>| -> anyhow::Result<()> { anyhow::bail!("engine offline") };
        let mut record =
            HashTestCase::new(Cipher::Sha1, 7, crate::testcase::HashTestType::Aft, "00", None)
                .unwrap();
        let err = invoke_handler(&failing, TestCase::Hash(&mut record)).unwrap_err();
        match err {
            AcvpError::CryptoModuleFailure(msg) => {
                assert!(msg.contains("engine offline"));
                assert!(msg.contains("tcId 7"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_domain_contains() {
        let d = Domain::new(0, 65528, 8);
        assert!(d.contains(0));
        assert!(d.contains(65528));
        assert!(!d.contains(12));
        assert!(!d.contains(65536));
    }
}
