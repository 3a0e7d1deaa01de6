#![deny(unsafe_code)]
#![allow(missing_docs)]
#![warn(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Vector-set processing.
//!
//! Groups and cases are handled strictly in document order with exactly one
//! live test-case record at a time. Any failure discards the whole response.

use std::time::Instant;

use acvp_prelude::prelude::{AcvpError, Result};
use serde_json::Value;
use tracing::{debug, error, info, info_span};

use crate::document::{
    JsonObject, ResponseDocument, ResponseGroup, as_object, get_array, get_u64, parse_document,
    unwrap_envelope,
};
use crate::mct::MctConfig;
use crate::registry::{AlgorithmFamily, CapabilityEntry, CapabilityRegistry, Cipher};
use crate::testcase::{AlgorithmModule, CaseContext, CmacModule, HashModule};

/// Harness configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Monte Carlo loop counts
    pub mct: MctConfig,
}

impl HarnessConfig {
    #[must_use]
    pub fn with_mct(mut self, mct: MctConfig) -> Self {
        self.mct = mct;
        self
    }
}

/// Runs vector sets against the registered handlers.
pub struct VectorSetHarness<'r> {
    registry: &'r CapabilityRegistry,
    config: HarnessConfig,
}

impl<'r> VectorSetHarness<'r> {
    pub fn new(registry: &'r CapabilityRegistry, config: HarnessConfig) -> Self {
        Self { registry, config }
    }

    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Parse and process a raw vector-set document.
    ///
    /// # Errors
    /// See [`VectorSetHarness::process`].
    pub fn process_str(&self, text: &str) -> Result<ResponseDocument> {
        self.process(&parse_document(text)?)
    }

    /// Process a vector set and build the response document.
    ///
    /// # Errors
    /// - `MalformedDocument` if `algorithm`, `vsId`, `testGroups` or a `tgId` is missing
    /// - `UnsupportedOperation` if the algorithm is not registered
    /// - `MissingArgument`/`InvalidArgument` for bad group or case fields
    /// - `CryptoModuleFailure` if a handler fails
    pub fn process(&self, document: &Value) -> Result<ResponseDocument> {
        let body = unwrap_envelope(document)?;
        let algorithm = body
            .get("algorithm")
            .and_then(Value::as_str)
            .ok_or_else(|| AcvpError::MalformedDocument("missing algorithm".to_string()))?;
        let vs_id = body
            .get("vsId")
            .and_then(Value::as_u64)
            .ok_or_else(|| AcvpError::MalformedDocument("missing vsId".to_string()))?;

        let span = info_span!("vector_set", vs_id, algorithm);
        let _guard = span.enter();

        let entry = self.registry.lookup_by_name(algorithm).inspect_err(|e| {
            error!("Server requested an unsupported capability: {}", e);
        })?;
        let groups = body
            .get("testGroups")
            .and_then(Value::as_array)
            .ok_or_else(|| AcvpError::MalformedDocument("missing testGroups".to_string()))?;

        let start = Instant::now();
        let mut response = ResponseDocument::new(vs_id, algorithm);
        let result = match entry.cipher().family() {
            AlgorithmFamily::Hash => self.run_groups::<HashModule>(entry, groups, &mut response),
            AlgorithmFamily::Cmac => self.run_groups::<CmacModule>(entry, groups, &mut response),
        };
        if let Err(e) = result {
            error!("Vector set {} aborted: {}", vs_id, e);
            return Err(e);
        }

        info!(
            "Completed vector set {} ({}): {} groups, {} test cases in {:?}",
            vs_id,
            algorithm,
            response.groups.len(),
            response.test_case_count(),
            start.elapsed()
        );
        Ok(response)
    }

    fn run_groups<M: AlgorithmModule>(
        &self,
        entry: &CapabilityEntry,
        groups: &[Value],
        response: &mut ResponseDocument,
    ) -> Result<()> {
        let cipher = entry.cipher();
        let ctx = CaseContext { handler: entry.handler(), mct: &self.config.mct };

        for group in groups {
            let group = as_object(group, "test group")?;
            let tg_id = group
                .get("tgId")
                .and_then(Value::as_u64)
                .ok_or_else(|| AcvpError::MalformedDocument("missing tgId".to_string()))?;
            let params = M::parse_group(cipher, group)?;
            M::check_capability(entry.params(), &params)?;
            let tests = get_array(group, "tests")?;
            debug!(tg_id, ?params, tests = tests.len(), "test group");

            let mut out = ResponseGroup::new(tg_id);
            for test in tests {
                out.tests.push(Value::Object(Self::run_case::<M>(cipher, &params, ctx, test)?));
            }
            response.push_group(out);
        }
        Ok(())
    }

    fn run_case<M: AlgorithmModule>(
        cipher: Cipher,
        params: &M::Group,
        ctx: CaseContext<'_>,
        test: &Value,
    ) -> Result<JsonObject> {
        let test = as_object(test, "test case")?;
        let tc_id = get_u64(test, "tcId")?;
        let mut record = M::init(cipher, params, tc_id, test)?;

        let mut rsp = JsonObject::new();
        rsp.insert("tcId".to_string(), Value::from(tc_id));
        M::process(&mut record, params, ctx, &mut rsp)?;
        drop(record);
        Ok(rsp)
    }
}
