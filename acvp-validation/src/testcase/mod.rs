//! Algorithm test-case modules.
//!
//! Each module turns a test group and test case from the vector set into a
//! record the crypto handler can work on, then writes the handler's result
//! into the response. A record is created right before the handler runs and
//! dropped right after; dropping wipes its buffers.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![warn(clippy::unwrap_used)]
#![deny(clippy::panic)]

pub mod cmac;
pub mod hash;

pub use cmac::*;
pub use hash::*;

use acvp_prelude::prelude::Result;

use crate::document::JsonObject;
use crate::mct::MctConfig;
use crate::registry::{CapabilityParams, Cipher, CryptoHandler, TestCase, invoke_handler};

/// What a module needs while processing one case.
#[derive(Clone, Copy)]
pub struct CaseContext<'a> {
    pub handler: &'a dyn CryptoHandler,
    pub mct: &'a MctConfig,
}

/// One algorithm family's part of the harness.
pub trait AlgorithmModule {
    /// Group-level parameters.
    type Group: std::fmt::Debug;
    /// Per-case record handed to the handler.
    type Record;

    /// Read the group parameters this family needs.
    ///
    /// # Errors
    /// `MissingArgument` or `InvalidArgument` for absent or bad fields.
    fn parse_group(cipher: Cipher, group: &JsonObject) -> Result<Self::Group>;

    /// Reject a group asking for parameters outside what was registered.
    ///
    /// # Errors
    /// `InvalidArgument` naming the offending field.
    fn check_capability(_params: &CapabilityParams, _group: &Self::Group) -> Result<()> {
        Ok(())
    }

    /// Build the record for one test case.
    ///
    /// # Errors
    /// `MissingArgument` or `InvalidArgument` for absent, oversized or
    /// inconsistent fields.
    fn init(cipher: Cipher, group: &Self::Group, tc_id: u64, test: &JsonObject)
    -> Result<Self::Record>;

    /// Borrow the record as the handler-facing view.
    fn as_test_case(record: &mut Self::Record) -> TestCase<'_>;

    /// Write the handler's result into the response case.
    ///
    /// # Errors
    /// `CryptoModuleFailure` if the handler left no usable result.
    fn output(record: &Self::Record, response: &mut JsonObject) -> Result<()>;

    /// Run the handler for one case and fill in `response`.
    ///
    /// # Errors
    /// Handler failure or output failure.
    fn process(
        record: &mut Self::Record,
        _group: &Self::Group,
        ctx: CaseContext<'_>,
        response: &mut JsonObject,
    ) -> Result<()> {
        invoke_handler(ctx.handler, Self::as_test_case(record))?;
        Self::output(record, response)
    }
}
