//! Protocol Constants
//!
//! Fixed values of the ACVP wire protocol and the limits the client enforces
//! on data received from the server.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

/// Protocol version carried in the first element of every envelope.
pub const ACV_VERSION: &str = "1.0";

/// Key of the version object in an envelope.
pub const ACV_VERSION_KEY: &str = "acvVersion";

/// Largest response body the session will buffer (16 MiB).
pub const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024;

/// Largest bearer token accepted from the server.
pub const MAX_TOKEN_LEN: usize = 1024;

/// Error text the server returns in a 401 body when the token has expired.
pub const JWT_EXPIRED_MSG: &str = "JWT expired";

/// Error text the server returns in a 401 body when the token signature is wrong.
pub const JWT_INVALID_MSG: &str = "JWT signature does not match";

/// Disposition reported for a verify-direction case that matched.
pub const DISPOSITION_PASSED: &str = "passed";

/// Disposition reported for a verify-direction case that did not match.
pub const DISPOSITION_FAILED: &str = "failed";

/// Path suffix for the login endpoint.
pub const LOGIN_PATH: &str = "login";

/// Path suffix for the test session endpoint.
pub const TEST_SESSIONS_PATH: &str = "testSessions";

/// Path suffix appended to a vector set URL for results.
pub const RESULTS_SUFFIX: &str = "results";

/// Path suffix appended to a vector set URL for expected results.
pub const EXPECTED_SUFFIX: &str = "expected";
