#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! TLS credential loading.
//!
//! PEM files are decoded with the `rustls-pki-types` PEM reader before being
//! handed to the HTTP client, so a malformed file fails at session setup
//! rather than on the first request.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use acvp_prelude::prelude::{AcvpError, Result};
use reqwest::{Certificate, Identity};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tracing::debug;
use zeroize::Zeroizing;

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)
        .map_err(|e| AcvpError::IoError(format!("Failed to open '{}': {}", path.display(), e)))?;
    Ok(BufReader::new(file))
}

/// Load every certificate in a PEM bundle as a trust anchor.
///
/// # Errors
/// Returns `IoError` if the file cannot be read and `InvalidArgument` if it
/// holds no certificates or a block fails to decode.
pub fn load_ca_bundle(path: &Path) -> Result<Vec<Certificate>> {
    let mut reader = open(path)?;
    let ders = CertificateDer::pem_reader_iter(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| AcvpError::InvalidArgument(format!("Failed to parse CA bundle: {e}")))?;

    if ders.is_empty() {
        return Err(AcvpError::InvalidArgument(format!(
            "No certificates found in '{}'",
            path.display()
        )));
    }
    debug!("Loaded {} CA certificate(s) from {}", ders.len(), path.display());

    ders.iter()
        .map(|der| {
            Certificate::from_der(der.as_ref())
                .map_err(|e| AcvpError::InvalidArgument(format!("Bad CA certificate: {e}")))
        })
        .collect()
}

/// Load a client certificate chain and its private key as a TLS identity.
///
/// # Errors
/// Returns `IoError` if either file cannot be read and `InvalidArgument` if
/// the certificate file holds no certificate or the key file no key.
pub fn load_client_identity(cert_path: &Path, key_path: &Path) -> Result<Identity> {
    let certs = CertificateDer::pem_reader_iter(&mut open(cert_path)?)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| AcvpError::InvalidArgument(format!("Failed to parse client certificate: {e}")))?;
    if certs.is_empty() {
        return Err(AcvpError::InvalidArgument(format!(
            "No certificates found in '{}'",
            cert_path.display()
        )));
    }
    PrivateKeyDer::from_pem_reader(&mut open(key_path)?)
        .map_err(|e| AcvpError::InvalidArgument(format!("Failed to parse private key: {e}")))?;

    let mut pem = Zeroizing::new(Vec::new());
    open(cert_path)?.read_to_end(&mut pem)?;
    pem.push(b'\n');
    open(key_path)?.read_to_end(&mut pem)?;

    Identity::from_pem(&pem)
        .map_err(|e| AcvpError::InvalidArgument(format!("Bad client identity: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FAKE_CERT: &str = "-----BEGIN CERTIFICATE-----\nMIIBAA==\n-----END CERTIFICATE-----\n";

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_ca_bundle_counts_blocks() {
        let file = write_temp(&format!("{FAKE_CERT}{FAKE_CERT}"));
        let certs = load_ca_bundle(file.path()).unwrap();
        assert_eq!(certs.len(), 2);
    }

    #[test]
    fn test_empty_ca_bundle_is_invalid() {
        let file = write_temp("no pem here\n");
        assert!(matches!(load_ca_bundle(file.path()), Err(AcvpError::InvalidArgument(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_ca_bundle(Path::new("/nonexistent/acvp/ca.pem")).unwrap_err();
        assert!(matches!(err, AcvpError::IoError(_)));
    }

    #[test]
    fn test_identity_requires_key() {
        let cert = write_temp(FAKE_CERT);
        let key = write_temp(FAKE_CERT);
        let err = load_client_identity(cert.path(), key.path()).unwrap_err();
        assert!(matches!(err, AcvpError::InvalidArgument(_)));
    }

    #[test]
    fn test_identity_requires_certificate() {
        let cert = write_temp("empty\n");
        let key = write_temp("empty\n");
        let err = load_client_identity(cert.path(), key.path()).unwrap_err();
        assert!(matches!(err, AcvpError::InvalidArgument(_)));
    }
}
