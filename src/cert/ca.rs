//! Root CA loading and generation.
//!
//! The CA is an ECDSA P-384 self-signed certificate persisted as a PEM pair
//! (`ca.pem` / `ca-key.pem`). `load_or_gen` reads an existing pair if both
//! files are present and generates a fresh one otherwise, so a service keeps
//! its CA identity across restarts as long as the directory survives.

use std::fs;
use std::path::Path;

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, DnValue, IsCa,
    KeyIdMethod, KeyPair, KeyUsagePurpose, PKCS_ECDSA_P384_SHA384,
};
use time::{Duration, OffsetDateTime};

use crate::error::ServerError;

pub const CA_CERT_FILE: &str = "ca.pem";
pub const CA_KEY_FILE: &str = "ca-key.pem";

const CA_COMMON_NAME: &str = "dynlistener-ca";
const CA_VALID_DAYS: i64 = 365 * 10;

/// A CA certificate together with its signing key, plus the certificate PEM
/// as it should be served to clients (the bytes that were loaded or written,
/// never a re-serialization).
pub struct CaPair {
    pub(crate) cert: Certificate,
    pub cert_pem: String,
}

impl CaPair {
    /// Build a CA from a user-supplied certificate/key PEM pair.
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<Self, ServerError> {
        let key = KeyPair::from_pem(key_pem)
            .map_err(|e| ServerError::Ca(format!("invalid CA key PEM: {}", e)))?;
        let params = CertificateParams::from_ca_cert_pem(cert_pem, key)
            .map_err(|e| ServerError::Ca(format!("invalid CA certificate PEM: {}", e)))?;
        let cert = Certificate::from_params(params)
            .map_err(|e| ServerError::Ca(format!("failed to reconstruct CA: {}", e)))?;

        Ok(Self {
            cert,
            cert_pem: cert_pem.to_string(),
        })
    }
}

/// Load the CA pair from `dir`, or generate and persist a new one if either
/// file is missing.
pub fn load_or_gen(dir: &Path) -> Result<CaPair, ServerError> {
    let cert_path = dir.join(CA_CERT_FILE);
    let key_path = dir.join(CA_KEY_FILE);

    if cert_path.exists() && key_path.exists() {
        let cert_pem = fs::read_to_string(&cert_path)
            .map_err(|e| ServerError::Ca(format!("{}: {}", cert_path.display(), e)))?;
        let key_pem = fs::read_to_string(&key_path)
            .map_err(|e| ServerError::Ca(format!("{}: {}", key_path.display(), e)))?;

        tracing::info!(path = %cert_path.display(), "Loaded existing CA certificate");
        return CaPair::from_pem(&cert_pem, &key_pem);
    }

    generate(dir, &cert_path, &key_path)
}

/// Generate a new root CA and write both PEM files.
fn generate(dir: &Path, cert_path: &Path, key_path: &Path) -> Result<CaPair, ServerError> {
    let ca_err = |e: rcgen::Error| ServerError::Ca(e.to_string());

    let mut params = CertificateParams::default();
    params.alg = &PKCS_ECDSA_P384_SHA384;
    params.key_pair = Some(KeyPair::generate(&PKCS_ECDSA_P384_SHA384).map_err(ca_err)?);
    params.key_identifier_method = KeyIdMethod::Sha384;

    let mut dn = DistinguishedName::new();
    dn.push(
        DnType::CommonName,
        DnValue::PrintableString(CA_COMMON_NAME.to_string()),
    );
    params.distinguished_name = dn;

    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.not_before = OffsetDateTime::now_utc() - Duration::days(1);
    params.not_after = OffsetDateTime::now_utc() + Duration::days(CA_VALID_DAYS);
    params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];

    let cert = Certificate::from_params(params).map_err(ca_err)?;
    let cert_pem = cert.serialize_pem().map_err(ca_err)?;
    let key_pem = cert.serialize_private_key_pem();

    fs::create_dir_all(dir).map_err(|e| ServerError::Ca(format!("{}: {}", dir.display(), e)))?;
    fs::write(cert_path, &cert_pem)
        .map_err(|e| ServerError::Ca(format!("{}: {}", cert_path.display(), e)))?;
    fs::write(key_path, &key_pem)
        .map_err(|e| ServerError::Ca(format!("{}: {}", key_path.display(), e)))?;

    tracing::info!(path = %cert_path.display(), "Generated new CA certificate");
    Ok(CaPair { cert, cert_pem })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_or_gen_creates_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let ca = load_or_gen(dir.path()).unwrap();

        assert!(dir.path().join(CA_CERT_FILE).exists());
        assert!(dir.path().join(CA_KEY_FILE).exists());
        assert!(ca.cert_pem.contains("BEGIN CERTIFICATE"));
    }

    #[test]
    fn test_load_or_gen_is_stable_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let first = load_or_gen(dir.path()).unwrap();
        let second = load_or_gen(dir.path()).unwrap();

        // Second call must load the persisted CA, not mint a new one
        assert_eq!(first.cert_pem, second.cert_pem);
    }

    #[test]
    fn test_from_pem_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let ca = load_or_gen(dir.path()).unwrap();
        let key_pem = std::fs::read_to_string(dir.path().join(CA_KEY_FILE)).unwrap();

        let rebuilt = CaPair::from_pem(&ca.cert_pem, &key_pem).unwrap();
        assert_eq!(rebuilt.cert_pem, ca.cert_pem);
    }

    #[test]
    fn test_from_pem_rejects_garbage() {
        assert!(CaPair::from_pem("not a cert", "not a key").is_err());
    }
}
