//! On-demand certificate resolution.
//!
//! `DynamicResolver` plugs into rustls as the server certificate resolver.
//! Each handshake is served a leaf certificate for the requested SNI name,
//! issued from the CA on first sight and cached in storage afterwards.
//! Clients that send no SNI (typically those connecting by IP address) get a
//! fallback certificate for `localhost` with loopback IP SANs.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use rcgen::{
    Certificate, CertificateParams, DistinguishedName, DnType, DnValue, KeyIdMethod, KeyPair,
    SanType, PKCS_ECDSA_P384_SHA384,
};
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use time::{Duration, OffsetDateTime};

use crate::cert::{CaPair, TlsStorage};
use crate::error::ServerError;

/// Server name used when a client sends no SNI.
pub const FALLBACK_NAME: &str = "localhost";

const LEAF_VALID_DAYS: i64 = 365;

pub struct DynamicResolver {
    ca: Arc<CaPair>,
    storage: Arc<dyn TlsStorage>,
}

impl DynamicResolver {
    pub fn new(ca: Arc<CaPair>, storage: Arc<dyn TlsStorage>) -> Self {
        Self { ca, storage }
    }

    /// Fetch the certificate for `name` from storage, issuing and caching a
    /// new one on a miss. Returns `None` only when issuance fails; that
    /// fails the current handshake and nothing else.
    pub(crate) fn lookup(&self, name: &str) -> Option<Arc<CertifiedKey>> {
        if let Some(key) = self.storage.get(name) {
            return Some(key);
        }

        match self.issue(name) {
            Ok(key) => {
                tracing::info!(server_name = %name, "Issued TLS certificate");
                self.storage.put(name, key.clone());
                Some(key)
            }
            Err(err) => {
                tracing::warn!(server_name = %name, error = %err, "Certificate issuance failed");
                None
            }
        }
    }

    /// Issue a one-year leaf certificate for `name`, signed by the CA.
    fn issue(&self, name: &str) -> Result<Arc<CertifiedKey>, ServerError> {
        let tls_err = |e: rcgen::Error| ServerError::TlsConfig(e.to_string());

        let mut params = CertificateParams::default();
        params.alg = &PKCS_ECDSA_P384_SHA384;
        params.key_pair = Some(KeyPair::generate(&PKCS_ECDSA_P384_SHA384).map_err(tls_err)?);
        params.key_identifier_method = KeyIdMethod::Sha384;

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, DnValue::Utf8String(name.to_string()));
        params.distinguished_name = dn;

        params.subject_alt_names = if name == FALLBACK_NAME {
            vec![
                SanType::DnsName(name.to_string()),
                SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST)),
                SanType::IpAddress(IpAddr::V6(Ipv6Addr::LOCALHOST)),
            ]
        } else {
            vec![SanType::DnsName(name.to_string())]
        };

        params.not_before = OffsetDateTime::now_utc() - Duration::days(1);
        params.not_after = OffsetDateTime::now_utc() + Duration::days(LEAF_VALID_DAYS);

        let cert = Certificate::from_params(params).map_err(tls_err)?;
        let cert_der = CertificateDer::from(
            cert.serialize_der_with_signer(&self.ca.cert).map_err(tls_err)?,
        );
        let key_der =
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(cert.serialize_private_key_der()));
        let signing_key = rustls::crypto::aws_lc_rs::sign::any_supported_type(&key_der)
            .map_err(|e| ServerError::TlsConfig(e.to_string()))?;

        Ok(Arc::new(CertifiedKey::new(vec![cert_der], signing_key)))
    }
}

impl fmt::Debug for DynamicResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicResolver").finish_non_exhaustive()
    }
}

impl ResolvesServerCert for DynamicResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        let name = client_hello.server_name().unwrap_or(FALLBACK_NAME);
        self.lookup(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::{ca, MemoryStorage};

    fn resolver() -> DynamicResolver {
        let dir = tempfile::tempdir().unwrap();
        let ca = Arc::new(ca::load_or_gen(dir.path()).unwrap());
        DynamicResolver::new(ca, Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_lookup_issues_on_miss() {
        let resolver = resolver();
        let key = resolver.lookup("example.com").unwrap();
        assert_eq!(key.cert.len(), 1);
    }

    #[test]
    fn test_lookup_caches_per_name() {
        let resolver = resolver();
        let first = resolver.lookup("example.com").unwrap();
        let second = resolver.lookup("example.com").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = resolver.lookup("other.example.com").unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
    }
}
