//! Merchant credentials for the two-way TLS validation call.
//!
//! The protocol code only sees [`MerchantValidationConfig`], so the
//! certificate and request body can come from files, a secret store or a
//! test fixture without touching the validation logic.

use openssl::pkey::{PKey, Private};
use openssl::x509::X509;

use crate::error::{Error, Result};

/// Source of the merchant identity certificate and the JSON request payload
/// the wallet provider expects during merchant validation.
pub trait MerchantValidationConfig {
    fn load_cert(&self) -> Result<MerchantIdentity>;
    fn load_request_body(&self) -> Result<Vec<u8>>;
}

/// Reads both values from disk.
///
/// `cert_file_path` must point at a PEM bundle containing the certificate
/// and its private key.
#[derive(Debug, Clone)]
pub struct FileBasedMerchantValidationConfig {
    pub cert_file_path: String,
    pub request_body_file_path: String,
}

impl MerchantValidationConfig for FileBasedMerchantValidationConfig {
    fn load_cert(&self) -> Result<MerchantIdentity> {
        let pem = std::fs::read(&self.cert_file_path).map_err(|e| {
            Error::Configuration(format!(
                "error reading certificate {}: {}",
                self.cert_file_path, e
            ))
        })?;
        MerchantIdentity::from_pem(&pem)
    }

    fn load_request_body(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.request_body_file_path).map_err(|e| {
            Error::Configuration(format!(
                "error reading request body {}: {}",
                self.request_body_file_path, e
            ))
        })
    }
}

/// An X.509 certificate and its matching private key.
#[derive(Clone)]
pub struct MerchantIdentity {
    certificate: X509,
    key: PKey<Private>,
}

impl MerchantIdentity {
    /// Parses a PEM bundle holding a certificate and a private key. Text
    /// between the PEM blocks is ignored.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let certificate = X509::from_pem(pem)
            .map_err(|e| Error::Identity(format!("no usable certificate: {}", e)))?;
        let key = PKey::private_key_from_pem(pem)
            .map_err(|e| Error::Identity(format!("no usable private key: {}", e)))?;
        Self::new(certificate, key)
    }

    pub fn new(certificate: X509, key: PKey<Private>) -> Result<Self> {
        if !certificate.public_key()?.public_eq(&key) {
            return Err(Error::Identity(
                "private key does not match certificate".into(),
            ));
        }
        Ok(MerchantIdentity { certificate, key })
    }

    #[cfg(test)]
    pub(crate) fn certificate(&self) -> &X509 {
        &self.certificate
    }

    /// Builds the TLS client identity for a single connection.
    pub fn to_tls_identity(&self) -> Result<reqwest::Identity> {
        let cert_pem = self.certificate.to_pem()?;
        let key_pem = self.key.private_key_to_pem_pkcs8()?;
        reqwest::Identity::from_pkcs8_pem(&cert_pem, &key_pem)
            .map_err(|e| Error::Identity(format!("error preparing tls: {}", e)))
    }
}

impl std::fmt::Debug for MerchantIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MerchantIdentity").finish_non_exhaustive()
    }
}
