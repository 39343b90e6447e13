//! Signing key material: an RSA private key together with the X.509
//! certificate that is embedded into `KeyInfo`.

use openssl::error::ErrorStack;
use openssl::pkcs12::Pkcs12;
use openssl::x509::X509;
use std::fmt;
use thiserror::Error;
use x509_parser::error::X509Error;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::crypto;
use crate::crypto::rsa::{RsaPrivateKey, RsaPublicKey};

/// Error type for loading keys and certificates.
#[derive(Debug, Error)]
pub enum Error {
    #[error("X.509 error: {0}")]
    X509(#[from] X509Error),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] ErrorStack),

    #[error(transparent)]
    Crypto(#[from] crypto::Error),

    #[error("{0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A parsed X.509 certificate.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    subject: String,
    issuer: String,
    serial_number: String,
    public_key: RsaPublicKey,
}

impl Certificate {
    /// Parse a DER-encoded certificate and load its RSA public key.
    pub fn from_der(der: impl AsRef<[u8]>) -> Result<Self> {
        let der_bytes = der.as_ref();
        let (rest, cert) =
            X509Certificate::from_der(der_bytes).map_err(|e| Error::X509(e.into()))?;
        if !rest.is_empty() {
            return Err(Error::Invalid(format!(
                "{} trailing bytes after certificate",
                rest.len()
            )));
        }

        let public_key = RsaPublicKey::from_der(cert.tbs_certificate.subject_pki.raw)?;

        Ok(Self {
            der: der_bytes.to_vec(),
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial_number: cert.tbs_certificate.raw_serial_as_string(),
            public_key,
        })
    }

    /// Parse a PEM-encoded certificate.
    pub fn from_pem(pem: impl AsRef<[u8]>) -> Result<Self> {
        let cert = X509::from_pem(pem.as_ref())?;
        Self::from_der(cert.to_der()?)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Serial number as colon separated hex.
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("serial_number", &self.serial_number)
            .finish()
    }
}

/// Private key plus the matching certificate.
#[derive(Clone)]
pub struct KeyMaterial {
    private_key: RsaPrivateKey,
    certificate: Certificate,
}

impl KeyMaterial {
    /// Pair a key with a certificate. Fails unless the certificate carries
    /// the public half of `private_key`.
    pub fn new(private_key: RsaPrivateKey, certificate: Certificate) -> Result<Self> {
        if !private_key.matches(certificate.public_key()) {
            return Err(Error::Invalid(format!(
                "Private key does not match certificate {}",
                certificate.subject()
            )));
        }
        Ok(Self {
            private_key,
            certificate,
        })
    }

    /// Load a PKCS#12 (PFX) container protected by `password`.
    pub fn from_pkcs12(der: impl AsRef<[u8]>, password: &str) -> Result<Self> {
        let pkcs12 = Pkcs12::from_der(der.as_ref())?;
        let parsed = pkcs12.parse2(password).map_err(|e| {
            Error::Invalid(format!(
                "Unable to open PKCS#12 container (wrong password?): {e}"
            ))
        })?;

        let pkey = parsed
            .pkey
            .ok_or_else(|| Error::Invalid("PKCS#12 container holds no private key".into()))?;
        let cert = parsed
            .cert
            .ok_or_else(|| Error::Invalid("PKCS#12 container holds no certificate".into()))?;

        Self::new(
            RsaPrivateKey::from_pkey(pkey)?,
            Certificate::from_der(cert.to_der()?)?,
        )
    }

    /// Load a PEM private key (PKCS#1 or PKCS#8) and a PEM certificate.
    pub fn from_pem(key_pem: impl AsRef<[u8]>, cert_pem: impl AsRef<[u8]>) -> Result<Self> {
        Self::new(
            RsaPrivateKey::from_pem(key_pem)?,
            Certificate::from_pem(cert_pem)?,
        )
    }

    /// Load a DER private key and a DER certificate.
    pub fn from_der(key_der: impl AsRef<[u8]>, cert_der: impl AsRef<[u8]>) -> Result<Self> {
        Self::new(
            RsaPrivateKey::from_der(key_der)?,
            Certificate::from_der(cert_der)?,
        )
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key_size", &self.private_key.key_size())
            .field("certificate", &self.certificate)
            .finish_non_exhaustive()
    }
}
