//! Algorithm identifiers and the closed set of algorithms they select.

use crate::crypto::HashAlg;

use super::{Error, Result};

// Canonicalization algorithms
pub const EXCLUSIVE_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
/// Implied by a transform chain that never canonicalizes. Not supported.
pub const INCLUSIVE_C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";

// Transform algorithms
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

// Digest algorithms
pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

// Signature algorithms
pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

const DIGEST_METHODS: &[(&str, DigestMethod)] = &[(SHA256, DigestMethod::Sha256)];

const SIGNATURE_METHODS: &[(&str, SignatureMethod)] = &[(RSA_SHA256, SignatureMethod::RsaSha256)];

const CANONICALIZATION_METHODS: &[(&str, CanonicalizationMethod)] =
    &[(EXCLUSIVE_C14N, CanonicalizationMethod::ExclusiveC14n)];

fn lookup<T: Copy>(table: &[(&str, T)], uri: &str) -> Result<T> {
    table
        .iter()
        .find(|(known, _)| *known == uri)
        .map(|(_, algorithm)| *algorithm)
        .ok_or_else(|| Error::UnsupportedAlgorithm(uri.to_string()))
}

/// `DigestMethod` of a `Reference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestMethod {
    Sha256,
}

impl DigestMethod {
    pub fn from_uri(uri: &str) -> Result<Self> {
        lookup(DIGEST_METHODS, uri)
    }

    pub fn uri(&self) -> &'static str {
        match self {
            DigestMethod::Sha256 => SHA256,
        }
    }

    pub fn hash_alg(&self) -> HashAlg {
        match self {
            DigestMethod::Sha256 => HashAlg::Sha256,
        }
    }

    /// Digest the canonical bytes of a reference.
    pub fn digest(&self, data: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        Ok(self.hash_alg().hash(data)?)
    }
}

/// `SignatureMethod` of `SignedInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMethod {
    RsaSha256,
}

impl SignatureMethod {
    pub fn from_uri(uri: &str) -> Result<Self> {
        lookup(SIGNATURE_METHODS, uri)
    }

    pub fn uri(&self) -> &'static str {
        match self {
            SignatureMethod::RsaSha256 => RSA_SHA256,
        }
    }

    /// Hash applied to the canonical `SignedInfo` before the RSA operation.
    pub fn hash_alg(&self) -> HashAlg {
        match self {
            SignatureMethod::RsaSha256 => HashAlg::Sha256,
        }
    }
}

/// `CanonicalizationMethod` of `SignedInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalizationMethod {
    ExclusiveC14n,
}

impl CanonicalizationMethod {
    pub fn from_uri(uri: &str) -> Result<Self> {
        lookup(CANONICALIZATION_METHODS, uri)
    }

    pub fn uri(&self) -> &'static str {
        match self {
            CanonicalizationMethod::ExclusiveC14n => EXCLUSIVE_C14N,
        }
    }
}

/// One step of a reference's transform chain. Order matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformKind {
    /// Removes the enclosing `Signature` element.
    Enveloped,
    /// Exclusive C14N; the prefixes are treated as if visibly utilized.
    ExclusiveC14n { inclusive_prefixes: Vec<String> },
}

impl TransformKind {
    /// Build a transform from its `Algorithm` URI and the `PrefixList` of
    /// an `InclusiveNamespaces` child, if any.
    pub fn from_uri(uri: &str, inclusive_prefixes: Vec<String>) -> Result<Self> {
        match uri {
            ENVELOPED_SIGNATURE => Ok(TransformKind::Enveloped),
            EXCLUSIVE_C14N => Ok(TransformKind::ExclusiveC14n { inclusive_prefixes }),
            _ => Err(Error::UnsupportedAlgorithm(uri.to_string())),
        }
    }

    pub fn uri(&self) -> &'static str {
        match self {
            TransformKind::Enveloped => ENVELOPED_SIGNATURE,
            TransformKind::ExclusiveC14n { .. } => EXCLUSIVE_C14N,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_uris_resolve() {
        assert_eq!(DigestMethod::from_uri(SHA256).unwrap(), DigestMethod::Sha256);
        assert_eq!(
            SignatureMethod::from_uri(RSA_SHA256).unwrap(),
            SignatureMethod::RsaSha256
        );
        assert_eq!(
            CanonicalizationMethod::from_uri(EXCLUSIVE_C14N).unwrap(),
            CanonicalizationMethod::ExclusiveC14n
        );
        assert_eq!(
            TransformKind::from_uri(ENVELOPED_SIGNATURE, Vec::new()).unwrap(),
            TransformKind::Enveloped
        );
    }

    #[test]
    fn test_uri_roundtrip() {
        assert_eq!(DigestMethod::Sha256.uri(), SHA256);
        assert_eq!(SignatureMethod::RsaSha256.uri(), RSA_SHA256);
        assert_eq!(CanonicalizationMethod::ExclusiveC14n.uri(), EXCLUSIVE_C14N);
        let transform = TransformKind::ExclusiveC14n {
            inclusive_prefixes: vec!["ds".into()],
        };
        assert_eq!(transform.uri(), EXCLUSIVE_C14N);
    }

    #[test]
    fn test_unknown_uris_rejected() {
        let sha1 = "http://www.w3.org/2000/09/xmldsig#sha1";
        assert!(matches!(
            DigestMethod::from_uri(sha1),
            Err(Error::UnsupportedAlgorithm(uri)) if uri == sha1
        ));
        assert!(matches!(
            SignatureMethod::from_uri("http://www.w3.org/2000/09/xmldsig#rsa-sha1"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            CanonicalizationMethod::from_uri(INCLUSIVE_C14N),
            Err(Error::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            TransformKind::from_uri("http://www.w3.org/TR/1999/REC-xpath-19991116", Vec::new()),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_digest_known_answer() {
        use base64::Engine;
        use base64::engine::general_purpose::STANDARD;

        let digest = DigestMethod::Sha256
            .digest("<root><child>hello</child></root>")
            .unwrap();
        assert_eq!(
            STANDARD.encode(digest),
            "FRT784cec8/D2MJPKenvuKdqflCPa5DV+njPCNurcFk="
        );
    }
}
