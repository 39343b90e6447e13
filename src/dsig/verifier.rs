use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use tracing::{debug, info, instrument, warn};

use crate::c14n;
use crate::crypto::rsa::{self, RsaSignature};
use crate::keys::Certificate;
use crate::xml::XmlDocument;

use super::{Error, Result, codec, transforms};

/// Outcome of a successful verification.
#[derive(Debug, Clone)]
pub struct VerifiedSignature {
    certificate: Certificate,
    digest_value: Vec<u8>,
}

impl VerifiedSignature {
    /// The certificate taken from `KeyInfo`. It is not checked against any
    /// trust anchor.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn subject(&self) -> &str {
        self.certificate.subject()
    }

    /// Digest of the signed content as recorded in the reference.
    pub fn digest_value(&self) -> &[u8] {
        &self.digest_value
    }
}

/// Verify the single enveloped signature of `document`.
///
/// The reference digest is checked before the signature value, so content
/// tampering is reported as [`Error::ReferenceDigestMismatch`] and a
/// substituted key or corrupted `SignatureValue` as
/// [`Error::SignatureValueInvalid`].
#[instrument(skip_all)]
pub fn verify_signature(document: &[u8]) -> Result<VerifiedSignature> {
    let doc = XmlDocument::parse(document)?;
    let node = codec::locate_signature(&doc)?;
    let parsed = codec::decode(&doc, node)?;
    let signature = parsed.signature;

    let reference = signature
        .signed_info
        .references
        .first()
        .ok_or_else(|| Error::MalformedSignature("SignedInfo has no Reference".into()))?;

    let canonical = transforms::apply(&doc, Some(node), &reference.transforms)?;
    let digest = reference.digest_method.digest(&canonical)?;
    debug!(
        expected = %BASE64.encode(&reference.digest_value),
        actual = %BASE64.encode(&digest),
        "Computed reference digest"
    );
    if digest.len() != reference.digest_value.len()
        || !openssl::memcmp::eq(&digest, &reference.digest_value)
    {
        return Err(Error::ReferenceDigestMismatch);
    }

    let certificate = Certificate::from_der(&signature.key_info.certificate)?;

    let prefixes: Vec<&str> = signature
        .signed_info
        .inclusive_prefixes
        .iter()
        .map(String::as_str)
        .collect();
    let inclusive = (!prefixes.is_empty()).then_some(prefixes.as_slice());
    let canonical_signed_info = c14n::canonicalize(&doc, parsed.signed_info_node, inclusive);

    let public_key = certificate.public_key();
    let value = RsaSignature::new(public_key.key_size(), signature.signature_value.clone());
    match rsa::verify(
        public_key,
        &canonical_signed_info,
        &value,
        signature.signed_info.signature_method.hash_alg(),
    ) {
        Ok(true) => {}
        Ok(false) => return Err(Error::SignatureValueInvalid),
        Err(e) => {
            debug!("RSA verification error: {e}");
            return Err(Error::SignatureValueInvalid);
        }
    }

    info!(subject = certificate.subject(), "XML signature is valid");
    Ok(VerifiedSignature {
        certificate,
        digest_value: reference.digest_value.clone(),
    })
}

/// Like [`verify_signature`], collapsing every failure to `false`.
pub fn verify(document: &[u8]) -> bool {
    match verify_signature(document) {
        Ok(_) => true,
        Err(e) => {
            warn!("XML signature is NOT valid: {e}");
            false
        }
    }
}
