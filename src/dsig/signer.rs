use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use tracing::{debug, info, instrument};

use crate::c14n;
use crate::crypto::rsa;
use crate::keys::KeyMaterial;
use crate::xml::{self, XmlDocument};

use super::algorithms::{CanonicalizationMethod, DigestMethod, SignatureMethod};
use super::types::{KeyInfo, Reference, Signature, SignedInfo};
use super::{Error, Result, codec, ns, transforms};

/// Add an enveloped RSA-SHA256 signature covering the whole document.
///
/// The `Signature` element is appended as the last child of the document
/// element and carries the signer's certificate in `KeyInfo`. Documents that
/// already contain an XMLDSig `Signature` are refused, since the result
/// could not be verified.
#[instrument(skip_all)]
pub fn sign(document: &[u8], key: &KeyMaterial) -> Result<Vec<u8>> {
    let mut doc = XmlDocument::parse(document)?;
    let root = doc
        .document_element()
        .ok_or_else(|| xml::Error::Structure("document has no root element".into()))?;

    let existing = doc.find_elements(ns::DS, "Signature").len();
    if existing > 0 {
        return Err(Error::MultipleSignatures(existing + 1));
    }

    let mut reference = Reference::enveloped(DigestMethod::Sha256);
    let canonical = transforms::apply(&doc, None, &reference.transforms)?;
    reference.digest_value = reference.digest_method.digest(&canonical)?;
    debug!(digest = %BASE64.encode(&reference.digest_value), "Computed reference digest");

    let signature_method = SignatureMethod::RsaSha256;
    let signature = Signature {
        signed_info: SignedInfo {
            canonicalization_method: CanonicalizationMethod::ExclusiveC14n,
            inclusive_prefixes: Vec::new(),
            signature_method,
            references: vec![reference],
        },
        signature_value: Vec::new(),
        key_info: KeyInfo {
            certificate: key.certificate().der().to_vec(),
        },
    };

    let fragment = codec::encode(&signature)?;
    let fragment_root = fragment
        .document_element()
        .ok_or_else(|| Error::MalformedSignature("empty Signature fragment".into()))?;
    let signature_node = doc.import(&fragment, fragment_root);
    doc.append_child(root, signature_node);

    let signed_info = doc
        .first_child_element(signature_node, ns::DS, "SignedInfo")
        .ok_or_else(|| Error::MalformedSignature("missing SignedInfo in Signature".into()))?;
    let signature_value = doc
        .first_child_element(signature_node, ns::DS, "SignatureValue")
        .ok_or_else(|| Error::MalformedSignature("missing SignatureValue in Signature".into()))?;

    // SignedInfo is canonicalized where it sits, inheriting the Signature's
    // default namespace.
    let canonical_signed_info = c14n::canonicalize(&doc, signed_info, None);
    debug!(len = canonical_signed_info.len(), "Canonicalized SignedInfo");

    let value = rsa::sign(
        key.private_key(),
        &canonical_signed_info,
        signature_method.hash_alg(),
    )?;
    doc.set_text(signature_value, BASE64.encode(value.as_bytes()));

    info!(
        subject = key.certificate().subject(),
        "Successfully signed document"
    );
    Ok(doc.to_bytes()?)
}
