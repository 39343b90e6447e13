//! Conversion between [`Signature`] and its XML representation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::xml::{NodeId, XmlDocument};

use super::algorithms::{
    CanonicalizationMethod, DigestMethod, EXCLUSIVE_C14N, SignatureMethod, TransformKind,
};
use super::types::{KeyInfo, Reference, Signature, SignedInfo};
use super::{Error, Result, ns};

#[derive(Debug, Serialize)]
struct AlgorithmElement {
    #[serde(rename = "@Algorithm")]
    algorithm: &'static str,
}

#[derive(Debug, Serialize)]
struct TransformsElement {
    #[serde(rename = "Transform")]
    transforms: Vec<AlgorithmElement>,
}

#[derive(Debug, Serialize)]
struct ReferenceElement {
    #[serde(rename = "@URI")]
    uri: String,
    #[serde(rename = "Transforms")]
    transforms: TransformsElement,
    #[serde(rename = "DigestMethod")]
    digest_method: AlgorithmElement,
    #[serde(rename = "DigestValue")]
    digest_value: String,
}

#[derive(Debug, Serialize)]
struct SignedInfoElement {
    #[serde(rename = "CanonicalizationMethod")]
    canonicalization_method: AlgorithmElement,
    #[serde(rename = "SignatureMethod")]
    signature_method: AlgorithmElement,
    #[serde(rename = "Reference")]
    references: Vec<ReferenceElement>,
}

#[derive(Debug, Serialize)]
struct X509DataElement {
    #[serde(rename = "X509Certificate")]
    certificate: String,
}

#[derive(Debug, Serialize)]
struct KeyInfoElement {
    #[serde(rename = "X509Data")]
    x509_data: X509DataElement,
}

#[derive(Debug, Serialize)]
struct SignatureElement {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "SignedInfo")]
    signed_info: SignedInfoElement,
    #[serde(rename = "SignatureValue")]
    signature_value: String,
    #[serde(rename = "KeyInfo")]
    key_info: KeyInfoElement,
}

impl From<&Reference> for ReferenceElement {
    fn from(reference: &Reference) -> Self {
        Self {
            uri: reference.uri.clone(),
            transforms: TransformsElement {
                transforms: reference
                    .transforms
                    .iter()
                    .map(|transform| AlgorithmElement {
                        algorithm: transform.uri(),
                    })
                    .collect(),
            },
            digest_method: AlgorithmElement {
                algorithm: reference.digest_method.uri(),
            },
            digest_value: STANDARD.encode(&reference.digest_value),
        }
    }
}

impl From<&Signature> for SignatureElement {
    fn from(signature: &Signature) -> Self {
        let signed_info = &signature.signed_info;
        Self {
            xmlns: ns::DS,
            signed_info: SignedInfoElement {
                canonicalization_method: AlgorithmElement {
                    algorithm: signed_info.canonicalization_method.uri(),
                },
                signature_method: AlgorithmElement {
                    algorithm: signed_info.signature_method.uri(),
                },
                references: signed_info.references.iter().map(Into::into).collect(),
            },
            signature_value: STANDARD.encode(&signature.signature_value),
            key_info: KeyInfoElement {
                x509_data: X509DataElement {
                    certificate: STANDARD.encode(&signature.key_info.certificate),
                },
            },
        }
    }
}

/// Serialize `signature` into a standalone document whose element is the
/// `Signature` in the XMLDSig default namespace.
pub(crate) fn encode(signature: &Signature) -> Result<XmlDocument> {
    let xml = quick_xml::se::to_string_with_root("Signature", &SignatureElement::from(signature))?;
    Ok(XmlDocument::parse(xml)?)
}

/// The single XMLDSig `Signature` element of `doc`.
pub(crate) fn locate_signature(doc: &XmlDocument) -> Result<NodeId> {
    match doc.find_elements(ns::DS, "Signature").as_slice() {
        [] => Err(Error::MissingSignature),
        [signature] => Ok(*signature),
        many => Err(Error::MultipleSignatures(many.len())),
    }
}

/// A `Signature` read from a document, along with where it sits.
#[derive(Debug)]
pub(crate) struct ParsedSignature {
    pub signature: Signature,
    pub signed_info_node: NodeId,
}

pub(crate) fn decode(doc: &XmlDocument, node: NodeId) -> Result<ParsedSignature> {
    let signed_info_node = required_child(doc, node, "SignedInfo")?;
    let canonicalization = required_child(doc, signed_info_node, "CanonicalizationMethod")?;
    let canonicalization_method = CanonicalizationMethod::from_uri(algorithm(doc, canonicalization)?)?;
    let signature_method = SignatureMethod::from_uri(algorithm(
        doc,
        required_child(doc, signed_info_node, "SignatureMethod")?,
    )?)?;

    let references = match doc.child_elements(signed_info_node, ns::DS, "Reference").as_slice() {
        [reference] => vec![decode_reference(doc, *reference)?],
        other => {
            return Err(Error::MalformedSignature(format!(
                "expected exactly one Reference, found {}",
                other.len()
            )));
        }
    };

    let signature_value = decode_base64(doc, required_child(doc, node, "SignatureValue")?)?;

    let key_info = required_child(doc, node, "KeyInfo")?;
    let x509_data = required_child(doc, key_info, "X509Data")?;
    let certificate = decode_base64(doc, required_child(doc, x509_data, "X509Certificate")?)?;

    Ok(ParsedSignature {
        signature: Signature {
            signed_info: SignedInfo {
                canonicalization_method,
                inclusive_prefixes: inclusive_prefixes(doc, canonicalization),
                signature_method,
                references,
            },
            signature_value,
            key_info: KeyInfo { certificate },
        },
        signed_info_node,
    })
}

fn decode_reference(doc: &XmlDocument, node: NodeId) -> Result<Reference> {
    let uri = doc
        .element(node)
        .and_then(|element| element.attribute("URI"))
        .ok_or_else(|| Error::MalformedSignature("Reference has no URI attribute".into()))?;
    if !uri.is_empty() {
        return Err(Error::MalformedSignature(format!(
            "only same-document references with URI=\"\" are supported, found \"{uri}\""
        )));
    }

    let mut transforms = Vec::new();
    if let Some(container) = doc.first_child_element(node, ns::DS, "Transforms") {
        for transform in doc.child_elements(container, ns::DS, "Transform") {
            transforms.push(TransformKind::from_uri(
                algorithm(doc, transform)?,
                inclusive_prefixes(doc, transform),
            )?);
        }
    }

    let digest_method =
        DigestMethod::from_uri(algorithm(doc, required_child(doc, node, "DigestMethod")?)?)?;
    let digest_value = decode_base64(doc, required_child(doc, node, "DigestValue")?)?;

    Ok(Reference {
        uri: uri.to_string(),
        transforms,
        digest_method,
        digest_value,
    })
}

fn required_child(doc: &XmlDocument, parent: NodeId, local_name: &str) -> Result<NodeId> {
    doc.first_child_element(parent, ns::DS, local_name).ok_or_else(|| {
        let parent_name = doc
            .element(parent)
            .map(|element| element.name.local.as_str())
            .unwrap_or_default();
        Error::MalformedSignature(format!("missing {local_name} in {parent_name}"))
    })
}

fn algorithm(doc: &XmlDocument, node: NodeId) -> Result<&str> {
    let element = doc
        .element(node)
        .ok_or_else(|| Error::MalformedSignature("expected an element".into()))?;
    element.attribute("Algorithm").ok_or_else(|| {
        Error::MalformedSignature(format!("{} has no Algorithm attribute", element.name.local))
    })
}

/// Tokens of an `InclusiveNamespaces/@PrefixList` below `node`.
fn inclusive_prefixes(doc: &XmlDocument, node: NodeId) -> Vec<String> {
    doc.first_child_element(node, EXCLUSIVE_C14N, "InclusiveNamespaces")
        .and_then(|id| doc.element(id))
        .and_then(|element| element.attribute("PrefixList"))
        .map(|list| list.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn decode_base64(doc: &XmlDocument, node: NodeId) -> Result<Vec<u8>> {
    let text: String = doc.text(node).split_whitespace().collect();
    Ok(STANDARD.decode(text)?)
}
