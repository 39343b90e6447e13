use tracing::debug;

use crate::c14n;
use crate::xml::{NodeId, XmlDocument};

use super::algorithms::{INCLUSIVE_C14N, TransformKind};
use super::{Error, Result};

/// Run a same-document reference's transform chain and return the octets
/// to digest. `signature` is the enclosing `Signature` element, if the
/// document already holds one. The input document is never modified.
pub(crate) fn apply(
    doc: &XmlDocument,
    signature: Option<NodeId>,
    transforms: &[TransformKind],
) -> Result<Vec<u8>> {
    let mut working = doc.clone();
    let mut output: Option<Vec<u8>> = None;

    for transform in transforms {
        if output.is_some() {
            return Err(Error::MalformedSignature(format!(
                "transform {} follows canonicalization",
                transform.uri()
            )));
        }
        match transform {
            TransformKind::Enveloped => {
                if let Some(signature) = signature {
                    working.detach(signature);
                }
            }
            TransformKind::ExclusiveC14n { inclusive_prefixes } => {
                let prefixes: Vec<&str> = inclusive_prefixes.iter().map(String::as_str).collect();
                let inclusive = (!prefixes.is_empty()).then_some(prefixes.as_slice());
                output = Some(c14n::canonicalize(&working, working.root(), inclusive));
            }
        }
    }

    // A chain ending on a node-set would need inclusive C14N to produce octets.
    let output = output.ok_or_else(|| Error::UnsupportedAlgorithm(INCLUSIVE_C14N.to_string()))?;
    debug!(len = output.len(), "Canonicalized reference");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsig::ns;

    const SIGNED: &str = r#"<root a="1"><!-- c --><child>hello</child><Signature xmlns="http://www.w3.org/2000/09/xmldsig#"><SignedInfo/></Signature></root>"#;

    fn exc_c14n() -> TransformKind {
        TransformKind::ExclusiveC14n {
            inclusive_prefixes: Vec::new(),
        }
    }

    #[test]
    fn test_enveloped_then_c14n() {
        let doc = XmlDocument::parse(SIGNED).unwrap();
        let signature = doc.find_elements(ns::DS, "Signature")[0];

        let output = apply(&doc, Some(signature), &[TransformKind::Enveloped, exc_c14n()]).unwrap();
        assert_eq!(output, br#"<root a="1"><child>hello</child></root>"#);

        // Original document is untouched.
        assert_eq!(doc.find_elements(ns::DS, "Signature").len(), 1);
    }

    #[test]
    fn test_without_enveloped_signature_is_digested() {
        let doc = XmlDocument::parse(SIGNED).unwrap();
        let signature = doc.find_elements(ns::DS, "Signature")[0];

        let output = String::from_utf8(apply(&doc, Some(signature), &[exc_c14n()]).unwrap()).unwrap();
        assert!(output.contains("<Signature"));
    }

    #[test]
    fn test_chain_without_canonicalization_unsupported() {
        let doc = XmlDocument::parse(SIGNED).unwrap();
        let err = apply(&doc, None, &[TransformKind::Enveloped]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(uri) if uri == INCLUSIVE_C14N));
    }

    #[test]
    fn test_transform_after_canonicalization_rejected() {
        let doc = XmlDocument::parse(SIGNED).unwrap();
        let err = apply(&doc, None, &[exc_c14n(), TransformKind::Enveloped]).unwrap_err();
        assert!(matches!(err, Error::MalformedSignature(_)));
    }
}
