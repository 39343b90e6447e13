use super::algorithms::{CanonicalizationMethod, DigestMethod, SignatureMethod, TransformKind};

/// A `Reference` in `SignedInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Empty for the whole enclosing document.
    pub uri: String,
    pub transforms: Vec<TransformKind>,
    pub digest_method: DigestMethod,
    pub digest_value: Vec<u8>,
}

impl Reference {
    /// Whole-document reference with the enveloped transform followed by
    /// exclusive canonicalization.
    pub fn enveloped(digest_method: DigestMethod) -> Self {
        Self {
            uri: String::new(),
            transforms: vec![
                TransformKind::Enveloped,
                TransformKind::ExclusiveC14n {
                    inclusive_prefixes: Vec::new(),
                },
            ],
            digest_method,
            digest_value: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInfo {
    pub canonicalization_method: CanonicalizationMethod,
    /// `PrefixList` of the canonicalization method, usually empty.
    pub inclusive_prefixes: Vec<String>,
    pub signature_method: SignatureMethod,
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// DER-encoded X.509 certificate.
    pub certificate: Vec<u8>,
}

/// A complete `Signature` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub signed_info: SignedInfo,
    pub signature_value: Vec<u8>,
    pub key_info: KeyInfo,
}
