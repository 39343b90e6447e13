#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed XML: {0}")]
    MalformedXml(#[from] crate::xml::Error),

    #[error("No Signature was found in the document")]
    MissingSignature,

    #[error("More than one signature was found for the document ({0})")]
    MultipleSignatures(usize),

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Reference digest does not match the document")]
    ReferenceDigestMismatch,

    #[error("Signature value does not verify against the embedded certificate")]
    SignatureValueInvalid,

    #[error("Key material error: {0}")]
    KeyMaterial(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] crate::crypto::Error),

    #[error("Failed to serialize signature: {0}")]
    Serialize(#[from] quick_xml::SeError),
}

impl From<crate::keys::Error> for Error {
    fn from(err: crate::keys::Error) -> Self {
        Error::KeyMaterial(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::MalformedSignature(format!("invalid base64: {err}"))
    }
}
