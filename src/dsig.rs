//! Enveloped XML signatures (XMLDSig) with RSA-SHA256.
//!
//! [`sign`] appends a `Signature` element as the last child of the document
//! element. Its single `Reference` has `URI=""`, the enveloped-signature
//! transform and exclusive canonicalization, so it covers the whole document
//! except the signature itself. The signer's certificate is embedded in
//! `KeyInfo/X509Data`.
//!
//! # Trust model
//!
//! [`verify`] and [`verify_signature`] check the signature with the public key
//! of the certificate found in `KeyInfo` and nothing else. Anyone can produce a
//! document that verifies by signing it with their own certificate. Callers
//! that need to know *who* signed must inspect
//! [`VerifiedSignature::certificate`] and decide whether to trust it.

pub mod algorithms;
mod codec;
mod error;
mod signer;
#[cfg(test)]
mod tests;
mod transforms;
mod types;
mod verifier;

pub use error::Error;
pub use signer::sign;
pub use types::{KeyInfo, Reference, Signature, SignedInfo};
pub use verifier::{VerifiedSignature, verify, verify_signature};

pub type Result<T> = std::result::Result<T, Error>;

// Namespaces
pub mod ns {
    pub const DS: &str = "http://www.w3.org/2000/09/xmldsig#";
}
