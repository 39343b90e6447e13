//! Enveloped XML digital signatures (XMLDSig).
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use xmldsig::{dsig, keys::KeyMaterial};
//!
//! let key = KeyMaterial::from_pkcs12(std::fs::read("signer.pfx")?, "password")?;
//! let signed = dsig::sign(b"<root><child>hello</child></root>", &key)?;
//! assert!(dsig::verify(&signed));
//! # Ok(())
//! # }
//! ```
//!
//! Verification trusts whatever certificate the document embeds; see
//! [`dsig`] before relying on it for authentication.

pub mod c14n;
pub mod config;
pub mod crypto;
pub mod dsig;
pub mod keys;
pub mod telemetry;
pub mod xml;
