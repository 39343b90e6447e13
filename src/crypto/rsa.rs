use crate::crypto::HashAlg;
use crate::crypto::errors::{CryptoResult, Error};
use openssl::hash::MessageDigest;
use openssl::pkey::{HasPublic, Id, PKey, Private, Public};
use openssl::rsa::Padding;
use openssl::sign::{Signer, Verifier};
use std::fmt;

/// RSA key sizes supported by the system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaKeySize {
    /// 2048-bit RSA key
    Rsa2048,
    /// 3072-bit RSA key
    Rsa3072,
    /// 4096-bit RSA key
    Rsa4096,
}

impl RsaKeySize {
    /// Get the key size in bits
    pub fn bits(&self) -> u32 {
        match self {
            RsaKeySize::Rsa2048 => 2048,
            RsaKeySize::Rsa3072 => 3072,
            RsaKeySize::Rsa4096 => 4096,
        }
    }

    /// Get the key size in bytes
    pub fn bytes(&self) -> usize {
        self.bits() as usize / 8
    }
}

impl TryFrom<u32> for RsaKeySize {
    type Error = Error;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            2048 => Ok(Self::Rsa2048),
            3072 => Ok(Self::Rsa3072),
            4096 => Ok(Self::Rsa4096),
            _ => Err(Error::Invalid(format!("Unsupported RSA key size: {bits} bits"))),
        }
    }
}

fn key_size_of<T: HasPublic>(key: &PKey<T>) -> CryptoResult<RsaKeySize> {
    if key.id() != Id::RSA {
        return Err(Error::Invalid(format!("Expected an RSA key, found {:?}", key.id())));
    }
    RsaKeySize::try_from(key.bits())
}

/// Represents an RSA signature
#[derive(Clone)]
pub struct RsaSignature {
    key_size: RsaKeySize,
    data: Vec<u8>,
}

impl RsaSignature {
    /// Create a new RSA signature
    pub fn new(key_size: RsaKeySize, data: impl Into<Vec<u8>>) -> Self {
        Self {
            key_size,
            data: data.into(),
        }
    }

    /// Get the key size used for this signature
    pub fn key_size(&self) -> RsaKeySize {
        self.key_size
    }

    /// Get the signature data as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Convert signature to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(&self.data)
    }

    /// Get the signature length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if signature is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for RsaSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaSignature")
            .field("key_size", &self.key_size)
            .field("size", &self.len())
            .field("hex", &self.to_hex())
            .finish()
    }
}

/// RSA private key wrapper
#[derive(Debug, Clone)]
pub struct RsaPrivateKey {
    key: PKey<Private>,
    key_size: RsaKeySize,
}

impl RsaPrivateKey {
    /// Load from PEM-encoded PKCS#1/PKCS#8.
    pub fn from_pem(pem_bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let key = PKey::private_key_from_pem(pem_bytes.as_ref())?;
        Self::from_pkey(key)
    }

    /// Load from DER-encoded PKCS#1/PKCS#8.
    pub fn from_der(der_bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let key = PKey::private_key_from_der(der_bytes.as_ref())?;
        Self::from_pkey(key)
    }

    /// Wrap an already loaded OpenSSL key, e.g. one taken out of a PKCS#12 container.
    pub fn from_pkey(key: PKey<Private>) -> CryptoResult<Self> {
        let key_size = key_size_of(&key)?;
        Ok(Self { key, key_size })
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> CryptoResult<RsaPublicKey> {
        RsaPublicKey::from_der(self.key.public_key_to_der()?)
    }

    /// Get the key size
    pub fn key_size(&self) -> RsaKeySize {
        self.key_size
    }

    /// Whether `public_key` is the public half of this key
    pub fn matches(&self, public_key: &RsaPublicKey) -> bool {
        self.key.public_eq(public_key.pkey())
    }

    /// Get the underlying OpenSSL private key
    pub(crate) fn pkey(&self) -> &PKey<Private> {
        &self.key
    }
}

/// RSA public key wrapper
#[derive(Debug, Clone)]
pub struct RsaPublicKey {
    key: PKey<Public>,
    key_size: RsaKeySize,
}

impl RsaPublicKey {
    /// Load from a DER-encoded SubjectPublicKeyInfo
    pub fn from_der(der_bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let key = PKey::public_key_from_der(der_bytes.as_ref())?;
        let key_size = key_size_of(&key)?;
        Ok(Self { key, key_size })
    }

    /// Get the key size
    pub fn key_size(&self) -> RsaKeySize {
        self.key_size
    }

    /// Get the underlying OpenSSL public key
    pub(crate) fn pkey(&self) -> &PKey<Public> {
        &self.key
    }
}

/// Sign data using RSA PKCS#1 v1.5; `data` is hashed with `hash_alg` first
pub fn sign(
    private_key: &RsaPrivateKey,
    data: impl AsRef<[u8]>,
    hash_alg: HashAlg,
) -> CryptoResult<RsaSignature> {
    let mut signer = Signer::new(MessageDigest::from(&hash_alg), private_key.pkey())?;
    signer.set_rsa_padding(Padding::PKCS1)?;
    let signature_data = signer.sign_oneshot_to_vec(data.as_ref())?;

    Ok(RsaSignature::new(private_key.key_size(), signature_data))
}

/// Verify RSA PKCS#1 v1.5 signature over `data`
pub fn verify(
    public_key: &RsaPublicKey,
    data: impl AsRef<[u8]>,
    signature: &RsaSignature,
    hash_alg: HashAlg,
) -> CryptoResult<bool> {
    if public_key.key_size() != signature.key_size()
        || signature.len() != public_key.key_size().bytes()
    {
        return Err(Error::Invalid(
            "Signature key size does not match key size".to_string(),
        ));
    }

    let mut verifier = Verifier::new(MessageDigest::from(&hash_alg), public_key.pkey())?;
    verifier.set_rsa_padding(Padding::PKCS1)?;
    let result = verifier.verify_oneshot(signature.as_bytes(), data.as_ref())?;
    Ok(result)
}

#[cfg(test)]
impl RsaPrivateKey {
    pub(crate) fn generate(key_size: RsaKeySize) -> CryptoResult<Self> {
        let key = PKey::from_rsa(openssl::rsa::Rsa::generate(key_size.bits())?)?;
        Ok(Self { key, key_size })
    }

    pub(crate) fn to_der(&self) -> CryptoResult<Vec<u8>> {
        Ok(self.key.private_key_to_pkcs8()?)
    }

    pub(crate) fn to_pem(&self) -> CryptoResult<String> {
        Ok(String::from_utf8_lossy(&self.key.private_key_to_pem_pkcs8()?).into_owned())
    }
}
