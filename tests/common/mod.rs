#![allow(dead_code)]

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509, X509NameBuilder};
use xmldsig::keys::KeyMaterial;

pub const PFX_PASSWORD: &str = "test-password";

/// Self-signed RSA certificate for `common_name`.
pub fn self_signed(common_name: &str, bits: u32) -> (PKey<Private>, X509) {
    let pkey = PKey::from_rsa(Rsa::generate(bits).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    name.append_entry_by_text("O", "xmldsig tests").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&pkey).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(30).unwrap())
        .unwrap();
    builder.sign(&pkey, MessageDigest::sha256()).unwrap();

    (pkey, builder.build())
}

/// PKCS#12 container protected by [`PFX_PASSWORD`].
pub fn pfx(common_name: &str) -> Vec<u8> {
    let (pkey, cert) = self_signed(common_name, 2048);
    Pkcs12::builder()
        .name(common_name)
        .pkey(&pkey)
        .cert(&cert)
        .build2(PFX_PASSWORD)
        .unwrap()
        .to_der()
        .unwrap()
}

pub fn key_material(common_name: &str) -> KeyMaterial {
    KeyMaterial::from_pkcs12(pfx(common_name), PFX_PASSWORD).unwrap()
}
