use std::sync::OnceLock;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::dsig::*;
use crate::keys::KeyMaterial;
use crate::keys::fixtures::key_material;
use crate::xml::XmlDocument;

const HELLO: &str = "<root><child>hello</child></root>";

fn signer() -> &'static KeyMaterial {
    static KEY: OnceLock<KeyMaterial> = OnceLock::new();
    KEY.get_or_init(|| key_material("Test Signer"))
}

fn sign_str(xml: &str) -> String {
    String::from_utf8(sign(xml.as_bytes(), signer()).unwrap()).unwrap()
}

fn element_text<'a>(xml: &'a str, name: &str) -> &'a str {
    let open = format!("<{name}>");
    let start = xml.find(&open).unwrap() + open.len();
    let end = start + xml[start..].find(&format!("</{name}>")).unwrap();
    &xml[start..end]
}

#[test]
fn test_sign_concrete_document() {
    let signed = sign_str(HELLO);

    let doc = XmlDocument::parse(&signed).unwrap();
    let root = doc.document_element().unwrap();
    let last = doc.children(root).last().unwrap();
    assert!(doc.is_element(last, ns::DS, "Signature"));

    assert_eq!(
        element_text(&signed, "DigestValue"),
        "FRT784cec8/D2MJPKenvuKdqflCPa5DV+njPCNurcFk="
    );
    assert!(signed.starts_with("<root><child>hello</child><Signature xmlns=\"http://www.w3.org/2000/09/xmldsig#\">"));
    assert!(signed.contains(algorithms::EXCLUSIVE_C14N));
    assert!(signed.contains(algorithms::ENVELOPED_SIGNATURE));
    assert!(signed.contains(algorithms::SHA256));
    assert!(signed.contains(algorithms::RSA_SHA256));

    assert!(verify(signed.as_bytes()));
    let verified = verify_signature(signed.as_bytes()).unwrap();
    assert_eq!(verified.subject(), "CN=Test Signer");
    assert_eq!(
        BASE64.encode(verified.digest_value()),
        "FRT784cec8/D2MJPKenvuKdqflCPa5DV+njPCNurcFk="
    );
}

#[test]
fn test_signature_value_matches_key_size() {
    let signed = sign_str(HELLO);
    let value = BASE64.decode(element_text(&signed, "SignatureValue")).unwrap();
    assert_eq!(value.len(), 256);

    let certificate = BASE64.decode(element_text(&signed, "X509Certificate")).unwrap();
    assert_eq!(certificate, signer().certificate().der());
}

#[test]
fn test_tampered_text_detected() {
    let signed = sign_str(HELLO).replace("hello", "hellp");

    assert!(!verify(signed.as_bytes()));
    assert!(matches!(
        verify_signature(signed.as_bytes()),
        Err(Error::ReferenceDigestMismatch)
    ));
}

#[test]
fn test_tampered_attribute_detected() {
    let signed = sign_str(r#"<order id="42"><item sku="A-1" qty="1"/></order>"#);
    assert!(verify(signed.as_bytes()));

    let tampered = signed.replace(r#"qty="1""#, r#"qty="9""#);
    assert!(matches!(
        verify_signature(tampered.as_bytes()),
        Err(Error::ReferenceDigestMismatch)
    ));
}

#[test]
fn test_tampered_whitespace_detected() {
    let signed = sign_str(HELLO);
    let tampered = signed.replacen("<root><child>", "<root>\n  <child>", 1);

    assert!(matches!(
        verify_signature(tampered.as_bytes()),
        Err(Error::ReferenceDigestMismatch)
    ));
}

#[test]
fn test_changes_outside_signed_content_ignored() {
    let signed = sign_str(HELLO);

    // The XML declaration and whitespace around the root are not part of the
    // canonical form.
    let with_prolog = format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{signed}\n");
    assert!(verify(with_prolog.as_bytes()));

    // Neither is whitespace inside Signature but outside SignedInfo.
    let reformatted = signed.replace("<SignatureValue>", "\n  <SignatureValue>");
    assert!(verify(reformatted.as_bytes()));
}

#[test]
fn test_substituted_certificate_detected() {
    let signed = sign_str(HELLO);
    let other = key_material("Impostor");

    let original = element_text(&signed, "X509Certificate").to_string();
    let substituted = signed.replace(&original, &BASE64.encode(other.certificate().der()));

    assert!(matches!(
        verify_signature(substituted.as_bytes()),
        Err(Error::SignatureValueInvalid)
    ));
}

#[test]
fn test_transplanted_signature_value_detected() {
    let first = sign_str(HELLO);
    let second = sign_str("<root><child>other</child></root>");

    let forged = first.replace(
        element_text(&first, "SignatureValue"),
        element_text(&second, "SignatureValue"),
    );
    assert!(matches!(
        verify_signature(forged.as_bytes()),
        Err(Error::SignatureValueInvalid)
    ));
}

#[test]
fn test_missing_and_multiple_signatures_distinct() {
    assert!(matches!(
        verify_signature(HELLO.as_bytes()),
        Err(Error::MissingSignature)
    ));
    assert!(!verify(HELLO.as_bytes()));

    let first = sign_str("<a>1</a>");
    let second = sign_str("<b>2</b>");
    let combined = format!("<outer>{first}{second}</outer>");
    assert!(matches!(
        verify_signature(combined.as_bytes()),
        Err(Error::MultipleSignatures(2))
    ));
}

#[test]
fn test_unsupported_algorithms_rejected() {
    let signed = sign_str(HELLO);

    let cases = [
        (algorithms::SHA256, "http://www.w3.org/2000/09/xmldsig#sha1"),
        (
            algorithms::RSA_SHA256,
            "http://www.w3.org/2000/09/xmldsig#rsa-sha1",
        ),
        (
            algorithms::ENVELOPED_SIGNATURE,
            "http://www.w3.org/TR/1999/REC-xpath-19991116",
        ),
    ];
    for (known, unknown) in cases {
        let altered = signed.replace(known, unknown);
        assert!(
            matches!(
                verify_signature(altered.as_bytes()),
                Err(Error::UnsupportedAlgorithm(uri)) if uri == unknown
            ),
            "{unknown} should be rejected"
        );
    }

    let inclusive = signed.replace(
        &format!(r#"<CanonicalizationMethod Algorithm="{}"/>"#, algorithms::EXCLUSIVE_C14N),
        &format!(r#"<CanonicalizationMethod Algorithm="{}"/>"#, algorithms::INCLUSIVE_C14N),
    );
    assert!(matches!(
        verify_signature(inclusive.as_bytes()),
        Err(Error::UnsupportedAlgorithm(uri)) if uri == algorithms::INCLUSIVE_C14N
    ));
}

#[test]
fn test_signing_signed_document_refused() {
    let signed = sign_str(HELLO);
    assert!(matches!(
        sign(signed.as_bytes(), signer()),
        Err(Error::MultipleSignatures(2))
    ));
}

#[test]
fn test_foreign_signature_element_ignored() {
    let xml = "<root><Signature>not xmldsig</Signature></root>";
    assert!(matches!(
        verify_signature(xml.as_bytes()),
        Err(Error::MissingSignature)
    ));

    let signed = sign_str(xml);
    assert!(verify(signed.as_bytes()));
}

#[test]
fn test_namespaced_document() {
    let xml = r#"<doc xmlns="urn:example" xmlns:x="urn:x" xmlns:unused="urn:unused"><x:item x:a="1" b="2">value</x:item><plain xmlns="">text</plain></doc>"#;
    let signed = sign_str(xml);
    assert!(verify(signed.as_bytes()));

    let tampered = signed.replace(r#"x:a="1""#, r#"x:a="2""#);
    assert!(!verify(tampered.as_bytes()));
}

#[test]
fn test_document_with_mixed_content() {
    let xml = "<?xml version=\"1.0\"?>\r\n<!-- header -->\r\n<root>\r\n  <?app hint?>\r\n  <a b=\"x&#9;y\">1 &lt; 2 &amp; 3</a>\r\n  <![CDATA[<raw>]]>\r\n  <!-- inner -->\r\n</root>";
    let signed = sign_str(xml);
    assert!(verify(signed.as_bytes()));

    let doc = XmlDocument::parse(&signed).unwrap();
    let root = doc.document_element().unwrap();
    assert!(doc.is_element(doc.children(root).last().unwrap(), ns::DS, "Signature"));
}

#[test]
fn test_malformed_input() {
    assert!(matches!(
        verify_signature(b"<root><unclosed></root>"),
        Err(Error::MalformedXml(_))
    ));
    assert!(matches!(
        sign(b"<root>", signer()),
        Err(Error::MalformedXml(_))
    ));
    assert!(!verify(b"not xml at all"));
}

#[test]
fn test_deeply_nested_input_rejected() {
    let nested = format!("{}{}", "<a>".repeat(100_000), "</a>".repeat(100_000));
    assert!(matches!(
        verify_signature(nested.as_bytes()),
        Err(Error::MalformedXml(_))
    ));
    assert!(matches!(
        sign(nested.as_bytes(), signer()),
        Err(Error::MalformedXml(_))
    ));
    assert!(!verify(nested.as_bytes()));
}

#[test]
fn test_nested_document_round_trip() {
    let depth = crate::xml::MAX_DEPTH - 1;
    let nested = format!("<root>{}x{}</root>", "<a>".repeat(depth - 1), "</a>".repeat(depth - 1));
    let signed = sign_str(&nested);
    assert!(verify(signed.as_bytes()));
}

#[test]
fn test_input_is_not_modified() {
    let input = HELLO.as_bytes().to_vec();
    let _ = sign(&input, signer()).unwrap();
    assert_eq!(input, HELLO.as_bytes());
}
