use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use pgpmail::api::models::Attachment;
use pgpmail::mail::mime::{self, select_encrypted_part};
use pgpmail::mail::{DisplayKind, DisplayNode, Envelope, MimeBody, build_pgp_mime, build_plaintext_mime, encode_raw};

const ARMORED: &str = "-----BEGIN PGP MESSAGE-----\r\n\r\nhQEMA0Xs2z1kX\r\n=abcd\r\n-----END PGP MESSAGE-----";

fn envelope() -> Envelope {
    Envelope {
        from: Some("\"Alice\" <a@x.com>".to_string()),
        to: vec!["b@x.com".to_string(), "a@x.com".to_string()],
        subject: Some("Quarterly numbers".to_string()),
        in_reply_to: Some("<m1@x.com>".to_string()),
    }
}

#[test]
fn pgp_mime_document_yields_the_exact_ciphertext() {
    let document = build_pgp_mime(&envelope(), ARMORED, "preamble for old readers");

    let parsed = mime::parse(&document).expect("parse");
    assert_eq!(parsed.content_type().as_deref(), Some("multipart/encrypted"));
    assert_eq!(parsed.header("In-Reply-To"), Some("<m1@x.com>"));

    let MimeBody::Multipart(parts) = &parsed.body else {
        panic!("expected multipart body");
    };
    let payload = select_encrypted_part(parts).expect("payload part");
    assert_eq!(payload.body, MimeBody::Leaf(ARMORED.to_string()));
}

#[test]
fn plaintext_with_attachment_renders_text_then_image() {
    let png = Attachment {
        filename: "dot.png".to_string(),
        mime_type: "image/png".to_string(),
        data: vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a],
    };
    let document = build_plaintext_mime("see attached", &envelope(), &[png]);

    let nodes = mime::render(&document).expect("render");
    assert_eq!(nodes[0], DisplayNode::text("see attached"));
    assert_eq!(nodes[1].kind, DisplayKind::Image);
    assert!(nodes[1].content.starts_with("data:image/png;base64,"));
}

#[test]
fn unknown_attachment_types_are_not_shown() {
    let archive = Attachment {
        filename: "notes.zip".to_string(),
        mime_type: "application/zip".to_string(),
        data: b"PK".to_vec(),
    };
    let document = build_plaintext_mime("body", &envelope(), &[archive]);

    let nodes = mime::render(&document).expect("render");
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[1].kind, DisplayKind::Unsupported);
    assert!(nodes[1].content.contains("application/zip"));
}

#[test]
fn raw_encoding_is_url_safe_without_padding() {
    let raw = encode_raw("Subject: ??>\r\n\r\n?");
    assert!(!raw.contains('='));
    assert!(!raw.contains('+'));
    assert!(!raw.contains('/'));

    let decoded = URL_SAFE_NO_PAD.decode(raw).expect("decode");
    assert_eq!(decoded, b"Subject: ??>\r\n\r\n?");
}

#[test]
fn non_ascii_subject_is_encoded() {
    let mut envelope = envelope();
    envelope.subject = Some("Grüße".to_string());
    let document = build_plaintext_mime("hallo", &envelope, &[]);

    assert!(document.contains("Subject: =?UTF-8?B?"));
    assert!(!document.contains("Grüße"));
}
