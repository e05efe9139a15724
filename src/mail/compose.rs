use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use rand::Rng;

use crate::api::models::Attachment;

use super::mime::{MULTIPART_ENCRYPTED, MULTIPART_MIXED, OCTET_STREAM, PGP_ENCRYPTED, TEXT_PLAIN};

const BASE64_LINE_WIDTH: usize = 76;
const ENCODED_WORD_CHUNK: usize = 45;

/// Addressing shared by the plaintext and PGP/MIME documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub from: Option<String>,
    pub to: Vec<String>,
    pub subject: Option<String>,
    pub in_reply_to: Option<String>,
}

impl Envelope {
    fn headers(&self) -> Vec<String> {
        let mut headers = Vec::new();
        if let Some(from) = &self.from {
            headers.push(format!("From: {}", sanitize_header_value(from)));
        }
        if !self.to.is_empty() {
            let to = self
                .to
                .iter()
                .map(|address| sanitize_header_value(address))
                .collect::<Vec<_>>();
            headers.push(format!("To: {}", to.join(", ")));
        }
        if let Some(subject) = &self.subject {
            headers.push(format!("Subject: {}", sanitize_header_value(subject)));
        }
        if let Some(in_reply_to) = &self.in_reply_to {
            headers.push(format!("In-Reply-To: {}", strip_line_breaks(in_reply_to)));
        }
        headers.push("MIME-Version: 1.0".to_string());
        headers
    }
}

/// Builds the RFC822 document that gets encrypted. With attachments the
/// body becomes the first part of a `multipart/mixed` document.
pub fn build_plaintext_mime(body: &str, envelope: &Envelope, attachments: &[Attachment]) -> String {
    let mut headers = envelope.headers();

    if attachments.is_empty() {
        headers.extend(text_part_headers(body));
        return format!("{}\r\n\r\n{body}", headers.join("\r\n"));
    }

    let boundary = random_boundary();
    headers.push(format!(
        "Content-Type: {MULTIPART_MIXED}; boundary=\"{boundary}\""
    ));
    headers.push("Content-Transfer-Encoding: 7bit".to_string());

    let mut out = format!("{}\r\n\r\n", headers.join("\r\n"));
    out.push_str(&format!("--{boundary}\r\n"));
    out.push_str(&text_part_headers(body).join("\r\n"));
    out.push_str("\r\n\r\n");
    out.push_str(body);
    out.push_str("\r\n");

    for attachment in attachments {
        let filename = escape_filename(&attachment.filename);
        out.push_str(&format!("--{boundary}\r\n"));
        out.push_str(&format!(
            "Content-Type: {}; name=\"{filename}\"\r\n",
            attachment.mime_type
        ));
        out.push_str("Content-Transfer-Encoding: base64\r\n");
        out.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{filename}\"\r\n\r\n"
        ));
        out.push_str(&fold_base64_lines(&STANDARD.encode(&attachment.data)));
    }

    out.push_str(&format!("--{boundary}--\r\n"));
    out
}

/// Wraps armored ciphertext in a `multipart/encrypted` document. The preamble
/// is shown by readers without PGP/MIME support.
pub fn build_pgp_mime(envelope: &Envelope, ciphertext: &str, preamble: &str) -> String {
    let boundary = random_boundary();
    let mut headers = envelope.headers();
    headers.push(format!(
        "Content-Type: {MULTIPART_ENCRYPTED}; protocol=\"{PGP_ENCRYPTED}\"; boundary=\"{boundary}\""
    ));

    let mut out = format!("{}\r\n\r\n", headers.join("\r\n"));
    out.push_str(&strip_line_breaks(preamble));
    out.push_str("\r\n");
    out.push_str(&format!("--{boundary}\r\n"));
    out.push_str(&format!("Content-Type: {PGP_ENCRYPTED}\r\n"));
    out.push_str("Content-Description: PGP/MIME version identification\r\n\r\n");
    out.push_str("Version: 1\r\n");
    out.push_str(&format!("--{boundary}\r\n"));
    out.push_str(&format!(
        "Content-Type: {OCTET_STREAM}; name=\"encrypted.asc\"\r\n"
    ));
    out.push_str("Content-Description: OpenPGP encrypted message\r\n");
    out.push_str("Content-Disposition: inline; filename=\"encrypted.asc\"\r\n\r\n");
    out.push_str(ciphertext);
    out.push_str(&format!("\r\n--{boundary}--\r\n"));
    out
}

/// Formats `email` with an optional display name for a `From` header.
pub fn mailbox_address(name: Option<&str>, email: &str) -> String {
    match name {
        Some(name) if name.is_ascii() => {
            format!("\"{}\" <{email}>", strip_line_breaks(name).replace('"', ""))
        }
        Some(name) => format!("{} <{email}>", sanitize_header_value(name)),
        None => email.to_string(),
    }
}

/// Encodes a finished document for the provider's `raw` field.
pub fn encode_raw(document: &str) -> String {
    URL_SAFE_NO_PAD.encode(document.as_bytes())
}

/// Drops line breaks and turns non-ASCII text into RFC 2047 encoded words.
pub fn sanitize_header_value(value: &str) -> String {
    let value = strip_line_breaks(value);
    if value.is_ascii() {
        return value;
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in value.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_WORD_CHUNK {
            words.push(encoded_word(&chunk));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk));
    }
    words.join(" ")
}

fn encoded_word(text: &str) -> String {
    format!("=?UTF-8?B?{}?=", STANDARD.encode(text.as_bytes()))
}

fn strip_line_breaks(value: &str) -> String {
    value.replace(['\r', '\n'], "")
}

fn text_part_headers(body: &str) -> Vec<String> {
    let encoding = if body.is_ascii() { "7bit" } else { "8bit" };
    vec![
        format!("Content-Type: {TEXT_PLAIN}; charset=utf-8"),
        format!("Content-Transfer-Encoding: {encoding}"),
    ]
}

fn fold_base64_lines(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / BASE64_LINE_WIDTH * 2 + 2);
    let mut start = 0;
    while start < input.len() {
        let end = (start + BASE64_LINE_WIDTH).min(input.len());
        out.push_str(&input[start..end]);
        out.push_str("\r\n");
        start = end;
    }
    out
}

fn random_boundary() -> String {
    let mut bytes = [0_u8; 12];
    rand::thread_rng().fill(&mut bytes);
    format!("pgpmail-{}", URL_SAFE_NO_PAD.encode(bytes))
}

fn escape_filename(value: &str) -> String {
    strip_line_breaks(value).replace('"', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::mime::{self, DisplayKind, DisplayNode, MimeBody};

    fn envelope() -> Envelope {
        Envelope {
            from: Some("a@x.com".to_string()),
            to: vec!["b@x.com".to_string(), "c@x.com".to_string()],
            subject: Some("Hello".to_string()),
            in_reply_to: None,
        }
    }

    #[test]
    fn plaintext_document_is_mime_formatted() {
        let raw = build_plaintext_mime("hi there", &envelope(), &[]);

        assert!(raw.contains("To: b@x.com, c@x.com\r\n"));
        assert!(raw.contains("Content-Transfer-Encoding: 7bit\r\n"));
        assert!(mime::is_mime_formatted(&raw));
        assert_eq!(mime::render(&raw).expect("render"), vec![DisplayNode::text("hi there")]);
    }

    #[test]
    fn header_values_cannot_inject_headers() {
        let mut envelope = envelope();
        envelope.subject = Some("Hi\r\nBcc: evil@x.com".to_string());

        let raw = build_plaintext_mime("body", &envelope, &[]);
        assert!(raw.contains("Subject: HiBcc: evil@x.com\r\n"));
        assert!(!raw.contains("\r\nBcc:"));
    }

    #[test]
    fn non_ascii_subject_is_encoded() {
        let encoded = sanitize_header_value("Grüße");
        assert!(encoded.starts_with("=?UTF-8?B?"));
        assert!(encoded.is_ascii());
    }

    #[test]
    fn attachments_render_back_as_images() {
        let attachment = Attachment {
            filename: "dot.gif".to_string(),
            mime_type: "image/gif".to_string(),
            data: vec![0x47, 0x49, 0x46, 0x38, 0x39, 0x61],
        };

        let raw = build_plaintext_mime("see attached", &envelope(), &[attachment]);
        let nodes = mime::render(&raw).expect("render");

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0], DisplayNode::text("see attached"));
        assert_eq!(nodes[1].kind, DisplayKind::Image);
        assert_eq!(nodes[1].content, "data:image/gif;base64,R0lGODlh");
    }

    #[test]
    fn pgp_document_has_control_and_payload_parts() {
        let mut envelope = envelope();
        envelope.in_reply_to = Some("<m1@x.com>".to_string());

        let raw = build_pgp_mime(&envelope, "-----BEGIN PGP MESSAGE-----", "preamble");
        assert!(raw.contains("In-Reply-To: <m1@x.com>\r\n"));

        let root = mime::parse(&raw).expect("parse");
        assert_eq!(root.content_type().as_deref(), Some(MULTIPART_ENCRYPTED));
        let MimeBody::Multipart(parts) = &root.body else {
            panic!("expected multipart body");
        };
        assert_eq!(parts[0].body, MimeBody::Leaf("Version: 1".to_string()));
        assert_eq!(parts[1].content_type().as_deref(), Some(OCTET_STREAM));
    }

    #[test]
    fn display_name_is_quoted_or_encoded() {
        assert_eq!(mailbox_address(None, "a@x.com"), "a@x.com");
        assert_eq!(
            mailbox_address(Some("Alice A"), "a@x.com"),
            "\"Alice A\" <a@x.com>"
        );
        assert!(mailbox_address(Some("Zoë"), "a@x.com").starts_with("=?UTF-8?B?"));
    }

    #[test]
    fn folds_base64_at_76_columns() {
        let folded = fold_base64_lines(&"A".repeat(100));
        let lines = folded.split("\r\n").collect::<Vec<_>>();
        assert_eq!(lines[0].len(), 76);
        assert_eq!(lines[1].len(), 24);
    }
}
