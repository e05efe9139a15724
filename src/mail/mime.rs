use mailparse::{MailHeader, parse_content_type, parse_headers};
use serde::Serialize;

use crate::api::models::MessagePart;
use crate::error::{AppError, AppResult};
use crate::notices;

pub const TEXT_PLAIN: &str = "text/plain";
pub const MULTIPART_MIXED: &str = "multipart/mixed";
pub const MULTIPART_ENCRYPTED: &str = "multipart/encrypted";
pub const PGP_ENCRYPTED: &str = "application/pgp-encrypted";
pub const OCTET_STREAM: &str = "application/octet-stream";

const BASE64: &str = "base64";
const MAX_DEPTH: usize = 32;

/// Image types that can be shown inline as data URIs.
pub const SUPPORTED_IMAGE_TYPES: [&str; 6] = [
    "image/gif",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/bmp",
    "image/webp",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayKind {
    Text,
    Image,
    Unsupported,
    Error,
}

/// One renderable fragment of a decrypted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayNode {
    pub kind: DisplayKind,
    pub content: String,
    pub mime_type: String,
}

impl DisplayNode {
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(DisplayKind::Text, content, TEXT_PLAIN)
    }

    pub fn image(content: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::new(DisplayKind::Image, content, mime_type)
    }

    pub fn unsupported(content: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::new(DisplayKind::Unsupported, content, mime_type)
    }

    pub fn error(content: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::new(DisplayKind::Error, content, mime_type)
    }

    fn new(kind: DisplayKind, content: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            mime_type: mime_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeBody {
    Leaf(String),
    Multipart(Vec<MimeNode>),
    /// A part whose content could not be parsed, with the reason.
    Broken(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeNode {
    pub headers: Vec<(String, String)>,
    pub body: MimeBody,
}

impl MimeNode {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Lower-cased media type without parameters.
    pub fn content_type(&self) -> Option<String> {
        self.header("Content-Type")
            .map(|value| parse_content_type(value).mimetype.to_ascii_lowercase())
    }

    pub fn transfer_encoding(&self) -> Option<String> {
        self.header("Content-Transfer-Encoding")
            .map(|value| value.trim().to_ascii_lowercase())
    }
}

/// True when `raw` opens with a header block that declares a content type.
/// Anything else is a legacy plaintext body.
pub fn is_mime_formatted(raw: &str) -> bool {
    let trimmed = raw.trim();
    let Some(end) = header_block_end(trimmed) else {
        return false;
    };
    trimmed[..end].to_ascii_lowercase().contains("content-type:")
}

fn header_block_end(text: &str) -> Option<usize> {
    match (text.find("\n\n"), text.find("\n\r\n")) {
        (Some(lf), Some(crlf)) => Some(lf.min(crlf)),
        (lf, crlf) => lf.or(crlf),
    }
}

pub fn parse(raw: &str) -> AppResult<MimeNode> {
    parse_entity(raw, 0)
}

fn parse_entity(raw: &str, depth: usize) -> AppResult<MimeNode> {
    if depth > MAX_DEPTH {
        return Err(AppError::MimeParse("multipart nesting too deep".to_string()));
    }

    let (parsed, body_offset) =
        parse_headers(raw.as_bytes()).map_err(|err| AppError::MimeParse(err.to_string()))?;
    let headers = header_pairs(&parsed);
    let body = raw.get(body_offset..).unwrap_or_default();

    let boundary = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("Content-Type"))
        .map(|(_, value)| parse_content_type(value))
        .filter(|ctype| ctype.mimetype.to_ascii_lowercase().starts_with("multipart/"))
        .and_then(|ctype| ctype.params.get("boundary").cloned());

    let body = match boundary {
        Some(boundary) => MimeBody::Multipart(
            split_multipart(body, &boundary)?
                .into_iter()
                .map(|part| parse_child(part, depth + 1))
                .collect(),
        ),
        None => MimeBody::Leaf(body.to_string()),
    };

    Ok(MimeNode { headers, body })
}

/// Parses one multipart child. A child that fails to parse is kept as a
/// broken node so its siblings still render.
fn parse_child(raw: &str, depth: usize) -> MimeNode {
    parse_entity(raw, depth).unwrap_or_else(|err| {
        tracing::debug!(error = %err, "unparseable MIME part");
        let headers = parse_headers(raw.as_bytes())
            .map(|(parsed, _)| header_pairs(&parsed))
            .unwrap_or_default();
        MimeNode {
            headers,
            body: MimeBody::Broken(err.to_string()),
        }
    })
}

fn header_pairs(parsed: &[MailHeader<'_>]) -> Vec<(String, String)> {
    parsed
        .iter()
        .map(|header| (header.get_key(), header.get_value()))
        .collect()
}

/// Slices a multipart body into its parts without touching their bytes. The
/// line break before each delimiter belongs to the delimiter.
fn split_multipart<'a>(body: &'a str, boundary: &str) -> AppResult<Vec<&'a str>> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut part_start = None;
    let mut offset = 0;
    let mut closed = false;

    for line in body.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        let Some(rest) = line.trim_end().strip_prefix(delimiter.as_str()) else {
            continue;
        };
        if !rest.is_empty() && rest != "--" {
            continue;
        }

        if let Some(start) = part_start.take() {
            parts.push(strip_line_break(&body[start..line_start]));
        }
        if rest == "--" {
            closed = true;
            break;
        }
        part_start = Some(offset);
    }

    if !closed {
        if let Some(start) = part_start {
            parts.push(&body[start..]);
        }
    }

    if parts.is_empty() {
        return Err(AppError::MimeParse(format!(
            "no parts found for boundary \"{boundary}\""
        )));
    }

    Ok(parts)
}

fn strip_line_break(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}

/// Flattens a MIME tree into display nodes. A broken branch only yields its
/// own error or unsupported node.
pub fn walk(node: &MimeNode) -> Vec<DisplayNode> {
    let (Some(content_type), Some(encoding)) = (node.content_type(), node.transfer_encoding())
    else {
        return vec![DisplayNode::error(
            notices::mime_error(),
            node.content_type().unwrap_or_default(),
        )];
    };

    match (&node.body, content_type.as_str()) {
        (MimeBody::Broken(_), broken) => vec![DisplayNode::error(notices::mime_error(), broken)],
        (MimeBody::Leaf(text), TEXT_PLAIN) => vec![DisplayNode::text(text.as_str())],
        (MimeBody::Leaf(data), image) if SUPPORTED_IMAGE_TYPES.contains(&image) => {
            vec![image_node(data, image, &encoding)]
        }
        (MimeBody::Multipart(children), MULTIPART_MIXED) => children.iter().flat_map(walk).collect(),
        (_, other) => vec![DisplayNode::unsupported(
            notices::unsupported_content(&format!("({other})")),
            other,
        )],
    }
}

fn image_node(data: &str, mime_type: &str, encoding: &str) -> DisplayNode {
    if encoding != BASE64 {
        return DisplayNode::unsupported(
            notices::unsupported_content(&format!("Encoding type {encoding} not supported")),
            mime_type,
        );
    }

    if !is_valid_base64(data) {
        return DisplayNode::unsupported(
            notices::unsupported_content("Invalid base64 encoding"),
            mime_type,
        );
    }

    let payload = data.split_whitespace().collect::<String>();
    DisplayNode::image(format!("data:{mime_type};base64,{payload}"), mime_type)
}

fn is_valid_base64(data: &str) -> bool {
    !data.is_empty()
        && data.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '\r' | '\n' | '\t' | ' ')
        })
}

/// Turns decrypted plaintext into display nodes. Legacy (non-MIME) bodies
/// become a single text node.
pub fn render(plaintext: &str) -> AppResult<Vec<DisplayNode>> {
    if !is_mime_formatted(plaintext) {
        return Ok(vec![DisplayNode::text(plaintext)]);
    }
    Ok(walk(&parse(plaintext)?))
}

/// Anything that declares a media type, so provider parts and parsed MIME
/// nodes share one selection rule.
pub trait TypedPart {
    fn media_type(&self) -> Option<String>;
}

impl TypedPart for MimeNode {
    fn media_type(&self) -> Option<String> {
        self.content_type()
    }
}

impl TypedPart for MessagePart {
    fn media_type(&self) -> Option<String> {
        self.mime_type
            .as_deref()
            .map(|value| parse_content_type(value).mimetype.to_ascii_lowercase())
    }
}

/// Picks the payload half of a PGP/MIME pair: exactly two parts, one of
/// which is the `application/pgp-encrypted` control part.
pub fn select_encrypted_part<P: TypedPart>(parts: &[P]) -> Option<&P> {
    let [first, second] = parts else {
        return None;
    };

    let is_control = |part: &P| part.media_type().as_deref() == Some(PGP_ENCRYPTED);
    if is_control(first) {
        Some(second)
    } else if is_control(second) {
        Some(first)
    } else {
        None
    }
}
