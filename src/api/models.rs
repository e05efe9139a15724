use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::labels;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageListResponse {
    #[serde(default)]
    messages: Option<Value>,
    next_page_token: Option<String>,
}

impl MessageListResponse {
    /// Keeps the continuation token even when the batch itself is unusable.
    pub fn into_page(self) -> MessagePage {
        let refs = self
            .messages
            .and_then(|messages| serde_json::from_value::<Vec<MessageRef>>(messages).ok())
            .unwrap_or_default();

        MessagePage {
            refs,
            next_page_token: self.next_page_token.filter(|token| !token.is_empty()),
        }
    }
}

/// One page of the inbox listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePage {
    pub refs: Vec<MessageRef>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResource {
    pub id: String,
    pub thread_id: Option<String>,
    #[serde(default)]
    pub label_ids: Vec<String>,
    pub payload: Option<MessagePart>,
}

impl MessageResource {
    /// First value of `name` among the top-level headers, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload.as_ref()?.header(name)
    }

    pub fn is_unread(&self) -> bool {
        self.label_ids.iter().any(|label| label == labels::UNREAD)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    pub mime_type: Option<String>,
    #[serde(default)]
    pub headers: Vec<MessageHeader>,
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Option<Vec<MessagePart>>,
}

impl MessagePart {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }

    pub fn attachment_id(&self) -> Option<&str> {
        self.body.as_ref()?.attachment_id.as_deref()
    }

    pub fn inline_data(&self) -> Option<&str> {
        self.body.as_ref()?.data.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    pub attachment_id: Option<String>,
    pub data: Option<String>,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentResponse {
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub id: String,
    pub thread_id: Option<String>,
    #[serde(default)]
    pub label_ids: Vec<String>,
}

impl SendResponse {
    pub fn is_unread(&self) -> bool {
        self.label_ids.iter().any(|label| label == labels::UNREAD)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelListResponse {
    #[serde(default)]
    pub labels: Vec<LabelResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelResource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyLabelsRequest {
    pub remove_label_ids: Vec<String>,
}

/// A file attached to an outgoing message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}
