#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};

use pgpmail::api::{ApiResponse, GmailClient, Transport};
use pgpmail::auth::{AuthGateway, TokenProvider};
use pgpmail::config::SessionOptions;
use pgpmail::contacts::Contacts;
use pgpmail::crypto::{Crypto, Decrypted, PrivateKey, PublicKey, VerifiedKey};
use pgpmail::error::{AppError, AppResult};
use pgpmail::sync::Session;

pub const OWNER: &str = "a@x.com";
pub const MESSAGES: &str = "/gmail/v1/users/me/messages";
pub const LABELS: &str = "/gmail/v1/users/me/labels";

#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub route: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub token: String,
}

/// Scripted transport. Responses queue per route; the last one repeats.
/// Unscripted routes answer 404.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<HashMap<String, VecDeque<ApiResponse>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, route: impl Into<String>, response: ApiResponse) {
        self.responses
            .lock()
            .unwrap()
            .entry(route.into())
            .or_default()
            .push_back(response);
    }

    pub fn ok(&self, route: impl Into<String>, data: Value) {
        self.respond(route, ApiResponse::ok(data));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, route: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.route == route)
            .collect()
    }

    fn answer(&self, call: Call) -> ApiResponse {
        let route = call.route.clone();
        self.calls.lock().unwrap().push(call);

        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(&route) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => ApiResponse::with_status(
                404,
                Some(json!({"error": {"code": 404, "message": "Requested entity was not found."}})),
            ),
        }
    }
}

fn route(endpoint: &str, query: &[(String, String)]) -> String {
    if query.iter().any(|(key, value)| key == "format" && value == "metadata") {
        format!("{endpoint}?metadata")
    } else {
        endpoint.to_string()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(
        &self,
        endpoint: &str,
        query: &[(String, String)],
        access_token: &str,
    ) -> AppResult<ApiResponse> {
        Ok(self.answer(Call {
            method: "GET",
            route: route(endpoint, query),
            query: query.to_vec(),
            body: None,
            token: access_token.to_string(),
        }))
    }

    async fn post(&self, endpoint: &str, body: &Value, access_token: &str) -> AppResult<ApiResponse> {
        Ok(self.answer(Call {
            method: "POST",
            route: endpoint.to_string(),
            query: Vec::new(),
            body: Some(body.clone()),
            token: access_token.to_string(),
        }))
    }
}

/// Mints `token-1`, `token-2`, ... and remembers what was dropped.
#[derive(Default)]
pub struct FakeTokenProvider {
    minted: AtomicUsize,
    pub removed: Mutex<Vec<String>>,
}

#[async_trait]
impl TokenProvider for FakeTokenProvider {
    async fn fetch_token(&self, _interactive: bool, _scope: Option<&str>) -> AppResult<Option<String>> {
        let next = self.minted.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Some(format!("token-{next}")))
    }

    async fn remove_cached_token(&self, token: &str) -> AppResult<()> {
        self.removed.lock().unwrap().push(token.to_string());
        Ok(())
    }

    async fn revoke(&self, _token: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Armor is a prefix; any ciphertext mentioning `not-for-you` fails the way
/// gpg does without the secret key.
#[derive(Default)]
pub struct FakeCrypto {
    local: HashMap<String, String>,
    remote: HashMap<String, String>,
    pub encrypted_to: Mutex<Vec<Vec<String>>>,
}

impl FakeCrypto {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, email: &str, fingerprint: &str) -> Self {
        self.local.insert(email.to_ascii_lowercase(), fingerprint.to_string());
        self
    }

    pub fn with_remote_key(mut self, email: &str, fingerprint: &str) -> Self {
        self.remote.insert(email.to_ascii_lowercase(), fingerprint.to_string());
        self
    }

    fn key(keys: &HashMap<String, String>, email: &str) -> Option<PublicKey> {
        keys.get(&email.to_ascii_lowercase()).map(|fingerprint| PublicKey {
            fingerprint: fingerprint.clone(),
            user_id: email.to_string(),
        })
    }
}

#[async_trait]
impl Crypto for FakeCrypto {
    async fn private_key(&self, email: &str) -> AppResult<PrivateKey> {
        Self::key(&self.local, email)
            .map(|key| PrivateKey {
                fingerprint: key.fingerprint,
            })
            .ok_or_else(|| AppError::Crypto("No secret key".to_string()))
    }

    async fn public_key(&self, email: &str) -> AppResult<Option<PublicKey>> {
        Ok(Self::key(&self.local, email))
    }

    async fn verified_public_key(&self, email: &str) -> AppResult<VerifiedKey> {
        Ok(VerifiedKey {
            local: Self::key(&self.local, email),
            remote: Self::key(&self.remote, email),
        })
    }

    async fn encrypt_sign(
        &self,
        plaintext: &str,
        recipients: &[PublicKey],
        _signer: &PrivateKey,
    ) -> AppResult<String> {
        self.encrypted_to
            .lock()
            .unwrap()
            .push(recipients.iter().map(|key| key.user_id.clone()).collect());
        Ok(format!("ARMOR:{plaintext}"))
    }

    async fn decrypt_verify(
        &self,
        ciphertext: &str,
        _recipient: &PrivateKey,
        _sender: &PublicKey,
    ) -> AppResult<Decrypted> {
        if ciphertext.contains("not-for-you") {
            return Err(AppError::Crypto("gpg: decryption failed: No secret key".to_string()));
        }
        Ok(Decrypted {
            content: ciphertext.strip_prefix("ARMOR:").unwrap_or(ciphertext).to_string(),
            warning: None,
        })
    }
}

#[derive(Default)]
pub struct RecordingContacts {
    pub candidates: Mutex<Vec<(String, u32)>>,
    pub key_changes: Mutex<Vec<(String, String, String)>>,
}

impl Contacts for RecordingContacts {
    fn add_candidate(&self, address: &str, priority: u32) {
        self.candidates
            .lock()
            .unwrap()
            .push((address.to_string(), priority));
    }

    fn key_changed(&self, address: &str, previous: &str, current: &str) {
        self.key_changes.lock().unwrap().push((
            address.to_string(),
            previous.to_string(),
            current.to_string(),
        ));
    }
}

pub struct Harness {
    pub transport: Arc<FakeTransport>,
    pub crypto: Arc<FakeCrypto>,
    pub contacts: Arc<RecordingContacts>,
    pub session: Session,
}

pub fn client(transport: Arc<FakeTransport>) -> GmailClient {
    GmailClient::new(transport, AuthGateway::new(Arc::new(FakeTokenProvider::default())))
}

pub fn harness(transport: Arc<FakeTransport>, crypto: FakeCrypto) -> Harness {
    let crypto = Arc::new(crypto);
    let contacts = Arc::new(RecordingContacts::default());
    let session = Session::new(
        OWNER,
        client(transport.clone()),
        crypto.clone(),
        contacts.clone(),
        SessionOptions::default(),
    );
    Harness {
        transport,
        crypto,
        contacts,
        session,
    }
}

pub fn metadata_route(id: &str) -> String {
    format!("{MESSAGES}/{id}?metadata")
}

pub fn message_route(id: &str) -> String {
    format!("{MESSAGES}/{id}")
}

pub fn modify_route(id: &str) -> String {
    format!("{MESSAGES}/{id}/modify")
}

pub fn b64url(text: &str) -> String {
    URL_SAFE_NO_PAD.encode(text.as_bytes())
}

pub fn listing(ids: &[(&str, &str)], next_page_token: Option<&str>) -> Value {
    let messages = ids
        .iter()
        .map(|(id, thread)| json!({"id": id, "threadId": thread}))
        .collect::<Vec<_>>();
    match next_page_token {
        Some(token) => json!({"messages": messages, "nextPageToken": token}),
        None => json!({"messages": messages}),
    }
}

/// Metadata of a PGP/MIME message sent at 10:`minute` on a fixed day.
pub fn encrypted_metadata(id: &str, thread: &str, from: &str, minute: u32, unread: bool) -> Value {
    let labels = if unread {
        json!(["INBOX", "UNREAD"])
    } else {
        json!(["INBOX"])
    };
    json!({
        "id": id,
        "threadId": thread,
        "labelIds": labels,
        "payload": {
            "mimeType": "multipart/encrypted",
            "headers": [
                {"name": "Content-Type", "value": "multipart/encrypted; protocol=\"application/pgp-encrypted\"; boundary=\"b\""},
                {"name": "From", "value": from},
                {"name": "To", "value": OWNER},
                {"name": "Subject", "value": format!("subject {thread}")},
                {"name": "Date", "value": format!("Mon, 16 Feb 2026 10:{minute:02}:00 +0000")},
                {"name": "Message-ID", "value": format!("<{id}@x.com>")}
            ]
        }
    })
}

fn control_part() -> Value {
    json!({
        "mimeType": "application/pgp-encrypted",
        "body": {"size": 10, "data": b64url("Version: 1")}
    })
}

/// Full message whose encrypted half carries `ciphertext` inline.
pub fn inline_message(id: &str, thread: &str, ciphertext: &str) -> Value {
    json!({
        "id": id,
        "threadId": thread,
        "payload": {
            "mimeType": "multipart/encrypted",
            "parts": [
                control_part(),
                {"mimeType": "application/octet-stream", "body": {"size": ciphertext.len(), "data": b64url(ciphertext)}}
            ]
        }
    })
}

/// Full message whose encrypted half must be fetched as an attachment.
pub fn attachment_message(id: &str, thread: &str, attachment_id: &str) -> Value {
    json!({
        "id": id,
        "threadId": thread,
        "payload": {
            "mimeType": "multipart/encrypted",
            "parts": [
                {"mimeType": "application/octet-stream", "body": {"size": 4096, "attachmentId": attachment_id}},
                control_part()
            ]
        }
    })
}

pub fn plain_text_mime(body: &str) -> String {
    format!("Content-Type: text/plain; charset=utf-8\r\nContent-Transfer-Encoding: 7bit\r\n\r\n{body}")
}
