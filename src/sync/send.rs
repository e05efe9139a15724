use futures::future::join_all;
use tracing::{info, warn};

use crate::api::labels::UNREAD;
use crate::api::models::{Attachment, MessageRef, SendResponse};
use crate::crypto::PublicKey;
use crate::error::{AppError, AppResult};
use crate::mail::{self, Envelope};
use crate::notices;

use super::indexer;
use super::scanner;
use super::session::Session;

/// An outgoing encrypted message.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMail {
    pub recipients: Vec<String>,
    pub thread_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub subject: String,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

impl Session {
    /// Encrypts `outgoing` to every recipient plus the owner, sends it as
    /// PGP/MIME and indexes the sent message.
    pub async fn encrypt_and_send(&mut self, outgoing: OutgoingMail) -> AppResult<SendResponse> {
        let mut recipients = outgoing.recipients;
        recipients.push(self.mailbox.email.clone());
        let recipients = dedup_addresses(recipients);

        let plaintext = mail::build_plaintext_mime(
            &outgoing.content,
            &Envelope {
                from: Some(self.from_address()),
                to: recipients.clone(),
                subject: Some(outgoing.subject.clone()),
                in_reply_to: None,
            },
            &outgoing.attachments,
        );

        let signer = self.crypto.private_key(&self.mailbox.email).await?;
        let keys = self.public_keys(&recipients).await?;
        let ciphertext = self.crypto.encrypt_sign(&plaintext, &keys, &signer).await?;

        self.send_pgp_mime(
            Envelope {
                from: Some(self.from_address()),
                to: recipients,
                subject: Some(outgoing.subject),
                in_reply_to: outgoing.in_reply_to,
            },
            &ciphertext,
            outgoing.thread_id.as_deref(),
        )
        .await
    }

    /// Sends an encrypted message from the owner to the owner.
    pub async fn send_notification(&mut self, subject: &str, content: &str) -> AppResult<SendResponse> {
        let owner = self.mailbox.email.clone();
        let signer = self.crypto.private_key(&owner).await?;
        let keys = self.public_keys(std::slice::from_ref(&owner)).await?;

        let envelope = Envelope {
            from: Some(self.from_address()),
            to: vec![owner],
            subject: Some(subject.to_string()),
            in_reply_to: None,
        };
        let plaintext = mail::build_plaintext_mime(content, &envelope, &[]);
        let ciphertext = self.crypto.encrypt_sign(&plaintext, &keys, &signer).await?;

        self.send_pgp_mime(envelope, &ciphertext, None).await
    }

    /// Sends an unencrypted invitation. Every recipient must be a valid
    /// address.
    pub async fn send_invite(&self, recipients: &[String]) -> AppResult<SendResponse> {
        let mut checked = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let parsed = indexer::parse_addresses(recipient);
            match parsed.as_slice() {
                [address] => checked.push(address.clone()),
                _ => {
                    return Err(AppError::InvalidInput(format!(
                        "invalid recipient email address: {recipient}"
                    )));
                }
            }
        }
        if checked.is_empty() {
            return Err(AppError::InvalidInput("no invite recipients".to_string()));
        }

        let sender = self.from_address();
        let document = mail::build_plaintext_mime(
            &notices::invite_body(&self.mailbox.email),
            &Envelope {
                from: Some(sender),
                to: checked,
                subject: Some(notices::invite_subject(&self.mailbox.email)),
                in_reply_to: None,
            },
            &[],
        );

        let response = self.client.send(&mail::encode_raw(&document), None).await?;
        info!(id = %response.id, "invite sent");
        Ok(response)
    }

    /// Removes the resolved labels from every marked thread. Threads are
    /// dropped locally only when the provider accepted the change.
    pub async fn trash_marked_threads(&mut self) -> AppResult<Vec<String>> {
        let marked = self.mailbox.marked_thread_ids();
        if marked.is_empty() {
            return Ok(Vec::new());
        }

        let labels = self.labels().await;
        let client = &self.client;
        let results = join_all(
            marked
                .iter()
                .map(|id| client.remove_thread_labels(id, &labels)),
        )
        .await;

        let mut trashed = Vec::new();
        let mut failures = Vec::new();
        for (id, result) in marked.into_iter().zip(results) {
            match result {
                Ok(()) => {
                    self.mailbox.remove_thread(&id);
                    trashed.push(id);
                }
                Err(err) => {
                    warn!(thread = %id, error = %err, "failed to trash thread");
                    failures.push(err);
                }
            }
        }

        match failures.into_iter().next() {
            Some(err) if trashed.is_empty() => Err(err),
            _ => Ok(trashed),
        }
    }

    async fn send_pgp_mime(
        &mut self,
        envelope: Envelope,
        ciphertext: &str,
        thread_id: Option<&str>,
    ) -> AppResult<SendResponse> {
        let document = mail::build_pgp_mime(&envelope, ciphertext, &notices::pgp_mime_preamble());
        let response = self.client.send(&mail::encode_raw(&document), thread_id).await?;
        info!(id = %response.id, "encrypted mail sent");

        if response.is_unread() {
            let remove = [UNREAD.to_string()];
            if let Err(err) = self.client.remove_message_labels(&response.id, &remove).await {
                warn!(id = %response.id, error = %err, "failed to mark sent mail read");
            }
        }

        self.index_sent(&response).await;
        Ok(response)
    }

    async fn index_sent(&mut self, response: &SendResponse) {
        let Some(thread_id) = response.thread_id.clone() else {
            return;
        };
        let refs = [MessageRef {
            id: response.id.clone(),
            thread_id: Some(thread_id),
        }];
        for resource in scanner::fetch_metadata(&self.client, &refs).await {
            indexer::index_message(&mut self.mailbox, self.contacts.as_ref(), &resource);
        }
    }

    /// Locally known keys for `addresses`; any missing key is fatal.
    async fn public_keys(&self, addresses: &[String]) -> AppResult<Vec<PublicKey>> {
        let lookups = join_all(addresses.iter().map(|address| self.crypto.public_key(address))).await;

        addresses
            .iter()
            .zip(lookups)
            .map(|(address, key)| {
                key?.ok_or_else(|| {
                    AppError::MissingKey(format!("public key not locally available for \"{address}\""))
                })
            })
            .collect()
    }

    fn from_address(&self) -> String {
        mail::mailbox_address(self.options.sender_name.as_deref(), &self.mailbox.email)
    }
}

/// Case-insensitive dedup keeping the first spelling of each address.
fn dedup_addresses(addresses: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(addresses.len());
    for address in addresses {
        let address = address.trim().to_string();
        if address.is_empty() || unique.iter().any(|seen| seen.eq_ignore_ascii_case(&address)) {
            continue;
        }
        unique.push(address);
    }
    unique
}
