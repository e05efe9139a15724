use base64::Engine;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::{DecodePaddingMode, general_purpose};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::api::labels::UNREAD;
use crate::crypto::{PrivateKey, PublicKey};
use crate::error::{AppError, AppResult};
use crate::mail::{DisplayNode, mime};
use crate::notices;

use super::session::Session;

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

enum Outcome {
    Decrypted {
        nodes: Vec<DisplayNode>,
        warning: Option<String>,
    },
    Failed(String),
}

impl Session {
    /// Fetches and decrypts every mail of the thread that has no content yet,
    /// marks its unread mails read and registers the thread as recently
    /// viewed. Per-mail failures are recorded on the mail.
    pub async fn refresh_thread(&mut self, thread_id: &str) -> AppResult<()> {
        let thread = self
            .mailbox
            .thread_mut(thread_id)
            .ok_or_else(|| AppError::InvalidInput(format!("no such thread in mailbox: {thread_id}")))?;

        let pending = thread
            .mails
            .iter_mut()
            .filter(|mail| mail.needs_content())
            .map(|mail| {
                mail.status = Some(notices::fetching_message());
                (mail.id.clone(), mail.from.clone())
            })
            .collect::<Vec<_>>();

        if !pending.is_empty() {
            let private_key = self.crypto.private_key(&self.mailbox.email).await;
            let outcomes = join_all(pending.iter().map(|(id, from)| {
                self.open_mail(id, from, private_key.as_ref())
            }))
            .await;
            self.apply_outcomes(thread_id, pending.into_iter().map(|(id, _)| id).zip(outcomes));
        }

        self.mark_thread_read(thread_id).await;
        self.touch_thread(thread_id);
        Ok(())
    }

    fn apply_outcomes(&mut self, thread_id: &str, outcomes: impl Iterator<Item = (String, Outcome)>) {
        let Some(thread) = self.mailbox.thread_mut(thread_id) else {
            return;
        };

        for (mail_id, outcome) in outcomes {
            let Some(mail) = thread.mail_mut(&mail_id) else {
                continue;
            };
            match outcome {
                Outcome::Decrypted { nodes, warning } => {
                    mail.set_content(nodes, warning);
                    thread.summarize(&mail_id);
                }
                Outcome::Failed(message) => {
                    debug!(mail = %mail_id, %message, "mail could not be opened");
                    mail.fail(message);
                }
            }
        }
    }

    async fn open_mail(
        &self,
        mail_id: &str,
        sender: &str,
        private_key: Result<&PrivateKey, &AppError>,
    ) -> Outcome {
        let Some(sender_key) = self.verified_sender_key(sender).await else {
            return Outcome::Failed(notices::sender_key_unavailable(sender));
        };

        let private_key = match private_key {
            Ok(key) => key,
            Err(err) => return Outcome::Failed(notices::decrypt_failure(&err.to_string())),
        };

        let ciphertext = match self.fetch_ciphertext(mail_id).await {
            Ok(ciphertext) => ciphertext,
            Err(message) => return Outcome::Failed(message),
        };

        let decrypted = match self
            .crypto
            .decrypt_verify(&ciphertext, private_key, &sender_key)
            .await
        {
            Ok(decrypted) => decrypted,
            Err(err) => return Outcome::Failed(notices::decrypt_failure(&crypto_message(&err))),
        };

        match mime::render(&decrypted.content) {
            Ok(nodes) => Outcome::Decrypted {
                nodes,
                warning: decrypted.warning,
            },
            Err(err) => {
                warn!(mail = mail_id, error = %err, "decrypted content is not valid mime");
                Outcome::Failed(notices::mime_error())
            }
        }
    }

    /// Remote key preferred over the cached one; a mismatch is reported to
    /// the contacts collaborator.
    async fn verified_sender_key(&self, sender: &str) -> Option<PublicKey> {
        let verified = match self.crypto.verified_public_key(sender).await {
            Ok(verified) => verified,
            Err(err) => {
                warn!(sender, error = %err, "key verification failed");
                return None;
            }
        };

        if let (true, Some(local), Some(remote)) =
            (verified.changed(), &verified.local, &verified.remote)
        {
            info!(sender, "sender key changed");
            self.contacts
                .key_changed(sender, &local.fingerprint, &remote.fingerprint);
        }

        verified.preferred().cloned()
    }

    /// Locates the encrypted half of a PGP/MIME message and returns it as
    /// text. Errors are already user-facing.
    async fn fetch_ciphertext(&self, mail_id: &str) -> Result<String, String> {
        let message = self.client.get_message(mail_id).await.map_err(|err| {
            warn!(mail = mail_id, error = %err, "message fetch failed");
            notices::garbled_message()
        })?;

        let part = message
            .payload
            .as_ref()
            .and_then(|payload| payload.parts.as_deref())
            .and_then(mime::select_encrypted_part)
            .ok_or_else(notices::garbled_message)?;

        let encoded = match (part.inline_data(), part.attachment_id()) {
            (Some(data), _) => data.to_string(),
            (None, Some(attachment_id)) => self
                .client
                .get_attachment(mail_id, attachment_id)
                .await
                .map_err(|err| {
                    warn!(mail = mail_id, error = %err, "attachment fetch failed");
                    notices::garbled_message()
                })?
                .data
                .ok_or_else(notices::garbled_message)?,
            (None, None) => return Err(notices::garbled_message()),
        };

        decode_payload(&encoded).map_err(|err| {
            warn!(mail = mail_id, error = %err, "payload decoding failed");
            notices::encoding_error()
        })
    }

    /// Removes the unread label from every unread mail of the thread.
    /// Failures leave the mail unread.
    async fn mark_thread_read(&mut self, thread_id: &str) {
        let Some(thread) = self.mailbox.thread(thread_id) else {
            return;
        };
        let unread = thread
            .mails
            .iter()
            .filter(|mail| mail.unread)
            .map(|mail| mail.id.clone())
            .collect::<Vec<_>>();
        if unread.is_empty() {
            return;
        }

        let remove = vec![UNREAD.to_string()];
        let client = &self.client;
        let results = join_all(unread.iter().map(|id| client.remove_message_labels(id, &remove))).await;

        let Some(thread) = self.mailbox.thread_mut(thread_id) else {
            return;
        };
        for (id, result) in unread.iter().zip(results) {
            match result {
                Ok(()) => {
                    if let Some(mail) = thread.mail_mut(id) {
                        mail.unread = false;
                    }
                }
                Err(err) => warn!(mail = %id, error = %err, "failed to mark mail read"),
            }
        }
        thread.recompute_unread();
    }
}

/// Provider payloads are url-safe base64, sometimes padded; plain base64 is
/// accepted as well.
pub fn decode_payload(encoded: &str) -> AppResult<String> {
    let compact = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>();
    let bytes = URL_SAFE_LENIENT
        .decode(&compact)
        .or_else(|_| STANDARD.decode(&compact))
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(&compact))
        .map_err(|err| AppError::Encoding(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| AppError::Encoding(err.to_string()))
}

fn crypto_message(err: &AppError) -> String {
    match err {
        AppError::Crypto(message) => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_url_safe_with_or_without_padding() {
        assert_eq!(decode_payload("aGk_Pz8").expect("unpadded"), "hi???");
        assert_eq!(decode_payload("aGk_Pz8=").expect("padded"), "hi???");
    }

    #[test]
    fn decodes_standard_alphabet() {
        assert_eq!(decode_payload("aGk/Pz8=").expect("standard"), "hi???");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode_payload("%%%"), Err(AppError::Encoding(_))));
    }
}
