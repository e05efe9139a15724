use tracing::{debug, warn};

use crate::api::GmailClient;
use crate::api::labels::{INBOX, USER_LABEL_TYPE};

/// Label ids removed from a thread to take it out of every mailbox view:
/// the user's own labels plus the inbox. Never fails; any error degrades to
/// the inbox alone.
pub async fn resolve_labels(client: &GmailClient) -> Vec<String> {
    let mut ids = match client.list_labels().await {
        Ok(labels) => labels
            .into_iter()
            .filter(|label| label.kind.as_deref() == Some(USER_LABEL_TYPE))
            .map(|label| label.id)
            .collect::<Vec<_>>(),
        Err(err) => {
            warn!(error = %err, "label lookup failed, falling back to inbox only");
            Vec::new()
        }
    };

    ids.push(INBOX.to_string());
    debug!(count = ids.len(), "resolved labels");
    ids
}
