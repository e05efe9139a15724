use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::api::GmailClient;
use crate::config::SessionOptions;
use crate::contacts::Contacts;
use crate::crypto::Crypto;
use crate::error::{AppError, AppResult};
use crate::mailbox::{Mailbox, RecentlyViewed, Thread};
use crate::notices;

use super::indexer;
use super::labels;
use super::scanner::InboxScanner;

/// Mailbox state and sync bookkeeping for one signed-in owner.
pub struct Session {
    pub(super) client: GmailClient,
    pub(super) crypto: Arc<dyn Crypto>,
    pub(super) contacts: Arc<dyn Contacts>,
    pub(super) mailbox: Mailbox,
    pub(super) recently_viewed: RecentlyViewed,
    pub(super) labels: Option<Vec<String>>,
    pub(super) options: SessionOptions,
    last_refresh: Option<Instant>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("owner", &self.mailbox.email)
            .field("threads", &self.mailbox.threads.len())
            .field("recently_viewed", &self.recently_viewed)
            .finish()
    }
}

impl Session {
    pub fn new(
        owner: impl Into<String>,
        client: GmailClient,
        crypto: Arc<dyn Crypto>,
        contacts: Arc<dyn Contacts>,
        options: SessionOptions,
    ) -> Self {
        Self {
            client,
            crypto,
            contacts,
            mailbox: Mailbox::new(owner),
            recently_viewed: RecentlyViewed::new(options.cache_capacity),
            labels: None,
            options,
            last_refresh: None,
        }
    }

    pub fn owner(&self) -> &str {
        &self.mailbox.email
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn thread(&self, id: &str) -> Option<&Thread> {
        self.mailbox.thread(id)
    }

    /// Scans the inbox and indexes every candidate message. An unforced
    /// refresh inside the cooldown window does nothing and returns `false`.
    pub async fn refresh(&mut self, force: bool) -> AppResult<bool> {
        let now = Instant::now();
        if !force
            && self
                .last_refresh
                .is_some_and(|last| now.duration_since(last) < self.options.refresh_cooldown)
        {
            debug!("refresh skipped during cooldown");
            return Ok(false);
        }

        self.mailbox.status = Some(notices::checking_inbox());
        let mut scanner =
            InboxScanner::new(&self.client, &self.options.search_query, self.options.page_size);
        let mut indexed = 0;

        loop {
            let batch = match scanner.next_batch().await {
                Ok(Some(batch)) => batch,
                Ok(None) => break,
                Err(err) => {
                    self.mailbox.status = None;
                    return Err(err);
                }
            };
            for resource in &batch {
                if indexer::index_message(&mut self.mailbox, self.contacts.as_ref(), resource) {
                    indexed += 1;
                }
            }
        }

        info!(pages = scanner.pages(), indexed, "mailbox refreshed");
        self.mailbox.status = None;
        self.last_refresh = Some(now);
        Ok(true)
    }

    pub fn mark_thread(&mut self, id: &str, marked: bool) -> AppResult<()> {
        let thread = self
            .mailbox
            .thread_mut(id)
            .ok_or_else(|| AppError::InvalidInput(format!("no such thread in mailbox: {id}")))?;
        thread.marked = marked;
        Ok(())
    }

    /// Label ids used for trashing, resolved once per session.
    pub async fn labels(&mut self) -> Vec<String> {
        if let Some(labels) = &self.labels {
            return labels.clone();
        }
        let resolved = labels::resolve_labels(&self.client).await;
        self.labels = Some(resolved.clone());
        resolved
    }

    /// Forgets everything learned since sign-in.
    pub fn reset(&mut self) {
        let owner = std::mem::take(&mut self.mailbox.email);
        self.mailbox = Mailbox::new(owner);
        self.recently_viewed.clear();
        self.labels = None;
        self.last_refresh = None;
    }

    /// Marks `thread_id` as most recently viewed, releasing decrypted content
    /// of whichever thread falls out of the cache.
    pub(super) fn touch_thread(&mut self, thread_id: &str) {
        let mailbox = &mut self.mailbox;
        self.recently_viewed.touch(thread_id, |evicted| {
            let released = mailbox.release_content(evicted);
            debug!(thread = evicted, released, "released decrypted content");
        });
    }
}
