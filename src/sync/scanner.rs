use futures::future::join_all;
use tracing::{debug, warn};

use crate::api::GmailClient;
use crate::api::models::{MessageRef, MessageResource};
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Walks the inbox search one page at a time. Each page's metadata is
/// fetched concurrently and the page is only returned once every fetch
/// has settled.
#[derive(Debug)]
pub struct InboxScanner<'a> {
    client: &'a GmailClient,
    query: &'a str,
    page_size: u32,
    cursor: Cursor,
    pages: usize,
}

impl<'a> InboxScanner<'a> {
    pub fn new(client: &'a GmailClient, query: &'a str, page_size: u32) -> Self {
        Self {
            client,
            query,
            page_size,
            cursor: Cursor::Start,
            pages: 0,
        }
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Metadata for the next page, or `None` after the last page.
    pub async fn next_batch(&mut self) -> AppResult<Option<Vec<MessageResource>>> {
        let page_token = match &self.cursor {
            Cursor::Start => None,
            Cursor::Next(token) => Some(token.clone()),
            Cursor::Done => return Ok(None),
        };

        let page = self
            .client
            .list_messages(self.query, self.page_size, page_token.as_deref())
            .await?;
        self.pages += 1;
        self.cursor = match page.next_page_token {
            Some(token) => Cursor::Next(token),
            None => Cursor::Done,
        };

        debug!(page = self.pages, messages = page.refs.len(), "scanned inbox page");
        Ok(Some(fetch_metadata(self.client, &page.refs).await))
    }
}

/// Fetches metadata for every ref concurrently. Failed fetches are logged
/// and left out.
pub async fn fetch_metadata(client: &GmailClient, refs: &[MessageRef]) -> Vec<MessageResource> {
    let results = join_all(refs.iter().map(|message| client.get_metadata(&message.id))).await;

    results
        .into_iter()
        .zip(refs)
        .filter_map(|(result, message)| match result {
            Ok(resource) => Some(resource),
            Err(err) => {
                warn!(id = %message.id, error = %err, "skipping message metadata");
                None
            }
        })
        .collect()
}
