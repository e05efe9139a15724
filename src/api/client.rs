use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::AuthGateway;
use crate::error::{AppError, AppResult};

use super::labels;
use super::messages;
use super::models::{
    AttachmentResponse, LabelListResponse, LabelResource, MessageListResponse, MessagePage,
    MessageResource, ModifyLabelsRequest, SendRequest, SendResponse,
};
use super::transport::Transport;

/// Typed access to the mail provider. Every call is routed through
/// [`AuthGateway::with_auth`] with retry enabled.
#[derive(Clone)]
pub struct GmailClient {
    transport: Arc<dyn Transport>,
    auth: AuthGateway,
}

impl std::fmt::Debug for GmailClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailClient").field("auth", &self.auth).finish()
    }
}

impl GmailClient {
    pub fn new(transport: Arc<dyn Transport>, auth: AuthGateway) -> Self {
        Self { transport, auth }
    }

    pub async fn list_messages(
        &self,
        search: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> AppResult<MessagePage> {
        let query = messages::list_query(search, page_size, page_token);
        let response: MessageListResponse = self.get(messages::list_endpoint(), &query).await?;
        Ok(response.into_page())
    }

    pub async fn get_metadata(&self, id: &str) -> AppResult<MessageResource> {
        self.get(&messages::message_endpoint(id), &messages::metadata_query())
            .await
    }

    pub async fn get_message(&self, id: &str) -> AppResult<MessageResource> {
        self.get(&messages::message_endpoint(id), &[]).await
    }

    pub async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> AppResult<AttachmentResponse> {
        self.get(&messages::attachment_endpoint(message_id, attachment_id), &[])
            .await
    }

    pub async fn remove_message_labels(&self, id: &str, remove: &[String]) -> AppResult<()> {
        self.modify(&labels::modify_message_endpoint(id), remove).await
    }

    pub async fn remove_thread_labels(&self, id: &str, remove: &[String]) -> AppResult<()> {
        self.modify(&labels::modify_thread_endpoint(id), remove).await
    }

    /// Submits an already base64url-encoded RFC822 document.
    pub async fn send(&self, raw: &str, thread_id: Option<&str>) -> AppResult<SendResponse> {
        let request = SendRequest {
            raw: raw.to_string(),
            thread_id: thread_id.map(ToOwned::to_owned),
        };
        self.post(&messages::send_endpoint(), &request).await
    }

    pub async fn list_labels(&self) -> AppResult<Vec<LabelResource>> {
        let response: LabelListResponse = self.get(labels::list_labels_endpoint(), &[]).await?;
        Ok(response.labels)
    }

    async fn modify(&self, endpoint: &str, remove: &[String]) -> AppResult<()> {
        let request = ModifyLabelsRequest {
            remove_label_ids: remove.to_vec(),
        };
        let _: Value = self.post(endpoint, &request).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> AppResult<T> {
        let transport = self.transport.as_ref();
        let value = self
            .auth
            .with_auth(None, true, |token| async move {
                transport.get(endpoint, query, &token).await?.into_good()
            })
            .await?;
        decode(value)
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, endpoint: &str, body: &B) -> AppResult<T> {
        let body = serde_json::to_value(body)?;
        let transport = self.transport.as_ref();
        let body = &body;
        let value = self
            .auth
            .with_auth(None, true, |token| async move {
                transport.post(endpoint, body, &token).await?.into_good()
            })
            .await?;
        decode(value)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> AppResult<T> {
    serde_json::from_value(value).map_err(|err| AppError::MissingData(err.to_string()))
}
