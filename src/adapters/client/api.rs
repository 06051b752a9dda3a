//! reqwest adapter for the chat polling resource.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;

use crate::adapters::http::chat::ErrorResponse;
use crate::domain::chat::ChatMessage;
use crate::domain::foundation::{MessageId, SessionKey};
use crate::ports::{ChatApi, ChatClientError, CredentialProvider, OutgoingMessage};

/// `ChatApi` over the broker's REST endpoints.
pub struct ReqwestChatApi {
    api_base_url: String,
    http_client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl ReqwestChatApi {
    /// `api_base_url` is the broker origin, e.g. `http://localhost:8080`.
    pub fn new(api_base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self::with_client(api_base_url, credentials, reqwest::Client::new())
    }

    pub fn with_client(
        api_base_url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            http_client,
            credentials,
        }
    }

    fn messages_url(&self, session_key: &SessionKey) -> String {
        format!(
            "{}/api/chat/sessions/{}/messages",
            self.api_base_url, session_key
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.bearer_token() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ChatClientError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ChatClientError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(body) => ChatClientError::rejected(body.code, body.message),
                Err(_) => ChatClientError::transport(format!("HTTP {}: {}", status, text)),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ChatClientError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl ChatApi for ReqwestChatApi {
    async fn fetch_messages(
        &self,
        session_key: &SessionKey,
        since: Option<MessageId>,
    ) -> Result<Vec<ChatMessage>, ChatClientError> {
        let mut request = self.http_client.get(self.messages_url(session_key));
        if let Some(since) = since {
            request = request.query(&[("since_id", since.value())]);
        }
        self.send(request).await
    }

    async fn post_message(
        &self,
        session_key: &SessionKey,
        message: &OutgoingMessage,
    ) -> Result<ChatMessage, ChatClientError> {
        let request = self
            .http_client
            .post(self.messages_url(session_key))
            .json(message);
        self.send(request).await
    }
}
