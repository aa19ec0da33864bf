//! HTTP client for the Discord REST API.
//!
//! Only the message endpoints of a single channel are used. Authentication is
//! a bot token sent as `Authorization: Bot <token>`.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{MessageSink, SentMessage, SinkError};
use crate::roster::RosterEmbed;

/// Default Discord API base URL.
pub const DEFAULT_API_URL: &str = "https://discord.com/api/v10";

/// HTTP client for Discord channel messages.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    base_url: String,
    token: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

impl DiscordClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: Client::new(),
        }
    }

    /// Build a request with the bot authorization header.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, SinkError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(self.error_from(response).await)
        }
    }

    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<(), SinkError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.error_from(response).await)
        }
    }

    async fn error_from(&self, response: reqwest::Response) -> SinkError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => SinkError::NotFound(body),
            StatusCode::FORBIDDEN => SinkError::Forbidden(body),
            StatusCode::UNAUTHORIZED => SinkError::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = serde_json::from_str::<RateLimitBody>(&body)
                    .map(|b| b.retry_after)
                    .unwrap_or(0.0);
                SinkError::RateLimited { retry_after }
            }
            _ => SinkError::Server(format!("{}: {}", status, body)),
        }
    }
}

fn message_body(embed: &RosterEmbed) -> serde_json::Value {
    serde_json::json!({ "embeds": [embed] })
}

#[async_trait]
impl MessageSink for DiscordClient {
    async fn fetch_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<SentMessage, SinkError> {
        let response = self
            .request(
                Method::GET,
                &format!("/channels/{}/messages/{}", channel_id, message_id),
            )
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        embed: &RosterEmbed,
    ) -> Result<(), SinkError> {
        let response = self
            .request(
                Method::PATCH,
                &format!("/channels/{}/messages/{}", channel_id, message_id),
            )
            .json(&message_body(embed))
            .send()
            .await?;
        self.handle_empty_response(response).await
    }

    async fn send_message(
        &self,
        channel_id: &str,
        embed: &RosterEmbed,
    ) -> Result<SentMessage, SinkError> {
        let response = self
            .request(Method::POST, &format!("/channels/{}/messages", channel_id))
            .json(&message_body(embed))
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), SinkError> {
        let response = self
            .request(
                Method::DELETE,
                &format!("/channels/{}/messages/{}", channel_id, message_id),
            )
            .send()
            .await?;
        self.handle_empty_response(response).await
    }
}
