// Chat channel publisher: posts annotations and the session video to a
// channel webhook, or only logs them when no webhook is configured.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use movewatch_core::capability::{PublishError, Publisher, VIDEO_FILE_NAME};
use movewatch_core::config::Config;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Longest message the channel accepts, in characters.
pub const MESSAGE_LIMIT: usize = 2000;

// ---------------------------------------------------------------------------
// WebhookClient
// ---------------------------------------------------------------------------

/// Low-level webhook client.
pub struct WebhookClient {
    http: reqwest::Client,
    url: String,
}

impl WebhookClient {
    /// `api_base_url` is scheme and host; `webhook_path` starts with `/`.
    pub fn new(api_base_url: &str, webhook_path: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}{}", api_base_url.trim_end_matches('/'), webhook_path),
        }
    }

    pub async fn post_text(&self, text: &str) -> Result<(), PublishError> {
        let body = serde_json::json!({ "content": truncate_message(text) });
        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        check_status(resp.status())
    }

    pub async fn post_file(&self, caption: &str, path: &Path) -> Result<(), PublishError> {
        let bytes = tokio::fs::read(path).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "uploading attachment");

        let part = Part::bytes(bytes)
            .file_name(VIDEO_FILE_NAME)
            .mime_str(mime_for(path))
            .map_err(transport)?;
        let payload = serde_json::json!({ "content": truncate_message(caption) });
        let form = Form::new()
            .text("payload_json", payload.to_string())
            .part("files[0]", part);

        let resp = self
            .http
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        check_status(resp.status())
    }
}

// ---------------------------------------------------------------------------
// ChatPublisher wrapper
// ---------------------------------------------------------------------------

/// Either a live webhook or a log-only stand-in.
pub enum ChatPublisher {
    /// A webhook is configured.
    Webhook(WebhookClient),
    /// No webhook configured; messages go to the log only.
    Disabled,
}

impl ChatPublisher {
    /// `Webhook` when credentials carry a non-empty webhook path, otherwise
    /// `Disabled`.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.webhook_path {
            Some(path) if !path.trim().is_empty() => ChatPublisher::Webhook(WebhookClient::new(
                &config.publisher.api_base_url,
                path.trim(),
            )),
            _ => ChatPublisher::Disabled,
        }
    }
}

#[async_trait]
impl Publisher for ChatPublisher {
    async fn post_text(&self, text: &str) -> Result<(), PublishError> {
        match self {
            ChatPublisher::Webhook(client) => client.post_text(text).await,
            ChatPublisher::Disabled => {
                info!("(publisher disabled) {text}");
                Ok(())
            }
        }
    }

    async fn post_file(&self, caption: &str, path: &Path) -> Result<(), PublishError> {
        match self {
            ChatPublisher::Webhook(client) => client.post_file(caption, path).await,
            ChatPublisher::Disabled => {
                info!("(publisher disabled) {caption}: {}", path.display());
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn transport(e: reqwest::Error) -> PublishError {
    PublishError::Transport(e.to_string())
}

fn check_status(status: reqwest::StatusCode) -> Result<(), PublishError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(PublishError::Status(status.as_u16()))
    }
}

/// Clip `text` to the channel's message limit on a character boundary.
pub(crate) fn truncate_message(text: &str) -> String {
    text.chars().take(MESSAGE_LIMIT).collect()
}

/// MIME type for an attachment, from the local file extension.
pub(crate) fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("webm") => "video/webm",
        Some("mp4") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
