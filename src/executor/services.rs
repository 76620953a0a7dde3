//! External collaborators handed to nodes
//!
//! The engine only defines these contracts; concrete clients for vaults,
//! HTTP and chat providers live outside the core and are passed in through
//! [`Services`].

use crate::error::WorkflowError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Read access to stored secrets
#[async_trait]
pub trait VaultAccess: Send + Sync {
    /// Look up a secret by key
    async fn get_secret(&self, key: &str) -> Result<Option<String>, WorkflowError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Outbound HTTP
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, WorkflowError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    #[serde(default)]
    pub model: String,
}

/// LLM chat completion
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, WorkflowError>;
}

/// Bundle of optional collaborators, forwarded unchanged to every node
#[derive(Clone, Default)]
pub struct Services {
    pub vault: Option<Arc<dyn VaultAccess>>,
    pub http: Option<Arc<dyn HttpClient>>,
    pub chat: Option<Arc<dyn ChatClient>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vault(mut self, vault: Arc<dyn VaultAccess>) -> Self {
        self.vault = Some(vault);
        self
    }

    pub fn with_http(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatClient>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// The vault, or a configuration error if none was provided
    pub fn require_vault(&self) -> Result<&Arc<dyn VaultAccess>, WorkflowError> {
        self.vault
            .as_ref()
            .ok_or_else(|| WorkflowError::configuration("no vault service configured"))
    }

    pub fn require_http(&self) -> Result<&Arc<dyn HttpClient>, WorkflowError> {
        self.http
            .as_ref()
            .ok_or_else(|| WorkflowError::configuration("no HTTP service configured"))
    }

    pub fn require_chat(&self) -> Result<&Arc<dyn ChatClient>, WorkflowError> {
        self.chat
            .as_ref()
            .ok_or_else(|| WorkflowError::configuration("no chat service configured"))
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("vault", &self.vault.is_some())
            .field("http", &self.http.is_some())
            .field("chat", &self.chat.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    struct StaticVault;

    #[async_trait]
    impl VaultAccess for StaticVault {
        async fn get_secret(&self, key: &str) -> Result<Option<String>, WorkflowError> {
            Ok((key == "api_key").then(|| "s3cret".to_string()))
        }
    }

    #[tokio::test]
    async fn test_services_bundle() {
        let services = Services::new().with_vault(Arc::new(StaticVault));

        let vault = services.require_vault().unwrap();
        assert_eq!(vault.get_secret("api_key").await.unwrap().as_deref(), Some("s3cret"));
        assert_eq!(vault.get_secret("other").await.unwrap(), None);

        let err = services.require_chat().err().unwrap();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert_eq!(
            format!("{:?}", services),
            "Services { vault: true, http: false, chat: false }"
        );
    }
}
