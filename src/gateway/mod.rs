//! Backend gateway
//!
//! Thin request/response wrappers over the LogosAI HTTP API. Every call is a
//! single `POST` with a JSON body: no retry, no backoff, no timeout. A non-2xx
//! status becomes [`GatewayError::Http`] and the body is not inspected.

pub mod types;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::session::SessionContext;

pub use types::{
    AnalysisOutput, AnalysisResponse, ChatResponse, CorrectionResponse, SearchKind, SearchResult,
    SessionResponse,
};
use types::{AnalyzeRequest, ChatRequest, CorrectRequest, EmptyRequest, SearchRequest};

/// Number of passages requested from every search
pub const SEARCH_RESULT_CAP: u32 = 20;

pub const SEARCH_PATH: &str = "/api/logos/search";
pub const ANALYZE_PATH: &str = "/api/logos/analyze";
pub const CORRECT_PATH: &str = "/api/logos/correct";
pub const CHAT_PATH: &str = "/api/logos/chat";
pub const CREATE_SESSION_PATH: &str = "/api/logos/create-anonymous-session";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error! status: {0}")]
    Http(u16),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Request task failed: {0}")]
    Task(String),
}

impl GatewayError {
    /// Status code when the server answered with a non-success status
    #[inline]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(status) => Some(*status),
            _ => None,
        }
    }
}

/// The remote capabilities the coordinators depend on
#[async_trait]
pub trait Backend: Send + Sync {
    async fn search(&self, query: &str, kind: SearchKind)
    -> Result<Vec<SearchResult>, GatewayError>;

    async fn analyze(
        &self,
        texts: &[String],
        analysis_type: &str,
    ) -> Result<AnalysisResponse, GatewayError>;

    async fn correct(&self, text: &str) -> Result<CorrectionResponse, GatewayError>;

    async fn chat(
        &self,
        context: &str,
        query: &str,
        session: &SessionContext,
    ) -> Result<ChatResponse, GatewayError>;

    async fn create_session(&self) -> Result<SessionResponse, GatewayError>;
}

/// Blocking HTTP client for the LogosAI API
#[derive(Debug, Clone)]
pub struct LogosClient {
    base_url: Url,
    agent: ureq::Agent,
}

impl LogosClient {
    #[inline]
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let base_url = config
            .backend_url()
            .context("Failed to resolve backend URL from config")?;

        Ok(Self::with_base_url(base_url))
    }

    #[inline]
    pub fn with_base_url(base_url: Url) -> Self {
        let agent = ureq::Agent::config_builder().build().into();
        Self { base_url, agent }
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Search the passage index
    #[inline]
    pub fn search_passages(
        &self,
        query: &str,
        kind: SearchKind,
    ) -> Result<Vec<SearchResult>, GatewayError> {
        debug!("Searching {} index for {:?}", kind, query);

        let request = SearchRequest {
            query,
            top_k: SEARCH_RESULT_CAP,
            index_type: kind,
        };
        let results: Vec<SearchResult> = self.post_json(SEARCH_PATH, &request, None)?;

        debug!("Search returned {} passages", results.len());
        Ok(results)
    }

    /// Request one analysis over `"id: text"` passages
    #[inline]
    pub fn analyze_passages(
        &self,
        texts: &[String],
        analysis_type: &str,
    ) -> Result<AnalysisResponse, GatewayError> {
        debug!(
            "Requesting {} analysis over {} passages",
            analysis_type,
            texts.len()
        );

        let request = AnalyzeRequest {
            texts,
            analysis_type,
        };
        self.post_json(ANALYZE_PATH, &request, None)
    }

    #[inline]
    pub fn correct_text(&self, text: &str) -> Result<CorrectionResponse, GatewayError> {
        debug!("Requesting correction for text (length: {})", text.len());
        self.post_json(CORRECT_PATH, &CorrectRequest { text }, None)
    }

    /// Ask the assistant about `context`. Sends the bearer token when the
    /// session has one; the server rejects anonymous calls.
    #[inline]
    pub fn send_chat(
        &self,
        context: &str,
        query: &str,
        session: &SessionContext,
    ) -> Result<ChatResponse, GatewayError> {
        if session.access_token.is_none() {
            debug!("Sending chat without a session token");
        }

        let request = ChatRequest {
            context,
            query,
            user_id: session.user_id.as_deref(),
        };
        self.post_json(CHAT_PATH, &request, session.access_token.as_deref())
    }

    #[inline]
    pub fn create_anonymous_session(&self) -> Result<SessionResponse, GatewayError> {
        debug!("Creating anonymous session at {}", self.base_url);
        self.post_json(CREATE_SESSION_PATH, &EmptyRequest {}, None)
    }

    /// `path` appended to the base URL, keeping any prefix the base carries
    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let prefixed = format!("{}{}", self.base_url.path().trim_end_matches('/'), path);
        url.set_path(&prefixed);
        url
    }

    fn post_json<B, T>(&self, path: &str, body: &B, bearer: Option<&str>) -> Result<T, GatewayError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let request_json = serde_json::to_string(body)?;

        debug!("POST {}", url);

        let mut request = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json");
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response_text = request
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|error| match error {
                ureq::Error::StatusCode(status) => {
                    debug!("POST {} failed with status {}", url, status);
                    GatewayError::Http(status)
                }
                other => GatewayError::Transport(other.to_string()),
            })?;

        Ok(serde_json::from_str(&response_text)?)
    }
}

/// Run a blocking gateway call off the async scheduler
async fn run_blocking<T, F>(call: F) -> Result<T, GatewayError>
where
    F: FnOnce() -> Result<T, GatewayError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| GatewayError::Task(e.to_string()))?
}

#[async_trait]
impl Backend for LogosClient {
    async fn search(
        &self,
        query: &str,
        kind: SearchKind,
    ) -> Result<Vec<SearchResult>, GatewayError> {
        let client = self.clone();
        let query = query.to_string();
        run_blocking(move || client.search_passages(&query, kind)).await
    }

    async fn analyze(
        &self,
        texts: &[String],
        analysis_type: &str,
    ) -> Result<AnalysisResponse, GatewayError> {
        let client = self.clone();
        let texts = texts.to_vec();
        let analysis_type = analysis_type.to_string();
        run_blocking(move || client.analyze_passages(&texts, &analysis_type)).await
    }

    async fn correct(&self, text: &str) -> Result<CorrectionResponse, GatewayError> {
        let client = self.clone();
        let text = text.to_string();
        run_blocking(move || client.correct_text(&text)).await
    }

    async fn chat(
        &self,
        context: &str,
        query: &str,
        session: &SessionContext,
    ) -> Result<ChatResponse, GatewayError> {
        let client = self.clone();
        let context = context.to_string();
        let query = query.to_string();
        let session = session.clone();
        run_blocking(move || client.send_chat(&context, &query, &session)).await
    }

    async fn create_session(&self) -> Result<SessionResponse, GatewayError> {
        let client = self.clone();
        run_blocking(move || client.create_anonymous_session()).await
    }
}
