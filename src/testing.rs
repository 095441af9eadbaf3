//! In-process `Backend` used by the unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::gateway::{
    AnalysisOutput, AnalysisResponse, Backend, ChatResponse, CorrectionResponse, GatewayError,
    SearchKind, SearchResult, SessionResponse,
};
use crate::session::SessionContext;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Search(String, SearchKind),
    Analyze(Vec<String>, String),
    Correct(String),
    Chat {
        context: String,
        query: String,
        session: SessionContext,
    },
    CreateSession,
}

/// Canned answers keyed by operation. A status code in `Err` becomes
/// `GatewayError::Http`. Gates hold a response until the test releases it.
pub(crate) struct FakeBackend {
    pub search: Mutex<Result<Vec<SearchResult>, u16>>,
    pub analyses: Mutex<HashMap<String, Result<AnalysisOutput, u16>>>,
    pub correction: Mutex<Result<Option<String>, u16>>,
    pub chat: Mutex<Result<String, u16>>,
    pub session: Mutex<Result<SessionResponse, u16>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<Call>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            search: Mutex::new(Ok(Vec::new())),
            analyses: Mutex::new(HashMap::new()),
            correction: Mutex::new(Ok(None)),
            chat: Mutex::new(Err(500)),
            session: Mutex::new(Err(500)),
            gates: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    pub fn with_results(results: Vec<SearchResult>) -> Self {
        let backend = Self::default();
        *backend.search.lock().expect("lock") = Ok(results);
        backend
    }

    pub fn set_analysis(&self, analysis_type: &str, output: Result<AnalysisOutput, u16>) {
        self.analyses
            .lock()
            .expect("lock")
            .insert(analysis_type.to_string(), output);
    }

    /// Hold responses for `key` (an analysis type, or "chat") until released
    pub fn gate(&self, key: &str) -> Arc<Notify> {
        Arc::clone(
            self.gates
                .lock()
                .expect("lock")
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Notify::new())),
        )
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("lock").push(call);
    }

    async fn wait_for_gate(&self, key: &str) {
        let gate = self.gates.lock().expect("lock").get(key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

pub(crate) fn passage(id: &str, text: &str, distance: f64) -> SearchResult {
    SearchResult {
        id: id.to_string(),
        text: text.to_string(),
        distance,
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn search(
        &self,
        query: &str,
        kind: SearchKind,
    ) -> Result<Vec<SearchResult>, GatewayError> {
        self.record(Call::Search(query.to_string(), kind));
        self.wait_for_gate("search").await;
        self.search
            .lock()
            .expect("lock")
            .clone()
            .map_err(GatewayError::Http)
    }

    async fn analyze(
        &self,
        texts: &[String],
        analysis_type: &str,
    ) -> Result<AnalysisResponse, GatewayError> {
        self.record(Call::Analyze(texts.to_vec(), analysis_type.to_string()));
        self.wait_for_gate(analysis_type).await;
        let output = self
            .analyses
            .lock()
            .expect("lock")
            .get(analysis_type)
            .cloned()
            .unwrap_or(Err(500));
        output
            .map(|result| AnalysisResponse { result })
            .map_err(GatewayError::Http)
    }

    async fn correct(&self, text: &str) -> Result<CorrectionResponse, GatewayError> {
        self.record(Call::Correct(text.to_string()));
        self.correction
            .lock()
            .expect("lock")
            .clone()
            .map(|corrected_text| CorrectionResponse { corrected_text })
            .map_err(GatewayError::Http)
    }

    async fn chat(
        &self,
        context: &str,
        query: &str,
        session: &SessionContext,
    ) -> Result<ChatResponse, GatewayError> {
        self.record(Call::Chat {
            context: context.to_string(),
            query: query.to_string(),
            session: session.clone(),
        });
        self.wait_for_gate("chat").await;
        self.chat
            .lock()
            .expect("lock")
            .clone()
            .map(|response| ChatResponse { response })
            .map_err(GatewayError::Http)
    }

    async fn create_session(&self) -> Result<SessionResponse, GatewayError> {
        self.record(Call::CreateSession);
        self.session
            .lock()
            .expect("lock")
            .clone()
            .map_err(GatewayError::Http)
    }
}
