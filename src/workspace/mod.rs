//! Search, analysis and chat coordination
//!
//! A [`Workspace`] owns the page state and issues gateway calls on behalf of
//! the user. Remote failures never propagate out of it: they are logged and
//! turned into local state changes (an emptied result list, an unchanged
//! input, a failed message, a fixed apology in place of an analysis).
//!
//! Requests are never retried or timed out, and nothing cancels them
//! implicitly. Detached requests started through `spawn_*` can be cancelled
//! explicitly by key.

pub mod state;
pub mod types;

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::gateway::{Backend, CorrectionResponse, GatewayError, SearchKind, SearchResult};
use crate::session::SessionManager;

pub use state::PageState;
pub use types::{
    AnalysisType, ChatMessage, InputField, MessageStatus, RequestKey, Role, UnknownAnalysisType,
};

/// Content of an analysis message whose request failed
pub const ANALYSIS_FAILURE_MESSAGE: &str = "Failed to analyze scripture. Please try again.";

pub struct Workspace {
    backend: Arc<dyn Backend>,
    session: Arc<SessionManager>,
    state: Mutex<PageState>,
    tasks: Mutex<HashMap<RequestKey, AbortHandle>>,
}

/// Clears the loading flag on every exit path
struct LoadingGuard<'a> {
    workspace: &'a Workspace,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.workspace.state().is_loading = false;
    }
}

/// Clears an in-flight marker, and any task registered for it, when the
/// request ends, fails, or is aborted. The task entry goes first.
struct InFlightGuard<W: Deref<Target = Workspace>> {
    workspace: W,
    analysis_type: AnalysisType,
}

impl<W: Deref<Target = Workspace>> Drop for InFlightGuard<W> {
    fn drop(&mut self) {
        self.workspace
            .forget_task(RequestKey::Analysis(self.analysis_type));
        self.workspace
            .state()
            .in_flight
            .remove(&self.analysis_type);
    }
}

struct PendingChat {
    id: Uuid,
    text: String,
    context: String,
}

impl Workspace {
    #[inline]
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionManager>) -> Self {
        Self {
            backend,
            session,
            state: Mutex::new(PageState::default()),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// A copy of the current page state
    #[inline]
    pub fn snapshot(&self) -> PageState {
        self.state().clone()
    }

    #[inline]
    pub fn set_search_query(&self, query: impl Into<String>) {
        self.state().search_query = query.into();
    }

    #[inline]
    pub fn set_search_kind(&self, kind: SearchKind) {
        self.state().search_kind = kind;
    }

    #[inline]
    pub fn set_chat_input(&self, text: impl Into<String>) {
        self.state().chat_input = text.into();
    }

    /// Copy suggested question `index` into the chat input verbatim
    #[inline]
    pub fn use_suggestion(&self, index: usize) -> bool {
        let mut state = self.state();
        let Some(question) = state.suggested_questions.get(index).cloned() else {
            return false;
        };
        state.chat_input = question;
        true
    }

    /// Search with the current query and kind, then ask for suggested
    /// questions about the results. A blank query does nothing.
    #[inline]
    pub async fn run_search(&self) {
        let (query, kind) = {
            let state = self.state();
            (state.search_query.clone(), state.search_kind)
        };

        if query.is_empty() {
            debug!("Ignoring search with an empty query");
            return;
        }

        self.state().is_loading = true;
        let _loading = LoadingGuard { workspace: self };

        if let Err(e) = self.search_and_suggest(&query, kind).await {
            error!("Error searching scripture: {}", e);
            let mut state = self.state();
            state.results.clear();
            state.suggested_questions.clear();
        }
    }

    async fn search_and_suggest(&self, query: &str, kind: SearchKind) -> Result<(), GatewayError> {
        let results = self.backend.search(query, kind).await?;
        info!("Search for {:?} returned {} passages", query, results.len());

        let passages: Vec<String> = results.iter().map(SearchResult::as_passage).collect();
        self.state().results = results;

        let response = self
            .backend
            .analyze(&passages, AnalysisType::InteractiveQa.as_str())
            .await?;
        self.state().suggested_questions = response.result.into_lines();

        Ok(())
    }

    /// Request one analysis of the current results and log the outcome as
    /// a system message tagged with the type. Does nothing without results
    /// or while the same type is already in flight.
    #[inline]
    pub async fn generate_analysis(&self, analysis_type: AnalysisType) {
        if let Some(passages) = self.begin_analysis(analysis_type) {
            let _in_flight = InFlightGuard {
                workspace: self,
                analysis_type,
            };
            self.finish_analysis(analysis_type, passages).await;
        }
    }

    /// Like [`generate_analysis`](Self::generate_analysis) but detached and
    /// cancellable under [`RequestKey::Analysis`]
    #[inline]
    pub fn spawn_analysis(self: &Arc<Self>, analysis_type: AnalysisType) -> Option<JoinHandle<()>> {
        let passages = self.begin_analysis(analysis_type)?;
        // Owned by the task so an abort before its first poll still clears it
        let in_flight = InFlightGuard {
            workspace: Arc::clone(self),
            analysis_type,
        };

        Some(
            self.spawn_tracked(RequestKey::Analysis(analysis_type), async move {
                let workspace = &in_flight.workspace;
                workspace.finish_analysis(analysis_type, passages).await;
            }),
        )
    }

    fn begin_analysis(&self, analysis_type: AnalysisType) -> Option<Vec<String>> {
        let mut state = self.state();

        if state.results.is_empty() {
            debug!("No results to analyze for {}", analysis_type);
            return None;
        }

        if !state.in_flight.insert(analysis_type) {
            debug!("{} analysis already in flight", analysis_type);
            return None;
        }

        Some(state.passages())
    }

    async fn finish_analysis(&self, analysis_type: AnalysisType, passages: Vec<String>) {
        let content = match self
            .backend
            .analyze(&passages, analysis_type.as_str())
            .await
        {
            Ok(response) => response.result.to_text(),
            Err(e) => {
                error!("Error analyzing scripture ({}): {}", analysis_type, e);
                ANALYSIS_FAILURE_MESSAGE.to_string()
            }
        };

        self.state()
            .messages
            .push(ChatMessage::analysis(analysis_type, content));
    }

    /// Send the chat input to the assistant. The user message is logged as
    /// pending before the call; on success it is marked delivered, the reply
    /// is placed right after it and the input is cleared. On failure it is
    /// marked failed and the input is kept.
    #[inline]
    pub async fn send_chat_message(&self) -> Option<Uuid> {
        let pending = self.begin_chat()?;
        let id = pending.id;
        self.complete_chat(pending).await;
        Some(id)
    }

    /// Like [`send_chat_message`](Self::send_chat_message) but detached and
    /// cancellable under [`RequestKey::Chat`]. The user message is logged
    /// before this returns.
    #[inline]
    pub fn spawn_chat(self: &Arc<Self>) -> Option<(Uuid, JoinHandle<()>)> {
        let pending = self.begin_chat()?;
        let id = pending.id;
        let key = RequestKey::Chat(id);
        let this = Arc::clone(self);

        let handle = self.spawn_tracked(key, async move {
            this.complete_chat(pending).await;
            this.forget_task(key);
        });
        Some((id, handle))
    }

    fn begin_chat(&self) -> Option<PendingChat> {
        let mut state = self.state();
        let text = state.chat_input.clone();

        if text.is_empty() {
            debug!("Ignoring empty chat message");
            return None;
        }

        let message = ChatMessage::user(text.clone());
        let id = message.id;
        state.messages.push(message);

        Some(PendingChat {
            id,
            text,
            context: state.chat_context(),
        })
    }

    async fn complete_chat(&self, pending: PendingChat) {
        let session = self.session.current();

        match self
            .backend
            .chat(&pending.context, &pending.text, &session)
            .await
        {
            Ok(reply) => {
                let mut state = self.state();
                state.settle(pending.id, MessageStatus::Delivered);
                state.insert_reply(ChatMessage::reply(pending.id, reply.response));
                // Keep anything typed while the reply was outstanding
                if state.chat_input == pending.text {
                    state.chat_input.clear();
                }
            }
            Err(e) => {
                error!("Error sending chat message: {}", e);
                self.state().settle(pending.id, MessageStatus::Failed);
            }
        }
    }

    /// Replace `field` with the service's correction, if it offers one
    #[inline]
    pub async fn autocorrect(&self, field: InputField) {
        let text = self.state().input(field).to_string();

        if text.is_empty() {
            debug!("Nothing to correct in {:?}", field);
            return;
        }

        match self.backend.correct(&text).await {
            Ok(CorrectionResponse {
                corrected_text: Some(corrected),
            }) => {
                let mut state = self.state();
                if state.input(field) == text {
                    state.set_input(field, corrected);
                } else {
                    debug!("{:?} changed while correcting, keeping the edit", field);
                }
            }
            Ok(_) => debug!("No correction suggested for {:?}", field),
            Err(e) => error!("Error correcting text: {}", e),
        }
    }

    /// Keys of detached requests that have not finished
    #[inline]
    pub fn pending_requests(&self) -> Vec<RequestKey> {
        self.tasks().keys().copied().collect()
    }

    /// Abort a detached request. An aborted analysis leaves no message and
    /// its in-flight marker clears once the task is dropped; an aborted chat
    /// leaves its user message marked failed.
    #[inline]
    pub fn cancel(&self, key: RequestKey) -> bool {
        let handle = self.tasks().remove(&key);
        let Some(handle) = handle else {
            return false;
        };

        handle.abort();
        debug!("Cancelled {:?}", key);

        if let RequestKey::Chat(id) = key {
            self.state().settle(id, MessageStatus::Failed);
        }
        true
    }

    /// Abort every detached request
    #[inline]
    pub fn cancel_all(&self) -> usize {
        self.pending_requests()
            .into_iter()
            .filter(|key| self.cancel(*key))
            .count()
    }

    fn spawn_tracked<F>(&self, key: RequestKey, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Registered under the lock so a fast task cannot forget itself first
        let mut tasks = self.tasks();
        let handle = tokio::spawn(task);
        tasks.insert(key, handle.abort_handle());
        handle
    }

    fn forget_task(&self, key: RequestKey) {
        self.tasks().remove(&key);
    }

    fn state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<RequestKey, AbortHandle>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
