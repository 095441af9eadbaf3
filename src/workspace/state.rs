use itertools::Itertools;
use std::collections::HashSet;
use uuid::Uuid;

use super::types::{AnalysisType, ChatMessage, InputField, MessageStatus};
use crate::gateway::{SearchKind, SearchResult};

/// Everything the presentation layer renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageState {
    pub search_query: String,
    pub search_kind: SearchKind,
    pub chat_input: String,
    pub is_loading: bool,
    /// Replaced wholesale by every search
    pub results: Vec<SearchResult>,
    /// Replaced wholesale by every search
    pub suggested_questions: Vec<String>,
    /// Analysis types with an outstanding request
    pub in_flight: HashSet<AnalysisType>,
    pub messages: Vec<ChatMessage>,
}

impl PageState {
    /// Results in the `"id: text"` form sent for analysis
    #[inline]
    pub fn passages(&self) -> Vec<String> {
        self.results.iter().map(SearchResult::as_passage).collect()
    }

    /// Result texts joined into the chat context block
    #[inline]
    pub fn chat_context(&self) -> String {
        self.results.iter().map(|result| result.text.as_str()).join("\n")
    }

    #[inline]
    pub fn input(&self, field: InputField) -> &str {
        match field {
            InputField::Search => &self.search_query,
            InputField::Chat => &self.chat_input,
        }
    }

    #[inline]
    pub fn set_input(&mut self, field: InputField, text: String) {
        match field {
            InputField::Search => self.search_query = text,
            InputField::Chat => self.chat_input = text,
        }
    }

    #[inline]
    pub fn is_analysis_in_flight(&self, analysis_type: AnalysisType) -> bool {
        self.in_flight.contains(&analysis_type)
    }

    #[inline]
    pub fn message(&self, id: Uuid) -> Option<&ChatMessage> {
        self.messages.iter().find(|message| message.id == id)
    }

    /// Analysis results of one type, oldest first
    #[inline]
    pub fn analyses(&self, analysis_type: AnalysisType) -> impl Iterator<Item = &ChatMessage> {
        self.messages
            .iter()
            .filter(move |message| message.analysis_type == Some(analysis_type))
    }

    /// Move a pending message to `status`. Settled messages are left alone.
    pub(crate) fn settle(&mut self, id: Uuid, status: MessageStatus) -> bool {
        self.messages
            .iter_mut()
            .find(|message| message.id == id && message.status == MessageStatus::Pending)
            .map(|message| message.status = status)
            .is_some()
    }

    /// Place a reply directly after the message it answers
    pub(crate) fn insert_reply(&mut self, reply: ChatMessage) {
        let position = reply
            .reply_to
            .and_then(|id| self.messages.iter().position(|message| message.id == id))
            .map_or(self.messages.len(), |index| index + 1);
        self.messages.insert(position, reply);
    }
}
