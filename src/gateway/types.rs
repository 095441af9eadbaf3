use serde::{Deserialize, Serialize};
use std::fmt;

/// Which index the search runs against
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    #[default]
    Verse,
    Chapter,
}

impl SearchKind {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verse => "verse",
            Self::Chapter => "chapter",
        }
    }
}

impl fmt::Display for SearchKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ranked passage returned by the search endpoint. Lower distance is closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub distance: f64,
}

impl SearchResult {
    /// The `"id: text"` form the analysis endpoint expects
    #[inline]
    pub fn as_passage(&self) -> String {
        format!("{}: {}", self.id, self.text)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchRequest<'a> {
    pub query: &'a str,
    pub top_k: u32,
    pub index_type: SearchKind,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnalyzeRequest<'a> {
    pub texts: &'a [String],
    #[serde(rename = "type")]
    pub analysis_type: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CorrectRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub context: &'a str,
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmptyRequest {}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisResponse {
    pub result: AnalysisOutput,
}

/// The analysis endpoint answers with either prose or a list of lines
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnalysisOutput {
    Text(String),
    Lines(Vec<String>),
}

impl AnalysisOutput {
    /// Render as a single block of text
    #[inline]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Lines(lines) => lines.join("\n"),
        }
    }

    /// Render as a list, splitting prose on line breaks and dropping blanks
    #[inline]
    pub fn into_lines(self) -> Vec<String> {
        match self {
            Self::Lines(lines) => lines,
            Self::Text(text) => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CorrectionResponse {
    #[serde(default)]
    pub corrected_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_id: String,
}
