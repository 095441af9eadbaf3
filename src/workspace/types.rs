use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown analysis type: {0}")]
pub struct UnknownAnalysisType(pub String);

/// Analysis categories the backend understands
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum AnalysisType {
    #[serde(rename = "exegetical")]
    Exegetical,
    #[serde(rename = "socio-rhetorical")]
    SocioRhetorical,
    #[serde(rename = "thematic")]
    Thematic,
    #[serde(rename = "ethical")]
    Ethical,
    #[serde(rename = "genre")]
    Genre,
    /// Only used to generate suggested follow-up questions after a search
    #[serde(rename = "interactive_qa")]
    #[value(skip)]
    InteractiveQa,
}

impl AnalysisType {
    /// The user-facing analysis cards, in display order
    pub const CARDS: [Self; 5] = [
        Self::Exegetical,
        Self::SocioRhetorical,
        Self::Thematic,
        Self::Ethical,
        Self::Genre,
    ];

    /// Wire name sent as the analyze request `type`
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exegetical => "exegetical",
            Self::SocioRhetorical => "socio-rhetorical",
            Self::Thematic => "thematic",
            Self::Ethical => "ethical",
            Self::Genre => "genre",
            Self::InteractiveQa => "interactive_qa",
        }
    }

    #[inline]
    pub fn title(self) -> &'static str {
        match self {
            Self::Exegetical => "Exegetical Analysis",
            Self::SocioRhetorical => "Socio-Rhetorical",
            Self::Thematic => "Thematic Trace",
            Self::Ethical => "Ethical Framework",
            Self::Genre => "Genre Analysis",
            Self::InteractiveQa => "Suggested Questions",
        }
    }

    #[inline]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Exegetical => "📜",
            Self::SocioRhetorical => "🏛️",
            Self::Thematic => "🔍",
            Self::Ethical => "⚖️",
            Self::Genre => "📚",
            Self::InteractiveQa => "❓",
        }
    }
}

impl fmt::Display for AnalysisType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = UnknownAnalysisType;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exegetical" => Ok(Self::Exegetical),
            "socio-rhetorical" => Ok(Self::SocioRhetorical),
            "thematic" => Ok(Self::Thematic),
            "ethical" => Ok(Self::Ethical),
            "genre" => Ok(Self::Genre),
            "interactive_qa" => Ok(Self::InteractiveQa),
            other => Err(UnknownAnalysisType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    System,
}

/// Lifecycle of a logged message. User chat messages start `Pending` and
/// move to `Delivered` or `Failed`; system messages are always `Delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Delivered,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub analysis_type: Option<AnalysisType>,
    pub content: String,
    pub status: MessageStatus,
    /// For assistant replies, the user message being answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            analysis_type: None,
            content: content.into(),
            status: MessageStatus::Pending,
            reply_to: None,
            created_at: Utc::now(),
        }
    }

    #[inline]
    pub fn reply(to: Uuid, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::System,
            analysis_type: None,
            content: content.into(),
            status: MessageStatus::Delivered,
            reply_to: Some(to),
            created_at: Utc::now(),
        }
    }

    #[inline]
    pub fn analysis(analysis_type: AnalysisType, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::System,
            analysis_type: Some(analysis_type),
            content: content.into(),
            status: MessageStatus::Delivered,
            reply_to: None,
            created_at: Utc::now(),
        }
    }
}

/// Editable text inputs on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputField {
    Search,
    Chat,
}

/// Key under which a detached request is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKey {
    Analysis(AnalysisType),
    Chat(Uuid),
}
