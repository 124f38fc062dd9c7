//! Task kinds served by inference endpoints.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// The kind of inference task an endpoint serves.
///
/// The kind selects the conversion used by an
/// [`EndpointClient`](crate::EndpointClient). Parsing never fails: names
/// outside the well-known set become [`TaskKind::Custom`], and whether a
/// conversion exists for them is only checked when a call is made.
///
/// # Examples
///
/// ```
/// use shard_query::TaskKind;
///
/// assert_eq!(TaskKind::from("text-generation"), TaskKind::TextGeneration);
/// assert_eq!(TaskKind::from("unsupported").to_string(), "unsupported");
/// assert!(TaskKind::from("unsupported").is_custom());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskKind {
    /// Autoregressive text generation.
    TextGeneration,
    /// Sequence classification.
    TextClassification,
    /// Extractive question answering.
    QuestionAnswering,
    /// Masked token prediction.
    FillMask,
    /// Per-token classification (NER and similar).
    TokenClassification,
    /// Multi-turn conversation.
    Conversational,
    /// Image generation from a text prompt.
    TextToImage,
    /// Any other task name.
    Custom(String),
}

impl TaskKind {
    /// All well-known task kinds.
    pub const KNOWN: [TaskKind; 7] = [
        TaskKind::TextGeneration,
        TaskKind::TextClassification,
        TaskKind::QuestionAnswering,
        TaskKind::FillMask,
        TaskKind::TokenClassification,
        TaskKind::Conversational,
        TaskKind::TextToImage,
    ];

    /// Returns the canonical task name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::TextGeneration => "text-generation",
            Self::TextClassification => "text-classification",
            Self::QuestionAnswering => "question-answering",
            Self::FillMask => "fill-mask",
            Self::TokenClassification => "token-classification",
            Self::Conversational => "conversational",
            Self::TextToImage => "text-to-image",
            Self::Custom(name) => name,
        }
    }

    /// Returns `true` if this is not one of the well-known kinds.
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<&str> for TaskKind {
    fn from(name: &str) -> Self {
        Self::KNOWN
            .iter()
            .find(|kind| kind.as_str() == name)
            .cloned()
            .unwrap_or_else(|| Self::Custom(name.to_string()))
    }
}

impl From<String> for TaskKind {
    fn from(name: String) -> Self {
        match Self::from(name.as_str()) {
            Self::Custom(_) => Self::Custom(name),
            known => known,
        }
    }
}

impl From<TaskKind> for String {
    fn from(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}
