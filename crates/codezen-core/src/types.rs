use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account that owns projects. Resolved from the request principal.
///
/// # Examples
///
/// ```
/// use codezen_core::User;
///
/// let user = User {
///     id: 1,
///     email: "dev@example.com".into(),
///     created_at: chrono::Utc::now(),
/// };
/// assert_eq!(user.email, "dev@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Row id.
    pub id: i64,
    /// Unique login email.
    pub email: String,
    /// When the user was first seen.
    pub created_at: DateTime<Utc>,
}

/// A codebase under review. Every project belongs to exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Row id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Language label used to fence submitted code (e.g. `"typescript"`).
    pub language: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Owning user id.
    pub owner_id: i64,
    /// Owning user email.
    pub owner_email: String,
}

/// A project-scoped free-text rule injected into review prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guideline {
    /// Row id.
    pub id: i64,
    /// The rule as shown to the model.
    pub rule_text: String,
    /// Owning project id.
    pub project_id: i64,
}

/// One code snapshot submitted for review, with the model's feedback.
///
/// `llm_response` and `effort_estimation` are empty between the moment the
/// snapshot is stored and the moment the generation call returns.
///
/// # Examples
///
/// ```
/// use codezen_core::Review;
///
/// let review = Review {
///     id: 7,
///     timestamp: chrono::Utc::now(),
///     code_snapshot: "fn main() {}".into(),
///     llm_response: None,
///     effort_estimation: None,
///     project_id: 1,
///     user_id: 1,
/// };
/// let json = serde_json::to_value(&review).unwrap();
/// assert_eq!(json["codeSnapshot"], "fn main() {}");
/// assert!(json["effortEstimation"].is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Row id.
    pub id: i64,
    /// Submission time.
    pub timestamp: DateTime<Utc>,
    /// The code exactly as submitted.
    pub code_snapshot: String,
    /// Raw model output (or the client's fallback text).
    pub llm_response: Option<String>,
    /// Normalized `"N/10"` effort, when one could be extracted.
    pub effort_estimation: Option<String>,
    /// Owning project id.
    pub project_id: i64,
    /// Submitting user id.
    pub user_id: i64,
}

/// Who wrote a follow-up comment on a review.
///
/// # Examples
///
/// ```
/// use codezen_core::CommentRole;
///
/// assert_eq!(serde_json::to_string(&CommentRole::Ai).unwrap(), "\"AI\"");
/// assert_eq!("USER".parse::<CommentRole>().unwrap(), CommentRole::User);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommentRole {
    /// Question asked by the reviewer.
    User,
    /// Answer produced by the model.
    Ai,
}

impl CommentRole {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentRole::User => "USER",
            CommentRole::Ai => "AI",
        }
    }
}

impl fmt::Display for CommentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(CommentRole::User),
            "AI" => Ok(CommentRole::Ai),
            other => Err(format!("unknown comment role: {other}")),
        }
    }
}

/// A message in the follow-up conversation attached to a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Row id.
    pub id: i64,
    /// Message text.
    pub message: String,
    /// Author role.
    pub role: CommentRole,
    /// When the message was stored.
    pub timestamp: DateTime<Utc>,
    /// Review the conversation belongs to.
    pub review_id: i64,
    /// User who owns the conversation.
    pub user_id: i64,
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use codezen_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
