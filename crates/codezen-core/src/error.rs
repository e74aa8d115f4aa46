/// Errors that can occur across CodeZen.
///
/// Library crates use this type directly; the API crate maps it to HTTP
/// status codes and the binary reports it through `miette`.
///
/// # Examples
///
/// ```
/// use codezen_core::CodezenError;
///
/// let err = CodezenError::NotFound("Project not found".into());
/// assert_eq!(err.to_string(), "Project not found");
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CodezenError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(help("check .codezen.toml or run `codezen init`"))]
    Config(String),

    /// SQLite failure.
    #[error("database error: {0}")]
    Database(String),

    /// Generation endpoint failure that could not be turned into text.
    #[error("LLM error: {0}")]
    Llm(String),

    /// The record does not exist or belongs to someone else.
    #[error("{0}")]
    NotFound(String),

    /// The caller supplied an unusable value.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CodezenError {
    /// Shorthand for a [`CodezenError::NotFound`] naming the record kind.
    ///
    /// ```
    /// use codezen_core::CodezenError;
    ///
    /// assert_eq!(CodezenError::not_found("Review").to_string(), "Review not found");
    /// ```
    pub fn not_found(kind: &str) -> Self {
        Self::NotFound(format!("{kind} not found"))
    }
}
