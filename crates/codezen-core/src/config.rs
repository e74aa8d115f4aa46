use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CodezenError;

/// Top-level configuration loaded from `.codezen.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use codezen_core::CodezenConfig;
///
/// let config = CodezenConfig::default();
/// assert_eq!(config.llm.model, "codellama:7b");
/// assert_eq!(config.server.bind, "127.0.0.1:8080");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodezenConfig {
    /// Generation endpoint settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// SQLite settings.
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl CodezenConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Io`] if the file cannot be read, or
    /// [`CodezenError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use codezen_core::CodezenConfig;
    /// use std::path::Path;
    ///
    /// let config = CodezenConfig::from_file(Path::new(".codezen.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, CodezenError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use codezen_core::CodezenConfig;
    ///
    /// let toml = r#"
    /// [llm]
    /// model = "qwen2.5-coder:7b"
    /// "#;
    /// let config = CodezenConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.llm.model, "qwen2.5-coder:7b");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, CodezenError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Overlay values from the process environment.
    ///
    /// Recognized variables: `OLLAMA_API_URL`, `OLLAMA_MODEL`,
    /// `CODEZEN_BIND`, `CODEZEN_DATABASE`.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable lookup. Empty values are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use codezen_core::CodezenConfig;
    ///
    /// let mut config = CodezenConfig::default();
    /// config.apply_env_from(|key| (key == "OLLAMA_MODEL").then(|| "llama3".to_string()));
    /// assert_eq!(config.llm.model, "llama3");
    /// ```
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("OLLAMA_API_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = var("OLLAMA_MODEL") {
            self.llm.model = model;
        }
        if let Some(bind) = var("CODEZEN_BIND") {
            self.server.bind = bind;
        }
        if let Some(path) = var("CODEZEN_DATABASE") {
            self.database.path = PathBuf::from(path);
        }
    }
}

/// Generation endpoint configuration.
///
/// # Examples
///
/// ```
/// use codezen_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.base_url, "http://localhost:11434");
/// assert_eq!(config.timeout_secs, 300);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama server root, or its full `/api/generate` URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier passed to the runtime.
    #[serde(default = "default_model")]
    pub model: String,
    /// Upper bound for one generation request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}

fn default_model() -> String {
    "codellama:7b".into()
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on (default: `127.0.0.1:8080`).
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// SQLite configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file (default: `.codezen/codezen.db`).
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from(".codezen/codezen.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}
