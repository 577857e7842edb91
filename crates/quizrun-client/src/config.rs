//! Client configuration and service factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizrun_core::traits::QuizService;

use crate::http::{HttpQuizService, DEFAULT_TIMEOUT_SECS};

/// Top-level quizrun configuration.
///
/// Note: Custom Debug impl masks the API token to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct QuizrunConfig {
    /// Base URL of the quiz service API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent with every request.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Quiz to take when none is given on the command line.
    #[serde(default)]
    pub default_quiz: Option<String>,
}

impl std::fmt::Debug for QuizrunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizrunConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("default_quiz", &self.default_quiz)
            .finish()
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for QuizrunConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            timeout_secs: default_timeout(),
            default_quiz: None,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    substitute_vars(s, |name| std::env::var(name).ok())
}

/// Single left-to-right pass; substituted values are never rescanned.
fn substitute_vars(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&lookup(&rest[start + 2..start + 2 + len]).unwrap_or_default());
        rest = &rest[start + 2 + len + 1..];
    }
    out.push_str(rest);
    out
}

/// Apply `QUIZRUN_BASE_URL` / `QUIZRUN_API_TOKEN` style overrides.
fn apply_overrides(config: &mut QuizrunConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup("QUIZRUN_BASE_URL") {
        config.base_url = url;
    }
    if let Some(token) = lookup("QUIZRUN_API_TOKEN") {
        config.api_token = Some(token);
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizrun.toml` in the current directory
/// 2. `~/.config/quizrun/config.toml`
///
/// Environment variable overrides: `QUIZRUN_BASE_URL`, `QUIZRUN_API_TOKEN`.
pub fn load_config() -> Result<QuizrunConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizrunConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizrun.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<QuizrunConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizrunConfig::default(),
    };

    apply_overrides(&mut config, |name| std::env::var(name).ok());

    config.base_url = resolve_env_vars(&config.base_url);
    config.api_token = config
        .api_token
        .as_deref()
        .map(resolve_env_vars)
        .filter(|t| !t.is_empty());

    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizrun"))
}

/// Create the HTTP quiz service described by `config`.
pub fn create_service(config: &QuizrunConfig) -> Result<Arc<dyn QuizService>> {
    let service = HttpQuizService::with_timeout(
        &config.base_url,
        config.api_token.clone(),
        config.timeout_secs,
    )
    .context("failed to create quiz service client")?;
    Ok(Arc::new(service))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_QUIZRUN_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_QUIZRUN_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_QUIZRUN_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_QUIZRUN_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = QuizrunConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000/api");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn parse_config() {
        let toml_str = r#"
base_url = "https://quiz.example.com/api"
api_token = "${QUIZ_TOKEN}"
timeout_secs = 10
default_quiz = "rust-basics"
"#;
        let config: QuizrunConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.base_url, "https://quiz.example.com/api");
        assert_eq!(config.api_token.as_deref(), Some("${QUIZ_TOKEN}"));
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.default_quiz.as_deref(), Some("rust-basics"));
    }

    #[test]
    fn debug_masks_token() {
        let config = QuizrunConfig {
            api_token: Some("sk-very-secret".into()),
            ..Default::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("sk-very-secret"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = QuizrunConfig::default();
        apply_overrides(&mut config, |name| match name {
            "QUIZRUN_BASE_URL" => Some("http://override:9000".into()),
            "QUIZRUN_API_TOKEN" => Some("tok".into()),
            _ => None,
        });
        assert_eq!(config.base_url, "http://override:9000");
        assert_eq!(config.api_token.as_deref(), Some("tok"));
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quizrun.toml");
        std::fs::write(&path, "timeout_secs = 5\ndefault_quiz = \"q-9\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.default_quiz.as_deref(), Some("q-9"));
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/quizrun.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let lookup = |name: &str| match name {
            "SELF" => Some("${SELF}".to_string()),
            "A" => Some("${B}".to_string()),
            "B" => Some("b".to_string()),
            _ => None,
        };
        assert_eq!(substitute_vars("x${SELF}y", lookup), "x${SELF}y");
        assert_eq!(substitute_vars("${A}-${B}", lookup), "${B}-b");
        assert_eq!(substitute_vars("${MISSING}!", lookup), "!");
    }

    #[test]
    fn unterminated_reference_is_kept() {
        assert_eq!(substitute_vars("a${B}c${open", |_| Some("-".into())), "a-c${open");
    }
}
