use std::env;
use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Which endpoint family a session talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProgressKind {
    #[default]
    Quiz,
    Test,
}

impl ProgressKind {
    /// Path segment of the progress endpoints (`quiz_progress` / `test_progress`).
    #[must_use]
    pub fn progress_prefix(self) -> &'static str {
        match self {
            ProgressKind::Quiz => "quiz_progress",
            ProgressKind::Test => "test_progress",
        }
    }

    /// Path segment of the question endpoints (`quizzes` / `tests`).
    #[must_use]
    pub fn content_prefix(self) -> &'static str {
        match self {
            ProgressKind::Quiz => "quizzes",
            ProgressKind::Test => "tests",
        }
    }
}

impl fmt::Display for ProgressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressKind::Quiz => f.write_str("quiz"),
            ProgressKind::Test => f.write_str("test"),
        }
    }
}

impl FromStr for ProgressKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiz" => Ok(Self::Quiz),
            "test" => Ok(Self::Test),
            _ => Err(ConfigError::InvalidKind(s.to_string())),
        }
    }
}

/// Where and as whom the client talks to the backend.
#[derive(Clone)]
pub struct ApiConfig {
    base_url: Url,
    token: String,
    kind: ProgressKind,
}

impl ApiConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::MissingCredentials` for a blank token and
    /// `ConfigError::InvalidBaseUrl` if `base_url` does not parse.
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        kind: ProgressKind,
    ) -> Result<Self, ConfigError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ConfigError::MissingCredentials);
        }
        let base_url = Url::parse(base_url.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
            raw: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            base_url,
            token: token.trim().to_string(),
            kind,
        })
    }

    /// Read `EXAM_API_BASE_URL`, `EXAM_API_TOKEN` and `EXAM_KIND`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the token is missing or a value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = env::var("EXAM_API_TOKEN").map_err(|_| ConfigError::MissingCredentials)?;
        let base_url = env::var("EXAM_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let kind = match env::var("EXAM_KIND") {
            Ok(raw) => raw.parse()?,
            Err(_) => ProgressKind::default(),
        };
        Self::new(&base_url, token, kind)
    }

    #[must_use]
    pub fn kind(&self) -> ProgressKind {
        self.kind
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("Token {}", self.token)
    }

    /// Absolute URL for a path relative to the API root, e.g. `quiz_progress/3/submit/`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_is_missing_credentials() {
        let err = ApiConfig::new(DEFAULT_BASE_URL, "  ", ProgressKind::Quiz).unwrap_err();
        assert_eq!(err, ConfigError::MissingCredentials);
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = ApiConfig::new("not a url", "t", ProgressKind::Quiz).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let cfg = ApiConfig::new("https://example.com/api/", "t", ProgressKind::Test).unwrap();
        assert_eq!(
            cfg.endpoint("/test_progress/3/submit/"),
            "https://example.com/api/test_progress/3/submit/"
        );
    }

    #[test]
    fn authorization_uses_token_scheme() {
        let cfg = ApiConfig::new(DEFAULT_BASE_URL, " abc ", ProgressKind::Quiz).unwrap();
        assert_eq!(cfg.authorization(), "Token abc");
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = ApiConfig::new(DEFAULT_BASE_URL, "secret", ProgressKind::Quiz).unwrap();
        assert!(!format!("{cfg:?}").contains("secret"));
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Quiz".parse::<ProgressKind>().unwrap(), ProgressKind::Quiz);
        assert_eq!("TEST".parse::<ProgressKind>().unwrap(), ProgressKind::Test);
        assert!("exam".parse::<ProgressKind>().is_err());
    }
}
