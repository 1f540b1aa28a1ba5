//! Defines the environment variables to use and the [`Config`] built from them.

use crate::error::{Error, Result};

/// Parses the value of an environment variable, naming the variable in any [`anyhow::Error`].
macro_rules! parse_env {
    ($key:expr, $value:expr => |$var:ident| $expr:expr) => {{
        let $var = $value;
        $expr.map_err(|e| anyhow::anyhow!("invalid {}: {e}", $key))
    }};
}

/// Overrides the upstream repository owner.
pub const OWNER_VAR: &str = "FFMPEG_FRAMEWORK_OWNER";
/// Overrides the upstream repository name.
pub const REPO_VAR: &str = "FFMPEG_FRAMEWORK_REPO";
/// Overrides the name of the artifact to download.
pub const ARTIFACT_VAR: &str = "FFMPEG_FRAMEWORK_ARTIFACT";
/// The preferred token for artifact downloads.
pub const TOKEN_VAR: &str = "FFMPEG_FRAMEWORK_TOKEN";
/// The token used when [`TOKEN_VAR`] is unset.
pub const FALLBACK_TOKEN_VAR: &str = "GITHUB_TOKEN";
/// Overrides the `User-Agent` header.
pub const USER_AGENT_VAR: &str = "FFMPEG_FRAMEWORK_USER_AGENT";
/// Overrides the GitHub REST API base URL.
pub const API_URL_VAR: &str = "FFMPEG_FRAMEWORK_API_URL";
/// Overrides the page size of run and artifact listings.
pub const PAGE_SIZE_VAR: &str = "FFMPEG_FRAMEWORK_PAGE_SIZE";

const DEFAULT_OWNER: &str = "stovak";
const DEFAULT_REPO: &str = "ffmpeg-framework";
const DEFAULT_ARTIFACT: &str = "ffmpeg-xcframeworks";
const DEFAULT_USER_AGENT: &str = "SwiftFFMpegDownloader/1.0";
const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_PAGE_SIZE: u8 = 100;

/// Immutable settings read once at startup and passed into every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The upstream repository owner.
    pub owner: String,
    /// The upstream repository name.
    pub repo: String,
    /// The exact name of the artifact to download.
    pub artifact_name: String,
    /// The credential for artifact downloads, if any.
    pub token: Option<String>,
    /// The `User-Agent` header value.
    pub user_agent: String,
    /// The GitHub REST API base URL, without a trailing slash.
    pub api_url: String,
    /// How many runs or artifacts to request per listing. Only the first page is read.
    pub page_size: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner: DEFAULT_OWNER.to_owned(),
            repo: DEFAULT_REPO.to_owned(),
            artifact_name: DEFAULT_ARTIFACT.to_owned(),
            token: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            api_url: DEFAULT_API_URL.to_owned(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the page size override is not a number in `1..=100`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through a key lookup. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the page size override is not a number in `1..=100`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let page_size = match lookup(PAGE_SIZE_VAR) {
            Some(value) => parse_env!(PAGE_SIZE_VAR, value => |s| s.trim().parse::<u8>())
                .and_then(|size| match size {
                    1..=100 => Ok(size),
                    size => Err(anyhow::anyhow!(
                        "invalid {PAGE_SIZE_VAR}: {size} is outside 1..=100"
                    )),
                })
                .map_err(|e| Error::Config(e.to_string()))?,
            None => defaults.page_size,
        };

        Ok(Self {
            owner: lookup(OWNER_VAR).unwrap_or(defaults.owner),
            repo: lookup(REPO_VAR).unwrap_or(defaults.repo),
            artifact_name: lookup(ARTIFACT_VAR).unwrap_or(defaults.artifact_name),
            token: lookup(TOKEN_VAR).or_else(|| lookup(FALLBACK_TOKEN_VAR)),
            user_agent: lookup(USER_AGENT_VAR).unwrap_or(defaults.user_agent),
            api_url: lookup(API_URL_VAR)
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.api_url),
            page_size,
        })
    }

    /// Returns the download token, failing fast if none is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if neither token variable is set.
    pub fn require_token(&self) -> Result<&str> {
        self.token.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "Downloading GitHub Actions artifacts requires authentication. Set {TOKEN_VAR} \
                 or {FALLBACK_TOKEN_VAR} with a token that has actions:read access."
            ))
        })
    }

    /// Builds the API URL of a path relative to the configured repository.
    pub fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}{path}", self.api_url, self.owner, self.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.owner, "stovak");
        assert_eq!(config.repo, "ffmpeg-framework");
        assert_eq!(config.artifact_name, "ffmpeg-xcframeworks");
        assert_eq!(config.user_agent, "SwiftFFMpegDownloader/1.0");
        assert_eq!(config.page_size, 100);
        assert!(config.token.is_none());
    }

    #[test]
    fn overrides() {
        let config = config(&[
            (OWNER_VAR, "someone"),
            (REPO_VAR, "frameworks"),
            (ARTIFACT_VAR, "bundles"),
            (USER_AGENT_VAR, "tester/2.0"),
            (API_URL_VAR, "https://ghe.example.com/api/v3/"),
            (PAGE_SIZE_VAR, "20"),
        ])
        .unwrap();
        assert_eq!(config.owner, "someone");
        assert_eq!(config.repo, "frameworks");
        assert_eq!(config.artifact_name, "bundles");
        assert_eq!(config.user_agent, "tester/2.0");
        assert_eq!(config.page_size, 20);
        assert_eq!(
            config.repo_url("/releases/latest"),
            "https://ghe.example.com/api/v3/repos/someone/frameworks/releases/latest"
        );
    }

    #[test]
    fn token_fallback() {
        let primary = config(&[(TOKEN_VAR, "primary"), (FALLBACK_TOKEN_VAR, "fallback")]).unwrap();
        assert_eq!(primary.require_token().unwrap(), "primary");

        let fallback = config(&[(TOKEN_VAR, ""), (FALLBACK_TOKEN_VAR, "fallback")]).unwrap();
        assert_eq!(fallback.require_token().unwrap(), "fallback");

        let missing = config(&[]).unwrap();
        let err = missing.require_token().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("actions:read"));
    }

    #[test]
    fn invalid_page_size() {
        for value in ["zero", "0", "101", "-3"] {
            let err = config(&[(PAGE_SIZE_VAR, value)]).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{value}");
            assert!(err.to_string().starts_with("invalid FFMPEG_FRAMEWORK_PAGE_SIZE: "), "{err}");
        }
    }

    #[test]
    fn page_size_is_trimmed() {
        assert_eq!(config(&[(PAGE_SIZE_VAR, " 42 ")]).unwrap().page_size, 42);
        assert_eq!(config(&[(PAGE_SIZE_VAR, "  ")]).unwrap().page_size, 100);
    }
}
