//! Error types shared by every stage of the fetch pipeline.

use reqwest::StatusCode;
use thiserror::Error;

/// A shorthand for results carrying an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a fetch.
///
/// The first five variants are the classified failures of the pipeline; the rest wrap
/// transport and filesystem errors, which propagate unmodified.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// A required setting is missing or invalid. Raised before any request is sent.
    #[error("{0}")]
    Config(String),

    /// The latest release could not be resolved to a usable tag.
    #[error("{0}")]
    Resolution(String),

    /// The artifact download was rejected for lack of a valid credential.
    #[error("{0}")]
    Auth(String),

    /// No workflow run or artifact matched.
    #[error("{0}")]
    NotFound(String),

    /// The downloaded artifact did not contain any usable framework bundle.
    #[error("{0}")]
    Extraction(String),

    /// An API request came back with a non-success status.
    #[error("GET {url} returned {status}")]
    Status {
        /// The requested URL.
        url: String,
        /// The returned status.
        status: StatusCode,
    },

    /// A transport error from the HTTP client.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// A filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A malformed JSON payload.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A malformed zip archive.
    #[error(transparent)]
    Zip(#[from] async_zip::error::ZipError),

    /// A failure while walking the scratch area.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    /// A blocking archive task panicked.
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// Returns `true` if this is an API response with status 404.
    pub fn is_not_found_status(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_not_found() {
        let err = Error::Status {
            url: String::from("https://api.github.com/repos/a/b/git/ref/tags/v1"),
            status: StatusCode::NOT_FOUND,
        };
        assert!(err.is_not_found_status());
        assert_eq!(
            err.to_string(),
            "GET https://api.github.com/repos/a/b/git/ref/tags/v1 returned 404 Not Found"
        );

        let err = Error::Status {
            url: String::from("https://api.github.com/repos/a/b/releases/latest"),
            status: StatusCode::FORBIDDEN,
        };
        assert!(!err.is_not_found_status());
        assert!(!Error::NotFound(String::from("missing")).is_not_found_status());
    }
}
