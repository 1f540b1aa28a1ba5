//! Access to the GitHub REST API.
//!
//! See: [`GitHubApi`], [`GitHubClient`]

use std::{fmt::Debug, path::Path};

use futures::TryStreamExt as _;
use reqwest::{RequestBuilder, StatusCode, header};
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt as _;
use tracing::{debug, info};

use crate::{
    env::{Config, FALLBACK_TOKEN_VAR, TOKEN_VAR},
    error::{Error, Result},
};

/// The capabilities the pipeline needs from GitHub.
pub trait GitHubApi {
    /// Fetches a JSON resource at a path relative to the configured repository, e.g. `/releases/latest`.
    ///
    /// A non-success status is reported as [`Error::Status`].
    fn fetch_json<T>(&self, path: &str) -> impl Future<Output = Result<T>> + Send
    where
        T: DeserializeOwned + Send;

    /// Streams an absolute URL into a file without holding the whole body in memory.
    ///
    /// A 401 status is reported as [`Error::Auth`].
    fn download(&self, url: &str, destination: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// The [`GitHubApi`] implementation backed by [`reqwest`].
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    config: Config,
}

impl GitHubClient {
    /// Creates a client for the repository described by the config.
    pub fn new(config: Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Builds a request for GitHub REST API.
    fn request_builder(&self, url: &str) -> RequestBuilder {
        let builder = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header(header::USER_AGENT, &self.config.user_agent);

        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

impl GitHubApi for GitHubClient {
    async fn fetch_json<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        let url = self.config.repo_url(path);
        debug!("fetching {url}…");

        let response = self
            .request_builder(&url)
            .send()
            .await
            .inspect_err(|err| debug!("failed to fetch {url}: {err}"))?;

        match response.status() {
            status if status.is_success() => {
                let json = response
                    .json::<T>()
                    .await
                    .inspect_err(|err| debug!("failed to parse data from {url}: {err}"))?;
                debug!("fetched {url}");
                Ok(json)
            }
            status => {
                debug!("{url} returned {status}");
                Err(Error::Status { url, status })
            }
        }
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        debug!("requesting download from {url}…");

        let response = self.request_builder(url).send().await?;
        check_download_status(url, response.status())?;
        info!("requested download from {url}");

        write_stream(response.bytes_stream(), destination).await?;
        info!("downloaded {url} to {destination:?}");
        Ok(())
    }
}

/// Classifies the status of an artifact download response.
///
/// # Errors
///
/// Returns [`Error::Auth`] for 401, [`Error::NotFound`] for 410 (an expired or removed artifact),
/// and [`Error::Status`] for any other non-success status.
pub(crate) fn check_download_status(url: &str, status: StatusCode) -> Result<()> {
    match status {
        status if status.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED => Err(Error::Auth(format!(
            "GitHub rejected the artifact download. Provide a token via {TOKEN_VAR} \
             or {FALLBACK_TOKEN_VAR} with actions:read scope."
        ))),
        StatusCode::GONE => Err(Error::NotFound(format!(
            "the artifact at {url} has expired or was removed"
        ))),
        status => Err(Error::Status {
            url: url.to_owned(),
            status,
        }),
    }
}

async fn write_stream<S, P>(mut stream: S, destination: P) -> Result<()>
where
    S: futures::Stream<Item = reqwest::Result<tokio_util::bytes::Bytes>> + Unpin,
    P: AsRef<Path> + Debug,
{
    let mut file = tokio::fs::File::create(destination.as_ref()).await?;
    let mut written: u64 = 0;
    while let Some(chunk) = stream.try_next().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    debug!("wrote {written} bytes to {destination:?}");
    Ok(())
}
