//! An in-memory [`GitHubApi`] serving canned payloads, and a capture of loud log events.

use std::{collections::HashMap, fmt::Debug, path::Path, sync::Arc};

use parking_lot::Mutex;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    subscriber::DefaultGuard,
};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt as _},
};

use crate::{
    client::{GitHubApi, check_download_status},
    error::{Error, Result},
};

#[derive(Debug, Clone)]
enum Response {
    Json(Value),
    Bytes(Vec<u8>),
    Status(StatusCode),
}

#[derive(Debug, Default)]
pub(crate) struct FakeGitHub {
    responses: HashMap<String, Response>,
    calls: Mutex<Vec<String>>,
}

impl FakeGitHub {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn json(mut self, path: &str, value: Value) -> Self {
        self.responses.insert(path.to_owned(), Response::Json(value));
        self
    }

    pub(crate) fn bytes(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.responses.insert(url.to_owned(), Response::Bytes(bytes));
        self
    }

    pub(crate) fn status(mut self, path: &str, status: StatusCode) -> Self {
        self.responses.insert(path.to_owned(), Response::Status(status));
        self
    }

    /// Every path or URL requested so far, in order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn respond(&self, key: &str) -> Result<Response> {
        self.calls.lock().push(key.to_owned());
        match self.responses.get(key) {
            Some(Response::Status(status)) => Err(Error::Status {
                url: key.to_owned(),
                status: *status,
            }),
            Some(response) => Ok(response.clone()),
            None => Err(Error::Status {
                url: key.to_owned(),
                status: StatusCode::NOT_FOUND,
            }),
        }
    }
}

impl GitHubApi for FakeGitHub {
    async fn fetch_json<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        match self.respond(path)? {
            Response::Json(value) => Ok(serde_json::from_value(value)?),
            _ => panic!("{path} is not a JSON resource"),
        }
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        match self.respond(url) {
            Ok(Response::Bytes(bytes)) => Ok(tokio::fs::write(destination, bytes).await?),
            Err(Error::Status { status, .. }) => check_download_status(url, status),
            Err(err) => Err(err),
            Ok(_) => panic!("{url} is not a downloadable resource"),
        }
    }
}

/// Records the messages of `WARN` and `ERROR` events on the current thread.
#[derive(Debug, Clone, Default)]
pub(crate) struct LoudEvents(Arc<Mutex<Vec<String>>>);

impl LoudEvents {
    /// Captures events until the returned guard is dropped.
    pub(crate) fn capture(&self) -> DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

impl<S> Layer<S> for LoudEvents
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() > Level::WARN {
            return;
        }
        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        self.0.lock().push(message);
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            *self.0 = format!("{value:?}");
        }
    }
}
