use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use log::{debug, trace};
use reqwest::Client;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::data::Endpoint;

/// Error types that can occur when talking to a remote player over HTTP
#[derive(Debug, Clone, Error)]
pub enum HttpClientError {
    #[error("Operation timed out")]
    Timeout,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP request error: {0}")]
    Request(String),
}

impl HttpClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpClientError::Timeout)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, HttpClientError::Cancelled)
    }
}

impl From<reqwest::Error> for HttpClientError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest reports a timeout either directly or as an I/O error one layer down
        if err.is_timeout() || source_is_timeout(&err) {
            return HttpClientError::Timeout;
        }
        if err.is_connect() {
            return HttpClientError::Connect(err.to_string());
        }
        HttpClientError::Request(err.to_string())
    }
}

fn source_is_timeout(err: &reqwest::Error) -> bool {
    err.source()
        .and_then(|source| source.downcast_ref::<std::io::Error>())
        .map(|io| io.kind() == std::io::ErrorKind::TimedOut)
        .unwrap_or(false)
}

/// Username/password pair sent as HTTP basic authentication
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Options used when a client is created for a session
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub basic_auth: Option<BasicAuth>,
}

/// A trait for HTTP client implementations bound to one remote endpoint
#[async_trait]
pub trait HttpClient: Send + Sync + std::fmt::Debug {
    /// Send a GET request for a path (and query) relative to the endpoint and
    /// return the body of a successful response
    async fn get(&self, path_and_query: &str) -> Result<String, HttpClientError>;
}

/// Creates the HTTP client a session owns
pub trait HttpClientFactory: Send + Sync {
    fn create(&self, endpoint: &Endpoint, options: &ClientOptions) -> Result<Arc<dyn HttpClient>, HttpClientError>;
}

/// An HTTP client implementation using reqwest
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    base_url: String,
    client: Client,
    basic_auth: Option<BasicAuth>,
}

impl ReqwestHttpClient {
    pub fn new(endpoint: &Endpoint, options: &ClientOptions) -> Result<Self, HttpClientError> {
        let client = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| HttpClientError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: endpoint.base_url(),
            client,
            basic_auth: options.basic_auth.clone(),
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, path_and_query: &str) -> Result<String, HttpClientError> {
        let url = format!("{}{}", self.base_url, path_and_query);
        trace!("GET request to {}", url);

        let mut request = self.client.get(&url);
        if let Some(auth) = &self.basic_auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("GET {} failed with HTTP {}", url, status);
            return Err(HttpClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.text().await?)
    }
}

/// Default factory creating reqwest clients
#[derive(Debug, Clone, Default)]
pub struct ReqwestClientFactory;

impl HttpClientFactory for ReqwestClientFactory {
    fn create(&self, endpoint: &Endpoint, options: &ClientOptions) -> Result<Arc<dyn HttpClient>, HttpClientError> {
        Ok(Arc::new(ReqwestHttpClient::new(endpoint, options)?))
    }
}

/// Run a transport operation until it completes or the token is cancelled.
/// Cancellation is reported as `HttpClientError::Cancelled`, never as a timeout.
pub async fn cancellable<T, E, F>(token: &CancellationToken, operation: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<HttpClientError>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(HttpClientError::Cancelled.into()),
        result = operation => result,
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted in-memory client used by the connector tests

    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct ScriptedHttpClient {
        responses: Mutex<HashMap<String, VecDeque<Result<String, HttpClientError>>>>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedHttpClient {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Queue responses for a path. The last queued response is repeated once
        /// the queue runs dry.
        pub fn respond(&self, path: &str, responses: Vec<Result<String, HttpClientError>>) {
            self.responses
                .lock()
                .unwrap()
                .entry(path.to_string())
                .or_default()
                .extend(responses);
        }

        pub fn respond_ok(&self, path: &str, body: &str) {
            self.respond(path, vec![Ok(body.to_string())]);
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedHttpClient {
        async fn get(&self, path_and_query: &str) -> Result<String, HttpClientError> {
            self.requests.lock().unwrap().push(path_and_query.to_string());
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(path_and_query) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) if queue.len() == 1 => queue[0].clone(),
                // Commands without a scripted answer succeed with an empty body
                _ => Ok(String::new()),
            }
        }
    }

    /// Factory handing out the same scripted client to every session
    pub struct ScriptedClientFactory {
        pub client: Arc<ScriptedHttpClient>,
        pub created: Mutex<Vec<(Endpoint, ClientOptions)>>,
    }

    impl ScriptedClientFactory {
        pub fn new(client: Arc<ScriptedHttpClient>) -> Arc<Self> {
            Arc::new(Self {
                client,
                created: Mutex::new(Vec::new()),
            })
        }
    }

    impl HttpClientFactory for ScriptedClientFactory {
        fn create(&self, endpoint: &Endpoint, options: &ClientOptions) -> Result<Arc<dyn HttpClient>, HttpClientError> {
            self.created.lock().unwrap().push((endpoint.clone(), options.clone()));
            Ok(self.client.clone())
        }
    }
}
