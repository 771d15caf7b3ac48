//! The request pipeline: session-scoped, retry-driven request lifecycle.
//!
//! One logical call walks BUILDING → IN_FLIGHT → {SUCCEEDED, FAILED_RETRYING,
//! FAILED_TERMINAL}. Construction happens synchronously before a session
//! exists; every later failure funnels through one retry decision point. The
//! retry re-invocation is a loop iteration gated on the policy's delayed
//! wake-up, so the same session id and the same prepared parameters carry
//! through every attempt by construction.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::error::Error;
use crate::files;
use crate::registry::SessionRegistry;
use crate::request;
use crate::retry::RetryOn;
use crate::sink::{ClientObserver, Dispatcher, LogSink};
use crate::task::{Task, TaskKind};
use crate::transport::easy::CurlTransport;
use crate::transport::{
    Delivery, PreparedRequest, ProgressFn, SessionConfig, TransferContext, Transport,
    TransportReply, TransportSession,
};

/// Caller veto over a retry the internal policy would allow. Returning false
/// makes the failure terminal.
pub type RetryVeto = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

/// Declared shape of a successful response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseShape {
    /// Raw bytes, handed back untouched.
    #[default]
    Data,
    /// JSON object. A body that fails to decode is a pipeline failure and
    /// goes through the retry decision like any transport fault.
    Json,
    /// Payload ignored.
    Empty,
}

/// Decoded payload of a successful call.
#[derive(Debug, Clone)]
pub enum Response {
    Data(Vec<u8>),
    Json(Map<String, Value>),
    Empty,
}

/// Per-call knobs. Everything defaults to the client configuration.
#[derive(Clone, Default)]
pub struct CallOptions {
    retry_count: Option<u32>,
    retry_on: Option<RetryOn>,
    shape: ResponseShape,
    should_retry: Option<RetryVeto>,
    progress: Option<ProgressFn>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retries after the initial attempt. Zero means no retries.
    pub fn retry_count(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    /// Which failure classes are eligible for retry.
    pub fn retry_on(mut self, mode: RetryOn) -> Self {
        self.retry_on = Some(mode);
        self
    }

    pub fn shape(mut self, shape: ResponseShape) -> Self {
        self.shape = shape;
        self
    }

    /// Install a veto: called before each retry the policy admits, with the
    /// failure at hand. Returning false ends the call instead.
    pub fn should_retry(mut self, veto: impl Fn(&Error) -> bool + Send + Sync + 'static) -> Self {
        self.should_retry = Some(Arc::new(veto));
        self
    }

    /// Fraction-complete callback for uploads and downloads.
    pub fn progress(mut self, callback: impl Fn(f32) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }
}

pub struct ClientBuilder {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    sink: Option<Arc<dyn LogSink>>,
    observer: Option<Arc<dyn ClientObserver>>,
}

impl ClientBuilder {
    /// Substitute the transport (tests use scripted sessions here).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ClientObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Spawns the callback dispatcher; call from within a tokio runtime.
    pub fn build(self) -> Client {
        Client {
            dispatcher: Dispatcher::spawn(self.sink, self.observer),
            config: self.config,
            transport: self.transport,
            registry: SessionRegistry::new(),
        }
    }
}

/// The client: owns the session registry and the callback dispatcher, and
/// drives every call through the pipeline.
pub struct Client {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    registry: SessionRegistry,
    dispatcher: Dispatcher,
}

impl Client {
    /// Client over the production curl transport, no sink or observer.
    pub fn new(config: ClientConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder {
            config,
            transport: Arc::new(CurlTransport),
            sink: None,
            observer: None,
        }
    }

    /// Plain HTTP call. The payload is decoded per `options` shape.
    pub async fn request(&self, task: Task, options: CallOptions) -> Result<Response, Error> {
        if !matches!(task.kind(), TaskKind::Request { .. }) {
            return Err(Error::invalid_parameter("request expects a plain task"));
        }
        self.run_buffered(task, options).await
    }

    /// Multipart file upload. The server's reply is decoded like a plain
    /// request's.
    pub async fn upload(&self, task: Task, options: CallOptions) -> Result<Response, Error> {
        if !matches!(task.kind(), TaskKind::Upload { .. }) {
            return Err(Error::invalid_parameter("upload expects an upload task"));
        }
        self.run_buffered(task, options).await
    }

    /// Download into the task's target directory; resolves with the final
    /// file path. The transfer streams into a `.part` file and is moved into
    /// place only on success.
    pub async fn download(&self, task: Task, options: CallOptions) -> Result<PathBuf, Error> {
        let object = match task.kind() {
            TaskKind::Download { object } => object.clone(),
            _ => return Err(Error::invalid_parameter("download expects a download task")),
        };
        if !object.target_directory.is_dir() {
            return Err(Error::invalid_parameter(format!(
                "target directory {} does not exist",
                object.target_directory.display()
            )));
        }
        let started_at = SystemTime::now();
        let target = files::target_path(task.url(), &object.target_directory, object.overwrite)?;
        let temp = files::temp_path(&target);
        let prepared = request::build(
            &task,
            Delivery::File {
                temp_path: temp.clone(),
            },
        )?;

        let session_id = self.open(&task, &options)?;
        let overwrite = object.overwrite;
        let final_path = target.clone();
        let result = self
            .drive(&session_id, &task, &prepared, &options, started_at, move |reply| {
                let downloaded = reply
                    .location
                    .ok_or_else(|| Error::missing_value("download payload"))?;
                files::place(&downloaded, &final_path, overwrite)?;
                Ok(final_path.clone())
            })
            .await;
        if result.is_err() {
            let _ = std::fs::remove_file(&temp);
        }
        result
    }

    /// Cancel in-flight and pending work for the given URLs (all sessions
    /// when `None`). Fire-and-forget: affected calls resolve with a
    /// session-not-found error and no observer callback fires for them.
    pub fn stop_tasks(&self, urls: Option<&[String]>) {
        self.registry.stop_tasks(urls);
    }

    /// Number of currently open sessions.
    pub fn open_sessions(&self) -> usize {
        self.registry.session_count()
    }

    async fn run_buffered(&self, task: Task, options: CallOptions) -> Result<Response, Error> {
        let started_at = SystemTime::now();
        let prepared = request::build(&task, Delivery::Buffered)?;
        let session_id = self.open(&task, &options)?;
        let shape = options.shape;
        self.drive(&session_id, &task, &prepared, &options, started_at, move |reply| {
            let body = reply
                .body
                .ok_or_else(|| Error::missing_value("response payload"))?;
            decode(body, shape)
        })
        .await
    }

    fn open(&self, task: &Task, options: &CallOptions) -> Result<String, Error> {
        let retry_max = options
            .retry_count
            .unwrap_or(self.config.retry.default_retry_count);
        let mut default_headers: Vec<(String, String)> = self
            .config
            .default_headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        default_headers.sort();
        self.registry.open_session(
            task.event(),
            task.id(),
            task.url(),
            self.transport.as_ref(),
            SessionConfig {
                timeout: task.timeout().value(),
                default_headers,
                user_agent: self.config.user_agent.clone(),
            },
            retry_max,
        )
    }

    /// The attempt loop. Each iteration is one transport attempt against the
    /// same session; `finish` interprets a validated 200 reply. Returns the
    /// single terminal outcome for the call.
    async fn drive<T, F>(
        &self,
        session_id: &str,
        task: &Task,
        prepared: &PreparedRequest,
        options: &CallOptions,
        started_at: SystemTime,
        finish: F,
    ) -> Result<T, Error>
    where
        F: Fn(TransportReply) -> Result<T, Error>,
    {
        let retry_on = options.retry_on.unwrap_or(self.config.retry.retry_on);
        loop {
            // Defensive lookup before every attempt: the session may have
            // been stopped while a retry timer was pending. A vanished
            // session aborts quietly, without terminal callbacks.
            let (session, abort) = self.registry.transfer_handles(session_id)?;
            let attempt = self
                .registry
                .with_retry(session_id, |retry| retry.retry_count())?
                + 1;
            self.dispatcher.info(
                format!("send {}", task),
                Some(format!("session: {}, attempt: {}", session_id, attempt)),
            );

            let req = prepared.clone();
            let ctx = TransferContext {
                abort,
                progress: options.progress.clone(),
            };
            let reply = tokio::task::spawn_blocking(move || session.perform(&req, &ctx))
                .await
                .map_err(|e| Error::transport(format!("transport worker: {}", e), None))?;

            let error = match validate(reply).and_then(&finish) {
                Ok(outcome) => {
                    self.dispatcher
                        .info(format!("{} succeeded", task.event()), None);
                    self.dispatcher.succeeded(task.event(), started_at, task.url());
                    self.registry.close_session(session_id);
                    return Ok(outcome);
                }
                Err(error) => error,
            };

            // Retry decision: the internal counter, the classification knob
            // and the caller veto must all allow it.
            let wants_retry = match self.registry.with_retry(session_id, |r| r.needs_retry()) {
                Ok(wants) => wants,
                Err(gone) => return Err(gone),
            };
            let allowed = wants_retry
                && retry_on.allows(&error)
                && options.should_retry.as_ref().map_or(true, |veto| veto(&error));
            if !allowed {
                self.dispatcher
                    .error(format!("{} failed: {}", task.event(), error), None);
                self.dispatcher.failed(task.event(), &error, task.url());
                self.registry.close_session(session_id);
                return Err(error);
            }

            let (wakeup_tx, wakeup_rx) = tokio::sync::oneshot::channel();
            let (used, ceiling) = self.registry.with_retry(session_id, move |retry| {
                retry.attempt(move || {
                    let _ = wakeup_tx.send(());
                });
                (retry.retry_count(), retry.max_count())
            })?;
            self.dispatcher.warning(
                format!("{} failed, retry {}/{}: {}", task.event(), used, ceiling, error),
                None,
            );
            // A cancelled timer drops the sender; the lookup at the top of
            // the next iteration then reports the stopped session.
            let _ = wakeup_rx.await;
        }
    }
}

/// Fixed validation order: transport fault, then missing status, then
/// non-200 (any family), then the payload check in `finish`.
fn validate(mut reply: TransportReply) -> Result<TransportReply, Error> {
    if let Some(fault) = reply.fault.take() {
        return Err(Error::transport(fault.message, Some(fault.code)));
    }
    match reply.status {
        None => Err(Error::missing_value("status code")),
        Some(200) => Ok(reply),
        Some(status) => Err(Error::bad_status(status, reply.body)),
    }
}

fn decode(body: Vec<u8>, shape: ResponseShape) -> Result<Response, Error> {
    match shape {
        ResponseShape::Empty => Ok(Response::Empty),
        ResponseShape::Data => Ok(Response::Data(body)),
        ResponseShape::Json => match serde_json::from_slice(&body) {
            Ok(map) => Ok(Response::Json(map)),
            Err(e) => {
                Err(Error::serialization(format!("response body: {}", e)).with_body(body))
            }
        },
    }
}
