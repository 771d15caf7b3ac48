//! Task descriptors: immutable values describing one logical call.
//!
//! A descriptor freezes everything the pipeline needs at construction time:
//! a process-unique id, the caller's event name (the correlation key for
//! logs and session identifiers), the target URL, timeout tier, headers and
//! parameters, and the variant-specific payload for uploads and downloads.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use serde_json::{Map, Value};

static NEXT_TASK_ID: AtomicI64 = AtomicI64::new(1);

/// Allocates the next process-unique task id. Strictly increasing, never
/// reused within the lifetime of the process.
pub(crate) fn next_task_id() -> i64 {
    NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed)
}

/// Caller-supplied name for a logical request. Used as a log key and as the
/// basis for session identifiers; not required to be unique across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEvent {
    name: String,
}

impl RequestEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RequestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Options,
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Trace,
    Connect,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Connect => "CONNECT",
        }
    }
}

/// Request timeout tier. A fixed lookup table plus a custom escape hatch;
/// plain requests default to `Medium`, uploads and downloads to `High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// 3 seconds.
    Low,
    /// 10 seconds.
    Medium,
    /// 20 seconds.
    High,
    Custom(Duration),
}

impl Timeout {
    pub fn value(&self) -> Duration {
        match self {
            Timeout::Low => Duration::from_secs(3),
            Timeout::Medium => Duration::from_secs(10),
            Timeout::High => Duration::from_secs(20),
            Timeout::Custom(d) => *d,
        }
    }
}

/// Closed set of upload MIME tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMime {
    Png,
    Zip,
    OctetStream,
}

impl FileMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMime::Png => "image/png",
            FileMime::Zip => "application/zip",
            FileMime::OctetStream => "application/octet-stream",
        }
    }
}

/// Payload of an upload task: where the bytes go on the server and what
/// they are.
#[derive(Debug, Clone)]
pub struct UploadObject {
    pub field_name: String,
    pub file_name: String,
    pub data: Vec<u8>,
    pub mime: FileMime,
}

impl UploadObject {
    pub fn new(
        field_name: impl Into<String>,
        file_name: impl Into<String>,
        data: Vec<u8>,
        mime: FileMime,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: file_name.into(),
            data,
            mime,
        }
    }
}

impl fmt::Display for UploadObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field: {}, file: {}, mime: {}, bytes: {}",
            self.field_name,
            self.file_name,
            self.mime.as_str(),
            self.data.len()
        )
    }
}

/// Destination of a download task.
#[derive(Debug, Clone)]
pub struct DownloadObject {
    pub target_directory: PathBuf,
    /// Replace an existing file with the same name instead of failing.
    pub overwrite: bool,
}

impl DownloadObject {
    pub fn new(target_directory: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            target_directory: target_directory.into(),
            overwrite,
        }
    }
}

/// Variant-specific part of a task.
#[derive(Debug, Clone)]
pub enum TaskKind {
    Request { method: HttpMethod },
    Upload { object: UploadObject },
    Download { object: DownloadObject },
}

/// Immutable descriptor for a plain request, an upload, or a download.
#[derive(Debug, Clone)]
pub struct Task {
    id: i64,
    event: RequestEvent,
    url: String,
    timeout: Timeout,
    headers: HashMap<String, String>,
    parameters: Map<String, Value>,
    kind: TaskKind,
}

impl Task {
    /// Plain HTTP call with the given method.
    pub fn request(event: RequestEvent, method: HttpMethod, url: impl Into<String>) -> Self {
        Self::new(event, url, Timeout::Medium, TaskKind::Request { method })
    }

    /// Multipart file upload (always POST).
    pub fn upload(event: RequestEvent, url: impl Into<String>, object: UploadObject) -> Self {
        Self::new(event, url, Timeout::High, TaskKind::Upload { object })
    }

    /// File download (always GET) into `object.target_directory`.
    pub fn download(event: RequestEvent, url: impl Into<String>, object: DownloadObject) -> Self {
        Self::new(event, url, Timeout::High, TaskKind::Download { object })
    }

    fn new(event: RequestEvent, url: impl Into<String>, timeout: Timeout, kind: TaskKind) -> Self {
        Self {
            id: next_task_id(),
            event,
            url: url.into(),
            timeout,
            headers: HashMap::new(),
            parameters: Map::new(),
            kind,
        }
    }

    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn event(&self) -> &RequestEvent {
        &self.event
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    /// Effective HTTP method: uploads are always POST, downloads always GET.
    pub fn method(&self) -> HttpMethod {
        match &self.kind {
            TaskKind::Request { method } => *method,
            TaskKind::Upload { .. } => HttpMethod::Post,
            TaskKind::Download { .. } => HttpMethod::Get,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.event, self.method().as_str(), self.url)?;
        if !self.parameters.is_empty() {
            let keys: Vec<&str> = self.parameters.keys().map(String::as_str).collect();
            write!(f, " parameters: [{}]", keys.join(", "))?;
        }
        Ok(())
    }
}
