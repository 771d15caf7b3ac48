//! Transport seam: the narrow interface the pipeline drives HTTP through.
//!
//! The pipeline never touches wire-level HTTP. It opens one transport
//! session per logical call, hands it fully assembled [`PreparedRequest`]s,
//! and reads back a [`TransportReply`] of status, payload and fault. The
//! production implementation sits in [`easy`]; tests substitute scripted
//! sessions.

pub mod easy;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use crate::task::HttpMethod;

/// Request body handed to the transport. Multipart encoding is the
/// transport's job; the pipeline only names the parts.
#[derive(Debug, Clone)]
pub enum RequestBody {
    None,
    /// JSON-encoded parameter map, sent with `Content-Type: application/json`.
    Json(Vec<u8>),
    Multipart {
        field_name: String,
        file_name: String,
        mime: &'static str,
        data: Vec<u8>,
    },
}

/// Where the response payload lands: in memory, or streamed to a temp file
/// (downloads).
#[derive(Debug, Clone)]
pub enum Delivery {
    Buffered,
    File { temp_path: PathBuf },
}

/// Fully assembled request, ready for one transport attempt.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    /// Final URL including any merged query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    pub delivery: Delivery,
}

/// Fraction-complete callback, `0.0..=1.0`.
pub type ProgressFn = Arc<dyn Fn(f32) + Send + Sync>;

/// Per-transfer context: cooperative cancellation plus optional progress
/// reporting. The transport must observe `abort` promptly mid-transfer.
#[derive(Clone)]
pub struct TransferContext {
    pub abort: Arc<AtomicBool>,
    pub progress: Option<ProgressFn>,
}

/// Transport-level failure, before any HTTP semantics apply.
#[derive(Debug, Clone)]
pub struct TransportFault {
    pub code: i64,
    pub message: String,
}

/// Outcome of a single transport attempt.
#[derive(Debug, Clone, Default)]
pub struct TransportReply {
    /// HTTP status, when a response line was received at all.
    pub status: Option<u32>,
    /// Response payload for buffered deliveries.
    pub body: Option<Vec<u8>>,
    /// Temp-file location for file deliveries that completed.
    pub location: Option<PathBuf>,
    pub fault: Option<TransportFault>,
}

/// Fixed settings for every attempt within one session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub timeout: Duration,
    /// Merged under the request's own headers (request headers win).
    pub default_headers: Vec<(String, String)>,
    pub user_agent: String,
}

/// Factory for per-call transport sessions.
pub trait Transport: Send + Sync {
    fn open_session(&self, config: SessionConfig) -> Arc<dyn TransportSession>;
}

/// One transport session, performing the attempts of a single logical call.
///
/// `perform` blocks the calling thread for the duration of the transfer; the
/// pipeline invokes it on the blocking pool. It never panics on transfer
/// problems; failures come back in `TransportReply::fault`.
pub trait TransportSession: Send + Sync {
    fn perform(&self, request: &PreparedRequest, ctx: &TransferContext) -> TransportReply;
}
