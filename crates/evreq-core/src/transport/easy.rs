//! curl-backed transport: one `Easy` handle per attempt.
//!
//! Each attempt configures a fresh handle from the session settings, so
//! retries never inherit state from a failed transfer. Cancellation rides
//! the progress callback: when the abort flag flips, the callback returns
//! false and libcurl tears the transfer down.

use std::fs::File;
use std::io::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use curl::easy::{Easy, Form, List};

use super::{
    Delivery, PreparedRequest, RequestBody, SessionConfig, TransferContext, Transport,
    TransportFault, TransportReply, TransportSession,
};
use crate::task::HttpMethod;

pub struct CurlTransport;

impl Transport for CurlTransport {
    fn open_session(&self, config: SessionConfig) -> Arc<dyn TransportSession> {
        Arc::new(CurlSession { config })
    }
}

/// Session state is just the fixed per-call settings; the handle itself is
/// rebuilt per attempt.
struct CurlSession {
    config: SessionConfig,
}

impl TransportSession for CurlSession {
    fn perform(&self, request: &PreparedRequest, ctx: &TransferContext) -> TransportReply {
        match self.perform_inner(request, ctx) {
            Ok(reply) => reply,
            Err(fault) => {
                if let Delivery::File { temp_path } = &request.delivery {
                    let _ = std::fs::remove_file(temp_path);
                }
                TransportReply {
                    fault: Some(fault),
                    ..Default::default()
                }
            }
        }
    }
}

impl From<curl::Error> for TransportFault {
    fn from(e: curl::Error) -> Self {
        TransportFault {
            code: i64::from(e.code()),
            message: e.to_string(),
        }
    }
}

impl From<curl::FormError> for TransportFault {
    fn from(e: curl::FormError) -> Self {
        TransportFault {
            code: -1,
            message: format!("multipart form: {}", e),
        }
    }
}

impl CurlSession {
    fn perform_inner(
        &self,
        request: &PreparedRequest,
        ctx: &TransferContext,
    ) -> Result<TransportReply, TransportFault> {
        let mut easy = Easy::new();
        easy.url(&request.url)?;
        easy.follow_location(true)?;
        easy.timeout(self.config.timeout)?;
        easy.connect_timeout(self.config.timeout)?;
        if !self.config.user_agent.is_empty() {
            easy.useragent(&self.config.user_agent)?;
        }

        match request.method {
            HttpMethod::Get => {}
            HttpMethod::Head => easy.nobody(true)?,
            HttpMethod::Post => easy.post(true)?,
            other => easy.custom_request(other.as_str())?,
        }

        let mut list = List::new();
        for (name, value) in self.merged_headers(request) {
            list.append(&format!("{}: {}", name.trim(), value.trim()))?;
        }

        match &request.body {
            RequestBody::None => {}
            RequestBody::Json(bytes) => {
                list.append("Content-Type: application/json")?;
                easy.post_fields_copy(bytes)?;
            }
            RequestBody::Multipart {
                field_name,
                file_name,
                mime,
                data,
            } => {
                let mut form = Form::new();
                form.part(field_name)
                    .buffer(file_name.as_str(), data.clone())
                    .content_type(mime)
                    .add()?;
                easy.httppost(form)?;
            }
        }
        easy.http_headers(list)?;
        easy.progress(true)?;

        let mut body_buf: Vec<u8> = Vec::new();
        let mut file_out = match &request.delivery {
            Delivery::Buffered => None,
            Delivery::File { temp_path } => Some(File::create(temp_path).map_err(|e| {
                TransportFault {
                    code: -1,
                    message: format!("create {}: {}", temp_path.display(), e),
                }
            })?),
        };
        let mut write_error: Option<std::io::Error> = None;

        {
            let abort = Arc::clone(&ctx.abort);
            let progress = ctx.progress.clone();
            let mut transfer = easy.transfer();
            transfer.progress_function(move |dl_total, dl_now, ul_total, ul_now| {
                if abort.load(Ordering::Relaxed) {
                    return false;
                }
                if let Some(cb) = &progress {
                    // Uploads report the upload side, downloads the download side.
                    let (total, now) = if ul_total > 0.0 {
                        (ul_total, ul_now)
                    } else {
                        (dl_total, dl_now)
                    };
                    if total > 0.0 {
                        cb((now / total) as f32);
                    }
                }
                true
            })?;
            transfer.write_function(|data| {
                match file_out.as_mut() {
                    Some(file) => {
                        if let Err(e) = file.write_all(data) {
                            write_error = Some(e);
                            // Short write makes libcurl abort the transfer.
                            return Ok(0);
                        }
                    }
                    None => body_buf.extend_from_slice(data),
                }
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        if let Some(e) = write_error {
            return Err(TransportFault {
                code: -1,
                message: format!("write response payload: {}", e),
            });
        }
        if let Some(file) = &file_out {
            let _ = file.sync_all();
        }

        let status = easy.response_code().ok().filter(|code| *code != 0);
        Ok(TransportReply {
            status,
            body: match &request.delivery {
                Delivery::Buffered => Some(body_buf),
                Delivery::File { .. } => None,
            },
            location: match &request.delivery {
                Delivery::Buffered => None,
                Delivery::File { temp_path } => Some(temp_path.clone()),
            },
            fault: None,
        })
    }

    /// Session defaults first, minus any name the request overrides.
    fn merged_headers<'a>(&'a self, request: &'a PreparedRequest) -> Vec<(&'a str, &'a str)> {
        let mut merged: Vec<(&str, &str)> = self
            .config
            .default_headers
            .iter()
            .filter(|(name, _)| {
                !request
                    .headers
                    .iter()
                    .any(|(n, _)| n.eq_ignore_ascii_case(name))
            })
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .collect();
        merged.extend(request.headers.iter().map(|(n, v)| (n.as_str(), v.as_str())));
        merged
    }
}
