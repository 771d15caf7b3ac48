//! Log sink, terminal-outcome observer, and the callback dispatcher.
//!
//! Every sink and observer call is queued onto one forwarder task, so
//! callbacks arrive in order and never run on the network path or inside a
//! registry lock. Events are always mirrored into `tracing`, with or
//! without an installed sink.

use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::mpsc;

use crate::error::Error;
use crate::task::RequestEvent;

/// External log consumer.
pub trait LogSink: Send + Sync {
    fn info(&self, message: &str, extra: Option<&str>);
    fn warning(&self, message: &str, extra: Option<&str>);
    fn error(&self, message: &str, extra: Option<&str>);
}

/// Observer of terminal outcomes. Absent observers are simply skipped.
pub trait ClientObserver: Send + Sync {
    fn request_succeeded(&self, event: &RequestEvent, started_at: SystemTime, url: &str);
    fn request_failed(&self, event: &RequestEvent, error: &Error, url: &str);
}

enum CallbackEvent {
    Info {
        message: String,
        extra: Option<String>,
    },
    Warning {
        message: String,
        extra: Option<String>,
    },
    ErrorLog {
        message: String,
        extra: Option<String>,
    },
    Succeeded {
        event: RequestEvent,
        started_at: SystemTime,
        url: String,
    },
    Failed {
        event: RequestEvent,
        error: Error,
        url: String,
    },
}

/// Handle for queueing callback events; cheap to clone. Dropping the last
/// handle shuts the forwarder task down.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<CallbackEvent>,
}

impl Dispatcher {
    /// Spawn the forwarder task. Must be called from within a runtime.
    pub fn spawn(
        sink: Option<Arc<dyn LogSink>>,
        observer: Option<Arc<dyn ClientObserver>>,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                forward(event, sink.as_deref(), observer.as_deref());
            }
        });
        Self { tx }
    }

    pub fn info(&self, message: impl Into<String>, extra: Option<String>) {
        let _ = self.tx.send(CallbackEvent::Info {
            message: message.into(),
            extra,
        });
    }

    pub fn warning(&self, message: impl Into<String>, extra: Option<String>) {
        let _ = self.tx.send(CallbackEvent::Warning {
            message: message.into(),
            extra,
        });
    }

    pub fn error(&self, message: impl Into<String>, extra: Option<String>) {
        let _ = self.tx.send(CallbackEvent::ErrorLog {
            message: message.into(),
            extra,
        });
    }

    pub fn succeeded(&self, event: &RequestEvent, started_at: SystemTime, url: &str) {
        let _ = self.tx.send(CallbackEvent::Succeeded {
            event: event.clone(),
            started_at,
            url: url.to_string(),
        });
    }

    pub fn failed(&self, event: &RequestEvent, error: &Error, url: &str) {
        let _ = self.tx.send(CallbackEvent::Failed {
            event: event.clone(),
            error: error.clone(),
            url: url.to_string(),
        });
    }
}

fn forward(event: CallbackEvent, sink: Option<&dyn LogSink>, observer: Option<&dyn ClientObserver>) {
    match event {
        CallbackEvent::Info { message, extra } => {
            tracing::info!(extra = extra.as_deref().unwrap_or(""), "{}", message);
            if let Some(sink) = sink {
                sink.info(&message, extra.as_deref());
            }
        }
        CallbackEvent::Warning { message, extra } => {
            tracing::warn!(extra = extra.as_deref().unwrap_or(""), "{}", message);
            if let Some(sink) = sink {
                sink.warning(&message, extra.as_deref());
            }
        }
        CallbackEvent::ErrorLog { message, extra } => {
            tracing::error!(extra = extra.as_deref().unwrap_or(""), "{}", message);
            if let Some(sink) = sink {
                sink.error(&message, extra.as_deref());
            }
        }
        CallbackEvent::Succeeded {
            event,
            started_at,
            url,
        } => {
            tracing::info!(event = %event, url = %url, "request succeeded");
            if let Some(observer) = observer {
                observer.request_succeeded(&event, started_at, &url);
            }
        }
        CallbackEvent::Failed { event, error, url } => {
            tracing::error!(event = %event, url = %url, error = %error, "request failed");
            if let Some(observer) = observer {
                observer.request_failed(&event, &error, &url);
            }
        }
    }
}
