//! Session registry: the shared mutable state of the pipeline.
//!
//! One entry per logical call, keyed by `"{event}-{task_id}"`. Each entry
//! pairs the transport session with the retry policy and the abort token for
//! in-flight transfers. Sessions are never reused across logically distinct
//! calls; retries of the same task keep the same entry. All access goes
//! through one mutex with tiny critical sections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::Error;
use crate::retry::RetryPolicy;
use crate::task::RequestEvent;
use crate::transport::{SessionConfig, Transport, TransportSession};

/// Everything owned by one logical call. Created at open, destroyed at
/// close, both exactly once.
struct SessionEntry {
    transport: Arc<dyn TransportSession>,
    retry: RetryPolicy,
    url: String,
    abort: Arc<AtomicBool>,
}

#[derive(Default)]
pub struct SessionRegistry {
    entries: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `task_id`: construct the transport session and the
    /// retry policy, store them under `"{event}-{task_id}"`, return the id.
    /// Fails with a collision error if the id is somehow already present.
    pub fn open_session(
        &self,
        event: &RequestEvent,
        task_id: i64,
        url: &str,
        transport: &dyn Transport,
        config: SessionConfig,
        retry_max: u32,
    ) -> Result<String, Error> {
        let session_id = format!("{}-{}", event.name(), task_id);
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(&session_id) {
            return Err(Error::task_id_collision(task_id));
        }
        entries.insert(
            session_id.clone(),
            SessionEntry {
                transport: transport.open_session(config),
                retry: RetryPolicy::new(retry_max),
                url: url.to_string(),
                abort: Arc::new(AtomicBool::new(false)),
            },
        );
        Ok(session_id)
    }

    /// Remove the session unconditionally. Idempotent.
    pub fn close_session(&self, session_id: &str) {
        self.entries.lock().unwrap().remove(session_id);
    }

    /// Transport session and abort token for one attempt. Fails once the
    /// session has been closed or stopped; a retry firing after removal is
    /// expected to land here and abort quietly.
    pub fn transfer_handles(
        &self,
        session_id: &str,
    ) -> Result<(Arc<dyn TransportSession>, Arc<AtomicBool>), Error> {
        let entries = self.entries.lock().unwrap();
        let entry = entries
            .get(session_id)
            .ok_or_else(|| Error::session_not_found(session_id))?;
        Ok((Arc::clone(&entry.transport), Arc::clone(&entry.abort)))
    }

    /// Run `f` against the session's retry policy.
    pub fn with_retry<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut RetryPolicy) -> T,
    ) -> Result<T, Error> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get_mut(session_id)
            .ok_or_else(|| Error::session_not_found(session_id))?;
        Ok(f(&mut entry.retry))
    }

    /// Abort and remove every session whose URL is in `urls` (all sessions
    /// when `None`). In-flight transfers see the abort token; pending retry
    /// timers are cancelled; late completions find no entry and no-op.
    pub fn stop_tasks(&self, urls: Option<&[String]>) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, entry| {
            let matches = urls.map_or(true, |urls| urls.iter().any(|u| u == &entry.url));
            if matches {
                entry.abort.store(true, Ordering::Relaxed);
                entry.retry.cancel();
            }
            !matches
        });
    }

    pub fn session_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{PreparedRequest, TransferContext, TransportReply};

    struct NullTransport;

    impl Transport for NullTransport {
        fn open_session(&self, _config: SessionConfig) -> Arc<dyn TransportSession> {
            Arc::new(NullSession)
        }
    }

    struct NullSession;

    impl TransportSession for NullSession {
        fn perform(&self, _request: &PreparedRequest, _ctx: &TransferContext) -> TransportReply {
            TransportReply::default()
        }
    }

    fn open(registry: &SessionRegistry, event: &str, task_id: i64, url: &str) -> String {
        registry
            .open_session(
                &RequestEvent::new(event),
                task_id,
                url,
                &NullTransport,
                SessionConfig::default(),
                0,
            )
            .unwrap()
    }

    #[tokio::test]
    async fn session_id_combines_event_and_task_id() {
        let registry = SessionRegistry::new();
        let id = open(&registry, "login", 7, "http://x/");
        assert_eq!(id, "login-7");
    }

    #[tokio::test]
    async fn close_session_is_idempotent() {
        let registry = SessionRegistry::new();
        let id = open(&registry, "a", 1, "http://x/");
        assert_eq!(registry.session_count(), 1);
        registry.close_session(&id);
        registry.close_session(&id);
        assert_eq!(registry.session_count(), 0);
    }

    #[tokio::test]
    async fn lookup_after_close_fails() {
        let registry = SessionRegistry::new();
        let id = open(&registry, "a", 1, "http://x/");
        registry.close_session(&id);
        assert!(registry.transfer_handles(&id).is_err());
        assert!(registry.with_retry(&id, |r| r.needs_retry()).is_err());
    }

    #[tokio::test]
    async fn duplicate_open_collides() {
        let registry = SessionRegistry::new();
        open(&registry, "a", 1, "http://x/");
        let err = registry
            .open_session(
                &RequestEvent::new("a"),
                1,
                "http://x/",
                &NullTransport,
                SessionConfig::default(),
                0,
            )
            .unwrap_err();
        assert!(matches!(
            err.kind,
            crate::error::ErrorKind::TaskIdCollision(1)
        ));
    }

    #[tokio::test]
    async fn stop_tasks_matches_urls() {
        let registry = SessionRegistry::new();
        let a = open(&registry, "a", 1, "http://one/");
        let b = open(&registry, "b", 2, "http://two/");
        let (_, abort_a) = registry.transfer_handles(&a).unwrap();

        registry.stop_tasks(Some(&["http://one/".to_string()]));
        assert!(abort_a.load(Ordering::Relaxed), "matching session aborted");
        assert!(registry.transfer_handles(&a).is_err());
        assert!(registry.transfer_handles(&b).is_ok());
    }

    #[tokio::test]
    async fn stop_tasks_without_urls_clears_everything() {
        let registry = SessionRegistry::new();
        open(&registry, "a", 1, "http://one/");
        open(&registry, "b", 2, "http://two/");
        registry.stop_tasks(None);
        assert_eq!(registry.session_count(), 0);
    }
}
