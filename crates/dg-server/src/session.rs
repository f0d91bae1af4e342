//! Session management.
//!
//! The registry is the process-wide table of live connections and enforces
//! the connection cap. Each [`Session`] tracks its in-flight requests and
//! their cancellation handles; the session holds only the handle, never the
//! request state itself, which belongs exclusively to the orchestrator
//! task. Closing a connection cancels the session token, which cascades to
//! every in-flight request token.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Why a request could not be admitted.
#[derive(Debug, PartialEq, Eq)]
pub enum AdmitError {
    /// The per-session concurrent request cap is reached.
    TooManyRequests {
        /// The configured cap.
        limit: usize,
    },
    /// A request with this id is already in flight on this connection.
    DuplicateRequestId,
}

/// Per-connection session state.
pub struct Session {
    /// Connection id (distinct from the client-supplied session id).
    pub conn_id: Uuid,
    /// Opaque client session tag.
    pub session_id: String,
    /// Opaque client user tag.
    pub user_id: String,
    /// Cancelled when the connection closes.
    pub token: CancellationToken,
    /// When the connection was accepted.
    pub created_at: Instant,
    max_requests: usize,
    requests: Mutex<HashMap<String, CancellationToken>>,
}

impl Session {
    fn new(session_id: String, user_id: String, max_requests: usize) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            session_id,
            user_id,
            token: CancellationToken::new(),
            created_at: Instant::now(),
            max_requests,
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Admit a request, returning its cancellation token.
    ///
    /// The token is a child of the session token, so a closing connection
    /// cancels every admitted request. A request rejected here does not
    /// count toward the cap and has no cancellation handle.
    ///
    /// # Errors
    ///
    /// [`AdmitError::TooManyRequests`] over the cap,
    /// [`AdmitError::DuplicateRequestId`] for a reused id.
    pub fn admit_request(&self, request_id: &str) -> Result<CancellationToken, AdmitError> {
        let mut requests = self
            .requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if requests.contains_key(request_id) {
            return Err(AdmitError::DuplicateRequestId);
        }
        if requests.len() >= self.max_requests {
            return Err(AdmitError::TooManyRequests {
                limit: self.max_requests,
            });
        }
        let token = self.token.child_token();
        requests.insert(request_id.to_owned(), token.clone());
        Ok(token)
    }

    /// Signal cancellation for a request. Returns whether it was in flight.
    pub fn cancel_request(&self, request_id: &str) -> bool {
        let requests = self
            .requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        requests.get(request_id).is_some_and(|token| {
            token.cancel();
            true
        })
    }

    /// Drop a finished request from the registry.
    pub fn finish_request(&self, request_id: &str) {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(request_id);
    }

    /// Number of in-flight requests.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

/// Process-wide table of live sessions.
pub struct SessionRegistry {
    max_connections: usize,
    max_requests_per_session: usize,
    sessions: Mutex<HashMap<Uuid, std::sync::Arc<Session>>>,
}

impl SessionRegistry {
    /// Registry with the given caps.
    #[must_use]
    pub fn new(max_connections: usize, max_requests_per_session: usize) -> Self {
        Self {
            max_connections,
            max_requests_per_session,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new connection. Returns `None` at the connection cap.
    #[must_use]
    pub fn register(
        &self,
        session_id: String,
        user_id: String,
    ) -> Option<std::sync::Arc<Session>> {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if sessions.len() >= self.max_connections {
            return None;
        }
        let session = std::sync::Arc::new(Session::new(
            session_id,
            user_id,
            self.max_requests_per_session,
        ));
        sessions.insert(session.conn_id, std::sync::Arc::clone(&session));
        Some(session)
    }

    /// Remove a connection, cancelling all of its in-flight requests.
    pub fn unregister(&self, conn_id: Uuid) {
        let session = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&conn_id);
        if let Some(session) = session {
            session.token.cancel();
        }
    }

    /// Number of live connections.
    #[must_use]
    pub fn active(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(2, 2)
    }

    #[test]
    fn test_connection_cap() {
        let registry = registry();
        let a = registry.register("s1".to_owned(), "u1".to_owned()).unwrap();
        let _b = registry.register("s2".to_owned(), "u2".to_owned()).unwrap();
        assert!(registry.register("s3".to_owned(), "u3".to_owned()).is_none());
        assert_eq!(registry.active(), 2);

        // Freeing a slot admits a new connection
        registry.unregister(a.conn_id);
        assert!(registry.register("s3".to_owned(), "u3".to_owned()).is_some());
    }

    #[test]
    fn test_request_cap_and_duplicates() {
        let registry = registry();
        let session = registry.register("s".to_owned(), "u".to_owned()).unwrap();

        let _t1 = session.admit_request("r1").unwrap();
        let _t2 = session.admit_request("r2").unwrap();
        assert_eq!(
            session.admit_request("r3").unwrap_err(),
            AdmitError::TooManyRequests { limit: 2 }
        );
        assert_eq!(
            session.admit_request("r1").unwrap_err(),
            AdmitError::DuplicateRequestId
        );

        // A rejected request did not consume a slot
        session.finish_request("r1");
        assert!(session.admit_request("r3").is_ok());
    }

    #[test]
    fn test_cancel_request_signals_token() {
        let registry = registry();
        let session = registry.register("s".to_owned(), "u".to_owned()).unwrap();
        let token = session.admit_request("r1").unwrap();

        assert!(!token.is_cancelled());
        assert!(session.cancel_request("r1"));
        assert!(token.is_cancelled());
        assert!(!session.cancel_request("unknown"));
    }

    #[test]
    fn test_unregister_cancels_all_requests() {
        let registry = registry();
        let session = registry.register("s".to_owned(), "u".to_owned()).unwrap();
        let t1 = session.admit_request("r1").unwrap();
        let t2 = session.admit_request("r2").unwrap();

        registry.unregister(session.conn_id);
        assert!(t1.is_cancelled());
        assert!(t2.is_cancelled());
        assert_eq!(registry.active(), 0);
    }
}
