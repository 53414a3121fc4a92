use std::sync::Arc;

use tokio::sync::watch;

use crate::models::AuthState;

/// Authentication state plus the bearer token that goes with it
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub state: AuthState,
    pub token: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Boundary to the auth collaborator
///
/// Login forms and token issuance live elsewhere; this handle only carries
/// their result. The sync engine subscribes to it and never writes to it.
#[derive(Clone)]
pub struct AuthHandle {
    tx: Arc<watch::Sender<Session>>,
}

impl AuthHandle {
    pub fn anonymous() -> Self {
        Self::with_session(Session {
            state: AuthState::Anonymous,
            token: None,
        })
    }

    pub fn authenticated(token: impl Into<String>) -> Self {
        Self::with_session(Session {
            state: AuthState::Authenticated,
            token: Some(token.into()),
        })
    }

    fn with_session(session: Session) -> Self {
        let (tx, _rx) = watch::channel(session);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> AuthState {
        self.tx.borrow().state
    }

    /// Current bearer token, if a session is established
    pub fn token(&self) -> Option<String> {
        self.tx.borrow().token.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// Marks a login as in progress
    pub fn begin_login(&self) {
        self.tx.send_if_modified(|session| {
            if session.state == AuthState::Anonymous {
                session.state = AuthState::Authenticating;
                true
            } else {
                false
            }
        });
    }

    pub fn login(&self, token: impl Into<String>) {
        let token = token.into();
        self.tx.send_if_modified(|session| {
            let changed = session.state != AuthState::Authenticated
                || session.token.as_deref() != Some(token.as_str());
            session.state = AuthState::Authenticated;
            session.token = Some(token);
            changed
        });
        tracing::info!("Session authenticated");
    }

    pub fn logout(&self) {
        let changed = self.tx.send_if_modified(|session| {
            let changed = session.state != AuthState::Anonymous;
            session.state = AuthState::Anonymous;
            session.token = None;
            changed
        });
        if changed {
            tracing::info!("Session ended");
        }
    }
}

impl Default for AuthHandle {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_logout_cycle() {
        let auth = AuthHandle::anonymous();
        assert_eq!(auth.state(), AuthState::Anonymous);
        assert_eq!(auth.token(), None);

        auth.begin_login();
        assert_eq!(auth.state(), AuthState::Authenticating);

        auth.login("jwt");
        assert_eq!(auth.state(), AuthState::Authenticated);
        assert_eq!(auth.token().as_deref(), Some("jwt"));

        auth.logout();
        assert_eq!(auth.state(), AuthState::Anonymous);
        assert_eq!(auth.token(), None);
    }

    #[test]
    fn test_begin_login_ignored_when_authenticated() {
        let auth = AuthHandle::authenticated("jwt");
        auth.begin_login();
        assert_eq!(auth.state(), AuthState::Authenticated);
    }

    #[tokio::test]
    async fn test_subscribers_see_only_real_changes() {
        let auth = AuthHandle::anonymous();
        let mut rx = auth.subscribe();

        auth.logout();
        assert!(!rx.has_changed().unwrap());

        auth.login("jwt");
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().state, AuthState::Authenticated);
    }

    #[test]
    fn test_debug_redacts_token() {
        let auth = AuthHandle::authenticated("super-secret");
        let rendered = format!("{:?}", *auth.subscribe().borrow());
        assert!(!rendered.contains("super-secret"));
    }
}
