//! Session Resolver: tracks the outstanding identity check for one navigation.
//!
//! The check runs asynchronously; callers can either snapshot it (`resolve`) and get
//! `pending = true` while it is outstanding, or wait for it (`settled`).

use tokio::sync::watch;

use crate::{
    auth::{Credentials, IdentityState},
    error::GuardError,
    models::Identity,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    Checking,
    Checked(Option<Identity>),
}

/// Resolution
///
/// Snapshot of the session check. `pending` and `identity == None` are distinct states:
/// the latter means "checked, unauthenticated".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub identity: Option<Identity>,
    pub pending: bool,
}

impl Resolution {
    pub fn pending() -> Self {
        Self {
            identity: None,
            pending: true,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            identity: None,
            pending: false,
        }
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            pending: false,
        }
    }
}

impl From<&SessionState> for Resolution {
    fn from(state: &SessionState) -> Self {
        match state {
            SessionState::Checking => Resolution::pending(),
            SessionState::Checked(identity) => Resolution {
                identity: identity.clone(),
                pending: false,
            },
        }
    }
}

/// SessionResolver
///
/// Read side of a session check. Cloning yields another reader of the same check.
#[derive(Debug, Clone)]
pub struct SessionResolver {
    rx: watch::Receiver<SessionState>,
}

/// SessionCompleter
///
/// Write side of a session check, held by whoever talks to the identity source.
#[derive(Debug)]
pub struct SessionCompleter {
    tx: watch::Sender<SessionState>,
}

impl SessionResolver {
    /// A check that has not completed yet, plus the handle that completes it.
    pub fn channel() -> (SessionCompleter, SessionResolver) {
        let (tx, rx) = watch::channel(SessionState::Checking);
        (SessionCompleter { tx }, SessionResolver { rx })
    }

    /// A check that already completed with `identity`.
    pub fn resolved(identity: Option<Identity>) -> Self {
        let (completer, resolver) = Self::channel();
        completer.complete(identity);
        resolver
    }

    /// Starts checking `credentials` against `provider` on the runtime.
    ///
    /// Failures are logged and collapse to "unauthenticated"; nothing is retried. The
    /// check lives only as long as some `SessionResolver` for it does: once the last one
    /// is dropped, the provider call is cancelled.
    pub fn spawn(provider: IdentityState, credentials: Credentials) -> Self {
        let (completer, resolver) = Self::channel();
        if credentials.is_empty() {
            completer.complete(None);
            return resolver;
        }
        tokio::spawn(async move {
            tokio::select! {
                result = provider.current_identity(&credentials) => match result {
                    Ok(identity) => completer.complete(identity),
                    Err(error) => completer.fail(error),
                },
                _ = completer.tx.closed() => {
                    tracing::debug!("session check no longer observed; cancelling");
                }
            }
        });
        resolver
    }

    /// Current state of the check without waiting.
    pub fn resolve(&self) -> Resolution {
        let resolution = Resolution::from(&*self.rx.borrow());
        // A completer dropped mid-check can never finish it.
        if resolution.pending && self.rx.has_changed().is_err() {
            return Resolution::unauthenticated();
        }
        resolution
    }

    /// Waits until the check completes.
    pub async fn settled(&mut self) -> Resolution {
        match self
            .rx
            .wait_for(|state| !matches!(state, SessionState::Checking))
            .await
        {
            Ok(state) => Resolution::from(&*state),
            Err(_) => {
                tracing::warn!("session check abandoned before completing");
                Resolution::unauthenticated()
            }
        }
    }
}

impl SessionCompleter {
    pub fn complete(&self, identity: Option<Identity>) {
        self.tx.send_replace(SessionState::Checked(identity));
    }

    pub fn fail(&self, error: GuardError) {
        tracing::warn!(%error, "session check failed; treating visitor as unauthenticated");
        self.complete(None);
    }

    /// The "logged out" signal from the identity source.
    pub fn sign_out(&self) {
        tracing::debug!("session signed out");
        self.complete(None);
    }

    /// Puts the check back to Unresolved, e.g. after the account's role changed. The
    /// caller is expected to complete it again with fresh data.
    pub fn invalidate(&self) {
        self.tx.send_replace(SessionState::Checking);
    }
}
