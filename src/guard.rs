//! Route Guard: composes the Session Resolver and the Role Policy for one navigation.
//!
//! `decide` stays pure; this is the only place that calls `Navigator::navigate`, and it
//! does so at most once per evaluation. Redirects and loading states never invoke the
//! page's `children`.

use std::{sync::Arc, time::Duration};

use crate::{
    models::{GuardDecision, Identity, RouteSpec},
    policy::{self, AUTH_PATH},
    session::{Resolution, SessionResolver},
};

/// Navigator
///
/// The router collaborator.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, path: &str);
}

impl<N: Navigator + ?Sized> Navigator for Arc<N> {
    fn current_path(&self) -> String {
        (**self).current_path()
    }

    fn navigate(&self, path: &str) {
        (**self).navigate(path)
    }
}

/// What the guard did for a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome<T> {
    /// The session check is outstanding; show a neutral loading indicator.
    Loading,
    /// The visitor was sent elsewhere; the page was not rendered.
    Redirected(String),
    /// The page rendered with the resolved identity.
    Rendered(T),
    /// The visitor left the path before the check completed; nothing was committed.
    Discarded,
}

pub struct RouteGuard<N> {
    navigator: N,
    settle_timeout: Option<Duration>,
}

impl<N: Navigator> RouteGuard<N> {
    pub fn new(navigator: N) -> Self {
        Self {
            navigator,
            settle_timeout: None,
        }
    }

    /// Bounds how long `guard` waits for the session check before answering `Loading`.
    pub fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = Some(timeout);
        self
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Evaluates the current snapshot of `session` without waiting.
    pub fn evaluate<T, F>(
        &self,
        spec: &RouteSpec,
        session: &SessionResolver,
        children: F,
    ) -> GuardOutcome<T>
    where
        F: FnOnce(&Identity) -> T,
    {
        let path = self.navigator.current_path();
        let resolution = session.resolve();
        self.commit(&path, spec, resolution, children)
    }

    /// Waits for `session` to settle (up to the settle timeout, if any), then commits the
    /// decision for the path that was current when the guard was invoked.
    pub async fn guard<T, F>(
        &self,
        spec: &RouteSpec,
        mut session: SessionResolver,
        children: F,
    ) -> GuardOutcome<T>
    where
        F: FnOnce(&Identity) -> T,
    {
        let issued_for = self.navigator.current_path();

        let resolution = match self.settle_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, session.settled()).await {
                Ok(resolution) => resolution,
                Err(_) => {
                    tracing::debug!(path = %issued_for, ?timeout, "session check still outstanding");
                    Resolution::pending()
                }
            },
            None => session.settled().await,
        };

        let current = self.navigator.current_path();
        if current != issued_for {
            tracing::debug!(issued_for = %issued_for, current = %current, "discarding stale navigation");
            return GuardOutcome::Discarded;
        }

        self.commit(&issued_for, spec, resolution, children)
    }

    fn commit<T, F>(
        &self,
        path: &str,
        spec: &RouteSpec,
        resolution: Resolution,
        children: F,
    ) -> GuardOutcome<T>
    where
        F: FnOnce(&Identity) -> T,
    {
        match policy::decide(path, spec.required_role, &resolution) {
            GuardDecision::Pending => GuardOutcome::Loading,
            GuardDecision::RedirectTo { path: target } => self.redirect(target),
            GuardDecision::Render => match resolution.identity.as_ref() {
                Some(identity) => GuardOutcome::Rendered(children(identity)),
                // decide() only renders with an identity; fail closed regardless.
                None => self.redirect(AUTH_PATH.to_string()),
            },
        }
    }

    fn redirect<T>(&self, target: String) -> GuardOutcome<T> {
        self.navigator.navigate(&target);
        GuardOutcome::Redirected(target)
    }
}

/// RequestNavigator
///
/// Navigator for a single HTTP request: the current path is the request path, and a
/// redirect is answered by the middleware with a `303 See Other`.
pub struct RequestNavigator {
    path: String,
}

impl RequestNavigator {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Navigator for RequestNavigator {
    fn current_path(&self) -> String {
        self.path.clone()
    }

    fn navigate(&self, path: &str) {
        tracing::debug!(from = %self.path, to = path, "redirect issued");
    }
}
