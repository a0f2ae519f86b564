use async_trait::async_trait;
use estate_portal::{
    auth::{Credentials, IdentityProvider, IdentityState},
    error::GuardError,
    models::{Identity, Role},
    session::{Resolution, SessionResolver},
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use uuid::Uuid;

// --- Fake Identity Sources ---

struct FixedProvider(Result<Option<Identity>, GuardError>);

#[async_trait]
impl IdentityProvider for FixedProvider {
    async fn current_identity(
        &self,
        _credentials: &Credentials,
    ) -> Result<Option<Identity>, GuardError> {
        self.0.clone()
    }
}

/// Never answers. Records when its in-flight call is dropped.
#[derive(Default)]
struct HangingProvider {
    cancelled: Arc<AtomicBool>,
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for HangingProvider {
    async fn current_identity(
        &self,
        _credentials: &Credentials,
    ) -> Result<Option<Identity>, GuardError> {
        let _armed = SetOnDrop(self.cancelled.clone());
        std::future::pending::<()>().await;
        Ok(None)
    }
}

fn tenant() -> Identity {
    Identity {
        id: Uuid::from_u128(7),
        role: Role::Tenant,
        is_active: true,
    }
}

fn provider(result: Result<Option<Identity>, GuardError>) -> IdentityState {
    Arc::new(FixedProvider(result))
}

// --- Tests ---

#[tokio::test]
async fn test_channel_is_pending_until_completed() {
    let (completer, mut resolver) = SessionResolver::channel();
    assert_eq!(resolver.resolve(), Resolution::pending());

    completer.complete(Some(tenant()));

    assert_eq!(resolver.resolve(), Resolution::authenticated(tenant()));
    assert_eq!(resolver.settled().await, Resolution::authenticated(tenant()));
}

#[tokio::test]
async fn test_checked_and_unauthenticated_is_not_pending() {
    let resolver = SessionResolver::resolved(None);
    let resolution = resolver.resolve();
    assert!(!resolution.pending);
    assert!(resolution.identity.is_none());
}

#[tokio::test]
async fn test_settled_waits_for_late_completion() {
    let (completer, mut resolver) = SessionResolver::channel();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        completer.complete(Some(tenant()));
    });
    assert_eq!(resolver.settled().await, Resolution::authenticated(tenant()));
}

#[tokio::test]
async fn test_spawn_resolves_identity_from_provider() {
    let mut resolver =
        SessionResolver::spawn(provider(Ok(Some(tenant()))), Credentials::bearer("token"));
    assert_eq!(resolver.settled().await, Resolution::authenticated(tenant()));
}

#[tokio::test]
async fn test_failed_check_collapses_to_unauthenticated() {
    let failing = provider(Err(GuardError::SessionCheckFailed("backend down".into())));
    let mut resolver = SessionResolver::spawn(failing, Credentials::bearer("token"));
    assert_eq!(resolver.settled().await, Resolution::unauthenticated());
}

#[tokio::test]
async fn test_empty_credentials_skip_the_provider() {
    // The provider would fail; with no credentials it must not even be asked.
    let failing = provider(Err(GuardError::SessionCheckFailed("unreachable".into())));
    let resolver = SessionResolver::spawn(failing, Credentials::default());
    assert_eq!(resolver.resolve(), Resolution::unauthenticated());
}

#[tokio::test]
async fn test_dropped_completer_fails_closed() {
    let (completer, mut resolver) = SessionResolver::channel();
    drop(completer);
    assert_eq!(resolver.resolve(), Resolution::unauthenticated());
    assert_eq!(resolver.settled().await, Resolution::unauthenticated());
}

#[tokio::test]
async fn test_sign_out_and_invalidate() {
    let (completer, resolver) = SessionResolver::channel();
    completer.complete(Some(tenant()));
    assert!(resolver.resolve().identity.is_some());

    completer.sign_out();
    assert_eq!(resolver.resolve(), Resolution::unauthenticated());

    // A role switch re-runs the check from Unresolved.
    completer.invalidate();
    assert_eq!(resolver.resolve(), Resolution::pending());

    let landlord = Identity {
        role: Role::Landlord,
        ..tenant()
    };
    completer.complete(Some(landlord.clone()));
    assert_eq!(resolver.resolve(), Resolution::authenticated(landlord));
}

#[tokio::test]
async fn test_check_is_cancelled_when_last_reader_drops() {
    let hanging = HangingProvider::default();
    let cancelled = hanging.cancelled.clone();

    let resolver = SessionResolver::spawn(Arc::new(hanging), Credentials::bearer("token"));
    let second_reader = resolver.clone();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(resolver.resolve(), Resolution::pending());

    // One reader left: the check keeps running.
    drop(resolver);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!cancelled.load(Ordering::SeqCst));

    drop(second_reader);
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cancelled.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("provider call still running after every reader dropped");
}
