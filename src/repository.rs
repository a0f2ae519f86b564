use crate::{error::GuardError, models::Profile};
use async_trait::async_trait;
use sqlx::PgPool;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};
use uuid::Uuid;

/// Repository Trait
///
/// The profile store behind the JWT identity source. Only read access is needed: the
/// guard never writes identities.
///
/// `Ok(None)` means "no such account"; `Err` means the store itself could not answer and
/// is surfaced as a failed session check.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, GuardError>;
}

/// RepositoryState
///
/// The concrete type used to share the profile store across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by the `profiles` table.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, GuardError> {
        sqlx::query_as::<_, Profile>(
            "SELECT id, email, role, is_active FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GuardError::SessionCheckFailed(format!("profile lookup failed: {e}")))
    }
}

/// InMemoryRepository
///
/// Map-backed store for tests and local demos. `new_failing` simulates an unreachable
/// database so the fail-closed path can be exercised.
#[derive(Default)]
pub struct InMemoryRepository {
    profiles: RwLock<HashMap<Uuid, Profile>>,
    should_fail: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            profiles: RwLock::default(),
            should_fail: true,
        }
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        Self {
            profiles: RwLock::new(profiles.into_iter().map(|p| (p.id, p)).collect()),
            should_fail: false,
        }
    }

    /// Adds or replaces a profile. Fails if a writer panicked while holding the store.
    pub fn insert(&self, profile: Profile) -> Result<(), GuardError> {
        let mut profiles = self.profiles.write().map_err(|_| {
            tracing::warn!(user_id = %profile.id, "profile store poisoned; insert dropped");
            GuardError::SessionCheckFailed("profile store poisoned".to_string())
        })?;
        profiles.insert(profile.id, profile);
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, GuardError> {
        if self.should_fail {
            return Err(GuardError::SessionCheckFailed(
                "in-memory store configured to fail".to_string(),
            ));
        }
        let profiles = self
            .profiles
            .read()
            .map_err(|_| GuardError::SessionCheckFailed("profile store poisoned".to_string()))?;
        Ok(profiles.get(&id).cloned())
    }
}
