use thiserror::Error;

use crate::models::Role;

/// GuardError
///
/// The failure taxonomy of the access guard. Only `SessionCheckFailed` can occur while
/// serving traffic, and it is always collapsed into "unauthenticated" by the Session
/// Resolver. The remaining variants are configuration errors that must stop the process
/// at startup (or fail a test) instead of producing a redirect to an invalid path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    /// The identity source could not be reached or answered with a server error.
    #[error("session check failed: {0}")]
    SessionCheckFailed(String),

    /// A role has no registered default dashboard route to redirect to.
    #[error("role `{0}` has no default dashboard route registered")]
    MissingRoleMapping(Role),

    /// A route declaration references a role outside the closed role set.
    #[error("route `{path}` requires unknown role `{role}`")]
    UnknownRequiredRole { path: String, role: String },

    /// The same path pattern was declared twice.
    #[error("route `{0}` is declared more than once")]
    DuplicateRoute(String),
}

impl GuardError {
    /// Configuration errors are fatal; everything else degrades to "redirect to login".
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::SessionCheckFailed(_))
    }
}

/// Returned by `Role::from_str` for names outside tenant/landlord/agency/maintenance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);
