use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::UnknownRole;

// --- Identity ---

/// Role
///
/// The closed set of account kinds the portal serves. Every lookup keyed by role
/// (dashboards, navigation tables) is an exhaustive `match` over this enum, so adding a
/// variant without wiring it up is a compile error rather than a runtime miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Tenant,
    Landlord,
    Agency,
    Maintenance,
}

impl Role {
    /// Every role, in the order the portal lists them.
    pub const ALL: [Role; 4] = [Role::Tenant, Role::Landlord, Role::Agency, Role::Maintenance];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Tenant => "tenant",
            Role::Landlord => "landlord",
            Role::Agency => "agency",
            Role::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tenant" => Ok(Role::Tenant),
            "landlord" => Ok(Role::Landlord),
            "agency" => Ok(Role::Agency),
            "maintenance" => Ok(Role::Maintenance),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Identity
///
/// The authenticated account as seen by the guard. Owned by the identity source; the
/// guard and navigation model only ever read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
    /// Deactivated accounts are treated exactly like anonymous visitors.
    pub is_active: bool,
}

/// Profile
///
/// Row of the `profiles` table. The role is stored as free text, so it is only trusted
/// once it parses into the closed `Role` set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub is_active: bool,
}

impl Profile {
    /// Converts the stored row into an `Identity`. A role outside the closed set fails
    /// closed: the profile is treated as if it did not exist.
    pub fn into_identity(self) -> Option<Identity> {
        match self.role.parse::<Role>() {
            Ok(role) => Some(Identity {
                id: self.id,
                role,
                is_active: self.is_active,
            }),
            Err(error) => {
                tracing::warn!(profile_id = %self.id, %error, "profile carries an unrecognised role");
                None
            }
        }
    }
}

// --- Routing ---

/// RouteSpec
///
/// A page the portal serves: its path pattern (axum syntax, `{param}` segments) and the
/// role required to view it. `None` means any active, authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RouteSpec {
    pub path: String,
    pub required_role: Option<Role>,
}

impl RouteSpec {
    pub fn new(path: impl Into<String>, required_role: Option<Role>) -> Self {
        Self {
            path: path.into(),
            required_role,
        }
    }
}

/// GuardDecision
///
/// The outcome of evaluating one navigation attempt. Created fresh per evaluation and
/// consumed immediately by the Route Guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "decision", rename_all = "snake_case")]
#[ts(export)]
pub enum GuardDecision {
    Render,
    RedirectTo { path: String },
    Pending,
}

impl GuardDecision {
    pub fn redirect(path: impl Into<String>) -> Self {
        Self::RedirectTo { path: path.into() }
    }
}

// --- Navigation ---

/// NavigationEntry
///
/// One item of the sidebar for the current role. `active` is computed from the path the
/// entries were derived for; use `is_active` to test against any other path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NavigationEntry {
    pub path: String,
    pub label: String,
    /// Icon name understood by the front end's icon set.
    pub icon: String,
    pub active: bool,
}

impl NavigationEntry {
    /// Prefix match on segment boundaries: `/tenant/maintenance` is active for
    /// `/tenant/maintenance/42` but not for `/tenant/maintenance-history`.
    pub fn is_active(&self, current_path: &str) -> bool {
        match current_path.strip_prefix(self.path.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

// --- Response Payloads ---

/// PageView
///
/// Body served for a guarded page once the guard renders it: the page the visitor asked
/// for, who they are, and the navigation to draw around it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PageView {
    pub path: String,
    pub identity: Identity,
    pub navigation: Vec<NavigationEntry>,
}

/// LoadingView
///
/// Neutral interstitial returned while the session check is still outstanding.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadingView {
    pub state: String,
    pub retry_after_secs: u64,
}

impl Default for LoadingView {
    fn default() -> Self {
        Self {
            state: "pending".to_string(),
            retry_after_secs: 1,
        }
    }
}
