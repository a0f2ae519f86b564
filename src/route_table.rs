use std::collections::HashSet;

use crate::{
    error::GuardError,
    models::{Role, RouteSpec},
    policy::default_dashboard,
};

// Every page the portal serves, with the role it requires (`None`: any active account).
const STANDARD_ROUTES: &[(&str, Option<Role>)] = &[
    ("/settings", None),
    ("/messages", None),
    ("/notifications", None),
    ("/tenant/dashboard", Some(Role::Tenant)),
    ("/tenant/lease", Some(Role::Tenant)),
    ("/tenant/payments", Some(Role::Tenant)),
    ("/tenant/maintenance", Some(Role::Tenant)),
    ("/tenant/maintenance/{request_id}", Some(Role::Tenant)),
    ("/landlord/dashboard", Some(Role::Landlord)),
    ("/landlord/properties", Some(Role::Landlord)),
    ("/landlord/properties/{property_id}", Some(Role::Landlord)),
    ("/landlord/tenants", Some(Role::Landlord)),
    ("/landlord/payments", Some(Role::Landlord)),
    ("/landlord/maintenance", Some(Role::Landlord)),
    ("/agency/dashboard", Some(Role::Agency)),
    ("/agency/properties", Some(Role::Agency)),
    ("/agency/landlords", Some(Role::Agency)),
    ("/agency/reports", Some(Role::Agency)),
    ("/maintenance/dashboard", Some(Role::Maintenance)),
    ("/maintenance/requests", Some(Role::Maintenance)),
    ("/maintenance/requests/{request_id}", Some(Role::Maintenance)),
    ("/maintenance/schedule", Some(Role::Maintenance)),
];

/// RouteTable
///
/// The static set of guarded pages, fixed at startup. `validate` must pass before the
/// table is used to serve traffic: a table that could send someone to a dashboard that
/// does not exist is a configuration error, not a runtime condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    specs: Vec<RouteSpec>,
}

impl RouteTable {
    pub fn new(specs: Vec<RouteSpec>) -> Self {
        Self { specs }
    }

    /// The portal's own pages.
    pub fn standard() -> Self {
        Self::new(
            STANDARD_ROUTES
                .iter()
                .map(|&(path, role)| RouteSpec::new(path, role))
                .collect(),
        )
    }

    /// Builds a table from textual declarations such as `("/agency/reports", Some("agency"))`.
    pub fn from_entries(entries: &[(&str, Option<&str>)]) -> Result<Self, GuardError> {
        let specs = entries
            .iter()
            .map(|&(path, role)| {
                let required_role = role
                    .map(|name| {
                        name.parse::<Role>()
                            .map_err(|_| GuardError::UnknownRequiredRole {
                                path: path.to_string(),
                                role: name.to_string(),
                            })
                    })
                    .transpose()?;
                Ok(RouteSpec::new(path, required_role))
            })
            .collect::<Result<Vec<_>, GuardError>>()?;
        Ok(Self::new(specs))
    }

    /// Checks that no pattern is declared twice and that every role's default dashboard
    /// is served and gated to that same role.
    pub fn validate(&self) -> Result<(), GuardError> {
        let mut seen = HashSet::new();
        for spec in &self.specs {
            if !seen.insert(spec.path.as_str()) {
                return Err(GuardError::DuplicateRoute(spec.path.clone()));
            }
        }

        for role in Role::ALL {
            match self.get(default_dashboard(role)) {
                Some(spec) if spec.required_role == Some(role) => {}
                _ => return Err(GuardError::MissingRoleMapping(role)),
            }
        }
        Ok(())
    }

    pub fn specs(&self) -> &[RouteSpec] {
        &self.specs
    }

    /// Looks up a declaration by its exact pattern (as reported by axum's `MatchedPath`).
    pub fn get(&self, pattern: &str) -> Option<&RouteSpec> {
        self.specs.iter().find(|spec| spec.path == pattern)
    }

    /// Finds the declaration serving a concrete request path. Static patterns win over
    /// parameterised ones.
    pub fn find(&self, path: &str) -> Option<&RouteSpec> {
        let path = normalize(path);
        self.get(path)
            .or_else(|| self.specs.iter().find(|spec| pattern_matches(&spec.path, path)))
    }
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(expected), Some(actual)) => {
                let is_param = expected.starts_with('{') && expected.ends_with('}');
                if is_param {
                    if actual.is_empty() {
                        return false;
                    }
                } else if expected != actual {
                    return false;
                }
            }
            _ => return false,
        }
    }
}
