use crate::{
    models::{GuardDecision, Role},
    session::Resolution,
};

/// Where anonymous and deactivated visitors are sent.
pub const AUTH_PATH: &str = "/auth";

/// default_dashboard
///
/// The canonical landing page of each role. Total over `Role`; `RouteTable::validate`
/// additionally checks that each of these paths is actually served.
pub fn default_dashboard(role: Role) -> &'static str {
    match role {
        Role::Tenant => "/tenant/dashboard",
        Role::Landlord => "/landlord/dashboard",
        Role::Agency => "/agency/dashboard",
        Role::Maintenance => "/maintenance/dashboard",
    }
}

/// decide
///
/// Pure decision for one navigation attempt. Rules apply in order:
/// 1. check still outstanding → `Pending`
/// 2. no identity, or a deactivated one → redirect to `/auth`
/// 3. role required and not held → redirect to the visitor's own dashboard
/// 4. otherwise → `Render`
pub fn decide(path: &str, required_role: Option<Role>, resolution: &Resolution) -> GuardDecision {
    if resolution.pending {
        return GuardDecision::Pending;
    }

    let identity = match &resolution.identity {
        Some(identity) if identity.is_active => identity,
        Some(identity) => {
            tracing::debug!(path, user_id = %identity.id, "inactive account; redirecting to login");
            return GuardDecision::redirect(AUTH_PATH);
        }
        None => {
            tracing::debug!(path, "no session; redirecting to login");
            return GuardDecision::redirect(AUTH_PATH);
        }
    };

    match required_role {
        Some(required) if required != identity.role => {
            let target = default_dashboard(identity.role);
            tracing::info!(
                path,
                user_id = %identity.id,
                role = %identity.role,
                required = %required,
                redirect_to = target,
                "role mismatch; redirecting to own dashboard"
            );
            GuardDecision::redirect(target)
        }
        _ => GuardDecision::Render,
    }
}
