use crate::models::{NavigationEntry, Role};

type MenuItem = (&'static str, &'static str, &'static str);

const TENANT_MENU: &[MenuItem] = &[
    ("/tenant/dashboard", "Dashboard", "home"),
    ("/tenant/lease", "My Lease", "file-text"),
    ("/tenant/payments", "Payments", "credit-card"),
    ("/tenant/maintenance", "Maintenance", "wrench"),
];

const LANDLORD_MENU: &[MenuItem] = &[
    ("/landlord/dashboard", "Dashboard", "home"),
    ("/landlord/properties", "Properties", "building"),
    ("/landlord/tenants", "Tenants", "users"),
    ("/landlord/payments", "Payments", "credit-card"),
    ("/landlord/maintenance", "Maintenance", "wrench"),
];

const AGENCY_MENU: &[MenuItem] = &[
    ("/agency/dashboard", "Dashboard", "home"),
    ("/agency/properties", "Properties", "building"),
    ("/agency/landlords", "Landlords", "briefcase"),
    ("/agency/reports", "Reports", "bar-chart"),
];

const MAINTENANCE_MENU: &[MenuItem] = &[
    ("/maintenance/dashboard", "Dashboard", "home"),
    ("/maintenance/requests", "Requests", "clipboard"),
    ("/maintenance/schedule", "Schedule", "calendar"),
];

// Appended to every role's menu.
const SHARED_MENU: &[MenuItem] = &[
    ("/messages", "Messages", "message-square"),
    ("/notifications", "Notifications", "bell"),
    ("/settings", "Settings", "settings"),
];

fn menu(role: Role) -> &'static [MenuItem] {
    match role {
        Role::Tenant => TENANT_MENU,
        Role::Landlord => LANDLORD_MENU,
        Role::Agency => AGENCY_MENU,
        Role::Maintenance => MAINTENANCE_MENU,
    }
}

/// entries
///
/// The sidebar for `role`, in display order, with `active` set for the entry matching
/// `current_path`. Pure: the same inputs always produce the same entries.
pub fn entries(role: Role, current_path: &str) -> Vec<NavigationEntry> {
    menu(role)
        .iter()
        .chain(SHARED_MENU)
        .map(|&(path, label, icon)| {
            let mut entry = NavigationEntry {
                path: path.to_string(),
                label: label.to_string(),
                icon: icon.to_string(),
                active: false,
            };
            entry.active = entry.is_active(current_path);
            entry
        })
        .collect()
}
