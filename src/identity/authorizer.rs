//! Role-based route authorization.
//! Flat set membership only: a role is allowed on a surface iff the surface lists it.
//! There is no hierarchy; ADMIN and OWNER appear together because every table entry
//! names them, not because one implies the other.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::principal::Role;
use super::session::{Session, SessionStatus};

pub const LOGIN_ROUTE: &str = "/login";
pub const HOME_ROUTE: &str = "/dashboard";

pub const ALL_ROLES: &[Role] = &[Role::Admin, Role::Owner, Role::Manager, Role::Waiter, Role::Chef];
pub const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::Owner];
pub const MANAGEMENT_ROLES: &[Role] = &[Role::Admin, Role::Owner, Role::Manager];
pub const FLOOR_ROLES: &[Role] = &[Role::Admin, Role::Owner, Role::Manager, Role::Waiter];
pub const KITCHEN_ROLES: &[Role] = &[Role::Chef];

/// `true` iff `role` is in `allowed`. Total; an empty set denies everyone.
pub fn permit(role: Role, allowed: &[Role]) -> bool { allowed.contains(&role) }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePermission {
    pub path: &'static str,
    pub title: &'static str,
    pub allowed: &'static [Role],
}

const ROUTE_TABLE: &[RoutePermission] = &[
    RoutePermission { path: "/dashboard", title: "Dashboard", allowed: ALL_ROLES },
    RoutePermission { path: "/staff", title: "Staff", allowed: ADMIN_ROLES },
    RoutePermission { path: "/menu", title: "Menu", allowed: MANAGEMENT_ROLES },
    RoutePermission { path: "/orders", title: "Orders", allowed: ALL_ROLES },
    RoutePermission { path: "/tables", title: "Tables", allowed: FLOOR_ROLES },
    RoutePermission { path: "/inventory", title: "Inventory", allowed: MANAGEMENT_ROLES },
    RoutePermission { path: "/reservations", title: "Reservations", allowed: MANAGEMENT_ROLES },
    RoutePermission { path: "/payments", title: "Payments", allowed: MANAGEMENT_ROLES },
    RoutePermission { path: "/kitchen", title: "Kitchen", allowed: KITCHEN_ROLES },
    RoutePermission { path: "/settings", title: "Settings", allowed: ADMIN_ROLES },
];

static ROUTE_INDEX: Lazy<HashMap<&'static str, &'static RoutePermission>> =
    Lazy::new(|| ROUTE_TABLE.iter().map(|r| (r.path, r)).collect());

pub fn route_table() -> &'static [RoutePermission] { ROUTE_TABLE }

pub fn route_permission(path: &str) -> Option<&'static RoutePermission> {
    ROUTE_INDEX.get(normalize_path(path)).copied()
}

/// Routes `role` may enter, in table order.
pub fn routes_for(role: Role) -> Vec<&'static RoutePermission> {
    ROUTE_TABLE.iter().filter(|r| permit(role, r.allowed)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(&'static str),
    /// Authenticated but the profile is not hydrated yet; fetch it, then decide again.
    NeedsProfile,
    /// Render access-denied in place; not an error.
    Denied,
    NotFound,
}

fn normalize_path(path: &str) -> &str {
    let p = path.split(['?', '#']).next().unwrap_or("");
    let p = p.trim_end_matches('/');
    if p.is_empty() { "/" } else { p }
}

pub fn guard_route(session: &Session, path: &str) -> RouteDecision {
    let path = normalize_path(path);
    let authenticated = session.status == SessionStatus::Authenticated;
    if path == "/" {
        return RouteDecision::Redirect(HOME_ROUTE);
    }
    if path == LOGIN_ROUTE {
        return if authenticated { RouteDecision::Redirect(HOME_ROUTE) } else { RouteDecision::Allow };
    }
    let Some(route) = ROUTE_INDEX.get(path) else { return RouteDecision::NotFound; };
    if !authenticated {
        return RouteDecision::Redirect(LOGIN_ROUTE);
    }
    match session.role() {
        None => RouteDecision::NeedsProfile,
        Some(role) if permit(role, route.allowed) => RouteDecision::Allow,
        Some(_) => RouteDecision::Denied,
    }
}
