//! Navigation guards evaluated against the current session snapshot.

use configs::RoutesConfig;
use serde::Serialize;

use crate::auth::SessionSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteGuard {
    /// Any authenticated user.
    Protected,
    /// Authenticated ADMIN or HR.
    Admin,
    /// Login and registration screens; authenticated users are sent home.
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "to", rename_all = "snake_case")]
pub enum GuardDecision {
    Loading,
    Render,
    Redirect(String),
}

impl RouteGuard {
    pub const ALL: [RouteGuard; 3] = [RouteGuard::Protected, RouteGuard::Admin, RouteGuard::Public];

    /// Pure function of the snapshot and route table.
    pub fn evaluate(&self, snapshot: &SessionSnapshot, routes: &RoutesConfig) -> GuardDecision {
        if snapshot.phase().is_pending() {
            return GuardDecision::Loading;
        }
        let authenticated = snapshot.is_authenticated();
        match self {
            RouteGuard::Protected if !authenticated => GuardDecision::Redirect(routes.login.clone()),
            RouteGuard::Protected => GuardDecision::Render,
            RouteGuard::Admin if !authenticated => GuardDecision::Redirect(routes.login.clone()),
            RouteGuard::Admin if !snapshot.is_admin_or_hr() => GuardDecision::Redirect(routes.employee_home.clone()),
            RouteGuard::Admin => GuardDecision::Render,
            RouteGuard::Public if !authenticated => GuardDecision::Render,
            RouteGuard::Public if snapshot.is_admin_or_hr() => GuardDecision::Redirect(routes.admin_home.clone()),
            RouteGuard::Public => GuardDecision::Redirect(routes.employee_home.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{Role, Session};

    fn session(role: Role) -> SessionSnapshot {
        SessionSnapshot::authenticated(Session {
            user_id: 1,
            email: None,
            employee_id: None,
            role,
            display_name: "Test".into(),
            phone: None,
            department: None,
        })
    }

    fn redirect(path: &str) -> GuardDecision {
        GuardDecision::Redirect(path.to_string())
    }

    #[test]
    fn pending_phases_show_loading_everywhere() {
        let routes = RoutesConfig::default();
        for snap in [SessionSnapshot::uninitialized(), SessionSnapshot::hydrating()] {
            for guard in RouteGuard::ALL {
                assert_eq!(guard.evaluate(&snap, &routes), GuardDecision::Loading);
            }
        }
    }

    #[test]
    fn anonymous_user() {
        let routes = RoutesConfig::default();
        let snap = SessionSnapshot::anonymous();
        assert_eq!(RouteGuard::Protected.evaluate(&snap, &routes), redirect("/login"));
        assert_eq!(RouteGuard::Admin.evaluate(&snap, &routes), redirect("/login"));
        assert_eq!(RouteGuard::Public.evaluate(&snap, &routes), GuardDecision::Render);
    }

    #[test]
    fn employee_is_kept_out_of_admin_routes() {
        let routes = RoutesConfig::default();
        let snap = session(Role::Employee);
        assert_eq!(RouteGuard::Protected.evaluate(&snap, &routes), GuardDecision::Render);
        assert_eq!(RouteGuard::Admin.evaluate(&snap, &routes), redirect("/employee/dashboard"));
        assert_eq!(RouteGuard::Public.evaluate(&snap, &routes), redirect("/employee/dashboard"));
    }

    #[test]
    fn admin_and_hr_reach_admin_routes() {
        let routes = RoutesConfig::default();
        for role in [Role::Admin, Role::Hr] {
            let snap = session(role);
            assert_eq!(RouteGuard::Admin.evaluate(&snap, &routes), GuardDecision::Render);
            assert_eq!(RouteGuard::Public.evaluate(&snap, &routes), redirect("/admin/dashboard"));
        }
    }

    #[test]
    fn evaluation_is_idempotent_and_honours_routes() {
        let routes = RoutesConfig { login: "/signin".into(), ..Default::default() };
        let snap = SessionSnapshot::anonymous();
        let first = RouteGuard::Protected.evaluate(&snap, &routes);
        assert_eq!(first, RouteGuard::Protected.evaluate(&snap, &routes));
        assert_eq!(first, redirect("/signin"));
    }

    #[test]
    fn decision_serializes_with_target() {
        let json = serde_json::to_value(redirect("/login")).unwrap();
        assert_eq!(json, serde_json::json!({"decision": "redirect", "to": "/login"}));
        let json = serde_json::to_value(GuardDecision::Loading).unwrap();
        assert_eq!(json, serde_json::json!({"decision": "loading"}));
    }
}
