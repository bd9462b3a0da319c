use models::{Role, Session};
use serde::Serialize;

/// Lifecycle of the client session.
///
/// `Uninitialized -> Hydrating -> {Authenticated, Anonymous}` at startup, then
/// `Authenticated <-> Anonymous` through login, logout and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Uninitialized,
    Hydrating,
    Authenticated,
    Anonymous,
}

impl SessionPhase {
    /// Startup has not resolved yet; guard decisions must wait.
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionPhase::Uninitialized | SessionPhase::Hydrating)
    }
}

/// Point-in-time view of the session. A session is present exactly when the
/// phase is `Authenticated`; the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    phase: SessionPhase,
    session: Option<Session>,
}

impl SessionSnapshot {
    pub fn uninitialized() -> Self {
        Self { phase: SessionPhase::Uninitialized, session: None }
    }

    pub fn hydrating() -> Self {
        Self { phase: SessionPhase::Hydrating, session: None }
    }

    pub fn anonymous() -> Self {
        Self { phase: SessionPhase::Anonymous, session: None }
    }

    pub fn authenticated(session: Session) -> Self {
        Self { phase: SessionPhase::Authenticated, session: Some(session) }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn into_session(self) -> Option<Session> {
        self.session
    }

    fn role(&self) -> Option<Role> {
        self.session.as_ref().map(|s| s.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    pub fn is_hr(&self) -> bool {
        self.role() == Some(Role::Hr)
    }

    pub fn is_admin_or_hr(&self) -> bool {
        self.role().is_some_and(|r| r.is_admin_or_hr())
    }

    pub fn is_employee(&self) -> bool {
        self.role() == Some(Role::Employee)
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::uninitialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_role(role: Role) -> SessionSnapshot {
        SessionSnapshot::authenticated(Session {
            user_id: 1,
            email: None,
            employee_id: None,
            role,
            display_name: String::new(),
            phone: None,
            department: None,
        })
    }

    #[test]
    fn flags_follow_role() {
        let admin = with_role(Role::Admin);
        assert!(admin.is_authenticated() && admin.is_admin() && admin.is_admin_or_hr());
        assert!(!admin.is_employee() && !admin.is_hr());

        let hr = with_role(Role::Hr);
        assert!(hr.is_hr() && hr.is_admin_or_hr() && !hr.is_admin());

        let emp = with_role(Role::Employee);
        assert!(emp.is_employee() && !emp.is_admin_or_hr());
    }

    #[test]
    fn anonymous_has_no_flags() {
        let anon = SessionSnapshot::anonymous();
        assert!(!anon.is_authenticated() && !anon.is_admin() && !anon.is_employee());
        assert!(SessionSnapshot::hydrating().phase().is_pending());
        assert!(!anon.phase().is_pending());
    }
}
