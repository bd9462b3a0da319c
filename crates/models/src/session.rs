use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::ModelError;
use crate::role::Role;
use crate::user::UserRecord;

/// Authenticated user's identity and role as held by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

impl Session {
    /// Normalize a backend user record. Requires an id; a missing or unknown
    /// role falls back to `Employee`.
    pub fn from_record(record: &UserRecord) -> Result<Self, ModelError> {
        let user_id = record
            .id
            .ok_or_else(|| ModelError::Validation("user record has no id".into()))?;
        let role = match record.role.as_deref() {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(user_id, role = raw, "unrecognised role; treating as employee");
                Role::Employee
            }),
            None => Role::Employee,
        };
        Ok(Self {
            user_id,
            email: record.email.clone(),
            employee_id: record.employee_id.clone(),
            role,
            display_name: record.display_name().unwrap_or_default(),
            phone: record.phone.clone(),
            department: record.department.clone(),
        })
    }

    /// Overlay the fields present in `update`. The user id never changes.
    pub fn merge(&mut self, update: &UserRecord) {
        if let Some(email) = &update.email {
            self.email = Some(email.clone());
        }
        if let Some(employee_id) = &update.employee_id {
            self.employee_id = Some(employee_id.clone());
        }
        if let Some(role) = update.role.as_deref().and_then(|r| r.parse().ok()) {
            self.role = role;
        }
        // A lone first or last name is not enough to rebuild the display name.
        let names_complete = update.full_name.is_some() || (update.first_name.is_some() && update.last_name.is_some());
        if names_complete {
            if let Some(name) = update.display_name() {
                self.display_name = name;
            }
        }
        if let Some(phone) = &update.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(department) = &update.department {
            self.department = Some(department.clone());
        }
    }
}
