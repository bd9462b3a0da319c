use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Canonical user role. Serialized upper-case; parsing tolerates the
/// lower-case and `hr_officer` spellings older backends emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Admin,
    Hr,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Hr => "HR",
            Role::Employee => "EMPLOYEE",
        }
    }

    pub fn is_admin_or_hr(&self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }
}

impl FromStr for Role {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match norm.as_str() {
            "ADMIN" => Ok(Role::Admin),
            "HR" | "HR_OFFICER" => Ok(Role::Hr),
            "EMPLOYEE" => Ok(Role::Employee),
            _ => Err(ModelError::Validation(format!("unknown role: {s}"))),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_spellings() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("hr_officer".parse::<Role>().unwrap(), Role::Hr);
        assert_eq!("HR Officer".parse::<Role>().unwrap(), Role::Hr);
        assert_eq!(" Employee ".parse::<Role>().unwrap(), Role::Employee);
        assert!("manager".parse::<Role>().is_err());
    }

    #[test]
    fn serializes_canonical_upper_case() {
        let json = serde_json::to_string(&Role::Hr).unwrap();
        assert_eq!(json, "\"HR\"");
        let back: Role = serde_json::from_str("\"hr_officer\"").unwrap();
        assert_eq!(back, Role::Hr);
    }
}
