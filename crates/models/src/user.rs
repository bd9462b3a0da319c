use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::ModelError;

/// User record as returned by the backend's login and profile endpoints.
///
/// Every field is optional: the login payload, the profile endpoint and the
/// profile-update endpoint each return a different subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    #[serde(deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl UserRecord {
    /// Parse a backend payload, unwrapping a `{"user": ..}` or `{"profile": ..}` envelope.
    pub fn from_payload(payload: &Value) -> Result<Self, ModelError> {
        let inner = ["user", "profile"]
            .iter()
            .find_map(|k| payload.get(*k).filter(|v| v.is_object()))
            .unwrap_or(payload);
        if !inner.is_object() {
            return Err(ModelError::Payload("user payload is not an object".into()));
        }
        serde_json::from_value(inner.clone()).map_err(|e| ModelError::Payload(e.to_string()))
    }

    /// Human-readable name: full name, then first/last, then username, then email.
    pub fn display_name(&self) -> Option<String> {
        if let Some(full) = self.full_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            return Some(full.to_string());
        }
        let joined = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        );
        let joined = joined.trim();
        if !joined.is_empty() {
            return Some(joined.to_string());
        }
        self.username.clone().or_else(|| self.email.clone())
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("user id out of range")),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("non-numeric user id: {s}"))),
        Some(other) => Err(serde::de::Error::custom(format!("unexpected user id: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_user_envelope() {
        let rec = UserRecord::from_payload(&json!({"access": "a", "user": {"id": 7, "role": "EMPLOYEE"}})).unwrap();
        assert_eq!(rec.id, Some(7));
        assert_eq!(rec.role.as_deref(), Some("EMPLOYEE"));
    }

    #[test]
    fn accepts_bare_record_and_string_id() {
        let rec = UserRecord::from_payload(&json!({"id": "12", "email": "a@b.c", "unknown": true})).unwrap();
        assert_eq!(rec.id, Some(12));
        assert_eq!(rec.email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn rejects_non_object() {
        assert!(UserRecord::from_payload(&json!("nope")).is_err());
    }

    #[test]
    fn display_name_fallbacks() {
        let mut rec = UserRecord { first_name: Some("Ada".into()), last_name: Some("Lovelace".into()), ..Default::default() };
        assert_eq!(rec.display_name().as_deref(), Some("Ada Lovelace"));
        rec.full_name = Some("Countess Ada".into());
        assert_eq!(rec.display_name().as_deref(), Some("Countess Ada"));
        let only_email = UserRecord { email: Some("ada@x.io".into()), ..Default::default() };
        assert_eq!(only_email.display_name().as_deref(), Some("ada@x.io"));
    }
}
