//! The JSON document stored in a rotated secret

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::credential::AccessKey;
use crate::error::SchemaError;

/// Keys the rotation handler reads from the secret JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadField {
    User,
    AccessKeyId,
    SecretAccessKey,
}

impl PayloadField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::AccessKeyId => "AccessKeyId",
            Self::SecretAccessKey => "SecretAccessKey",
        }
    }
}

/// Secret contents: the IAM user and its current access key.
///
/// Fields the handler does not know about are carried through untouched.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecretPayload {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SecretPayload {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            access_key_id: None,
            secret_access_key: None,
            extra: Map::new(),
        }
    }

    /// Parse a SecretString, checking that every `required` key is present
    pub fn parse(secret_string: &str, required: &[PayloadField]) -> Result<Self, SchemaError> {
        let document: Value = serde_json::from_str(secret_string)?;
        let Value::Object(fields) = document else {
            return Err(SchemaError::NotAnObject);
        };

        for field in required {
            if fields.get(field.as_str()).map_or(true, Value::is_null) {
                return Err(SchemaError::MissingField(field.as_str()));
            }
        }

        if !fields.contains_key(PayloadField::User.as_str()) {
            return Err(SchemaError::MissingField(PayloadField::User.as_str()));
        }

        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    pub fn to_secret_string(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Copy of this payload carrying `key` as the access key
    pub fn with_access_key(&self, key: &AccessKey) -> Self {
        Self {
            access_key_id: Some(key.access_key_id.clone()),
            secret_access_key: Some(key.secret_access_key.clone()),
            ..self.clone()
        }
    }

    /// Access key ID and secret, when both are present
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

impl fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretPayload")
            .field("user", &self.user)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_parse_user_only() {
        let payload = SecretPayload::parse(r#"{"User":"svc"}"#, &[PayloadField::User]).unwrap();
        assert_eq!(payload.user, "svc");
        assert_eq!(payload.access_key_id, None);
        assert_eq!(payload.credentials(), None);
    }

    #[test]
    fn test_missing_required_field() {
        let result = SecretPayload::parse(
            r#"{"User":"svc","AccessKeyId":"AKIA1"}"#,
            &[PayloadField::User, PayloadField::AccessKeyId, PayloadField::SecretAccessKey],
        );
        assert!(matches!(result, Err(SchemaError::MissingField("SecretAccessKey"))));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let result = SecretPayload::parse(
            r#"{"User":"svc","AccessKeyId":null}"#,
            &[PayloadField::AccessKeyId],
        );
        assert!(matches!(result, Err(SchemaError::MissingField("AccessKeyId"))));
    }

    #[test]
    fn test_user_always_required() {
        let result = SecretPayload::parse(r#"{"AccessKeyId":"AKIA1"}"#, &[]);
        assert!(matches!(result, Err(SchemaError::MissingField("User"))));
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(
            SecretPayload::parse("not json", &[]),
            Err(SchemaError::InvalidJson(_))
        ));
        assert!(matches!(
            SecretPayload::parse(r#"["User"]"#, &[]),
            Err(SchemaError::NotAnObject)
        ));
        assert!(matches!(
            SecretPayload::parse(r#"{"User":42}"#, &[PayloadField::User]),
            Err(SchemaError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_unknown_fields_survive() {
        let original = r#"{"User":"svc","AccessKeyId":"AKIA1","SecretAccessKey":"s3cr3t","Owner":"team-a","Tags":[1,2]}"#;
        let payload = SecretPayload::parse(original, &[PayloadField::User]).unwrap();

        let written: Value = serde_json::from_str(&payload.to_secret_string().unwrap()).unwrap();
        let expected: Value = serde_json::from_str(original).unwrap();
        assert_eq!(written, expected);
    }

    #[test]
    fn test_with_access_key() {
        let mut payload = SecretPayload::new("svc");
        payload
            .extra
            .insert("Owner".to_string(), Value::String("team-a".to_string()));

        let key = AccessKey {
            user_name: "svc".to_string(),
            access_key_id: "AKIANEW".to_string(),
            secret_access_key: "new-secret".to_string(),
            created_at: Utc::now(),
        };
        let updated = payload.with_access_key(&key);

        assert_eq!(updated.user, "svc");
        assert_eq!(updated.credentials(), Some(("AKIANEW", "new-secret")));
        assert_eq!(updated.extra.get("Owner"), payload.extra.get("Owner"));
        assert_eq!(payload.access_key_id, None);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let payload = SecretPayload::parse(
            r#"{"User":"svc","AccessKeyId":"AKIA1","SecretAccessKey":"s3cr3t"}"#,
            &[],
        )
        .unwrap();
        let debug = format!("{:?}", payload);
        assert!(debug.contains("AKIA1"));
        assert!(!debug.contains("s3cr3t"));
    }
}
