//! IAM access keys and probe results

use chrono::{DateTime, Utc};
use std::fmt;

/// IAM allows at most two access keys per user
pub const MAX_ACCESS_KEYS_PER_USER: usize = 2;

/// Error codes meaning the signing credentials were not recognized
const AUTHENTICATION_FAILURE_CODES: &[&str] = &[
    "AuthFailure",
    "InvalidClientTokenId",
    "SignatureDoesNotMatch",
    "IncompleteSignature",
    "UnrecognizedClientException",
];

/// Error codes meaning the caller is known but lacks permission
const AUTHORIZATION_FAILURE_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "UnauthorizedOperation",
];

/// A newly created access key, including its secret
#[derive(Clone, PartialEq, Eq)]
pub struct AccessKey {
    pub user_name: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessKey")
            .field("user_name", &self.user_name)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Access key as returned by ListAccessKeys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessKeyMetadata {
    pub user_name: String,
    pub access_key_id: String,
    /// `Active` or `Inactive`
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Result of an authenticated call made with a candidate key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The call succeeded
    Authenticated,
    /// The key authenticated but the call was not permitted
    AuthorizationDenied { code: String },
    /// The key was rejected
    AuthenticationFailed { code: String },
}

impl ProbeOutcome {
    /// Classify a service error code returned by a probe call.
    ///
    /// Returns `None` for codes that say nothing about the key itself
    /// (throttling, service faults).
    pub fn from_error_code(code: &str) -> Option<Self> {
        if AUTHENTICATION_FAILURE_CODES.contains(&code) {
            Some(Self::AuthenticationFailed {
                code: code.to_string(),
            })
        } else if AUTHORIZATION_FAILURE_CODES.contains(&code) {
            Some(Self::AuthorizationDenied {
                code: code.to_string(),
            })
        } else {
            None
        }
    }

    /// True if the key is known to IAM
    pub fn is_valid_key(&self) -> bool {
        !matches!(self, Self::AuthenticationFailed { .. })
    }
}
