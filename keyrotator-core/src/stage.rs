//! Secret versions and staging labels

use std::collections::HashMap;
use std::fmt;

/// Staging labels managed by the rotation protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionStage {
    Current,
    Pending,
    Previous,
}

impl VersionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "AWSCURRENT",
            Self::Pending => "AWSPENDING",
            Self::Previous => "AWSPREVIOUS",
        }
    }
}

impl fmt::Display for VersionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rotation-relevant view of a secret, as returned by DescribeSecret
#[derive(Debug, Clone, Default)]
pub struct SecretMetadata {
    /// Secret name or ARN
    pub name: String,
    /// Whether rotation is enabled on the secret
    pub rotation_enabled: bool,
    /// Version ID -> staging labels
    pub version_ids_to_stages: HashMap<String, Vec<String>>,
}

impl SecretMetadata {
    /// Staging labels attached to a version, if the version is known
    pub fn stages_of(&self, version_id: &str) -> Option<&[String]> {
        self.version_ids_to_stages
            .get(version_id)
            .map(Vec::as_slice)
    }

    pub fn has_stage(&self, version_id: &str, stage: VersionStage) -> bool {
        self.stages_of(version_id)
            .is_some_and(|stages| stages.iter().any(|s| s == stage.as_str()))
    }

    /// The version currently holding `stage`, if any
    pub fn version_with_stage(&self, stage: VersionStage) -> Option<&str> {
        self.version_ids_to_stages
            .iter()
            .find(|(_, stages)| stages.iter().any(|s| s == stage.as_str()))
            .map(|(version_id, _)| version_id.as_str())
    }
}

/// A single secret version returned by GetSecretValue
#[derive(Debug, Clone)]
pub struct SecretValue {
    pub version_id: String,
    pub secret_string: Option<String>,
    pub version_stages: Vec<String>,
}
