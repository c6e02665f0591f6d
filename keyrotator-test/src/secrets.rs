//! In-memory Secrets Manager emulation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use keyrotator_core::{SecretMetadata, SecretStore, SecretStoreError, SecretValue, VersionStage};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// A secret with its versions
#[derive(Debug, Clone)]
pub struct Secret {
    /// Secret ARN
    pub arn: String,
    /// Secret name
    pub name: String,
    /// Whether a rotation function is configured
    pub rotation_enabled: bool,
    /// Secret versions (version_id -> SecretVersion)
    pub versions: HashMap<String, SecretVersion>,
    /// Creation date
    pub created_date: DateTime<Utc>,
    /// Last changed date
    pub last_changed_date: DateTime<Utc>,
}

/// A version of a secret
#[derive(Debug, Clone)]
pub struct SecretVersion {
    /// Version ID (the ClientRequestToken that created it)
    pub version_id: String,
    /// Secret string value; absent for a version created by RotateSecret
    pub secret_string: Option<String>,
    /// Creation date
    pub created_date: DateTime<Utc>,
    /// Version stages (e.g., AWSCURRENT, AWSPENDING)
    pub version_stages: Vec<String>,
}

impl SecretVersion {
    fn new(version_id: &str, secret_string: Option<String>) -> Self {
        Self {
            version_id: version_id.to_string(),
            secret_string,
            created_date: Utc::now(),
            version_stages: Vec::new(),
        }
    }

    fn has_stage(&self, stage: VersionStage) -> bool {
        self.version_stages.iter().any(|s| s == stage.as_str())
    }
}

impl Secret {
    fn version_with_stage(&self, stage: VersionStage) -> Option<&SecretVersion> {
        self.versions.values().find(|v| v.has_stage(stage))
    }

    /// Staging labels are unique per secret: attaching one detaches it from
    /// every other version. Moving AWSCURRENT leaves AWSPREVIOUS on the
    /// version that held it.
    fn attach_stage(&mut self, stage: VersionStage, version_id: &str) {
        let previous_holder = self
            .version_with_stage(stage)
            .map(|v| v.version_id.clone())
            .filter(|holder| holder != version_id);

        for version in self.versions.values_mut() {
            version.version_stages.retain(|s| s != stage.as_str());
        }
        if let Some(version) = self.versions.get_mut(version_id) {
            version.version_stages.push(stage.as_str().to_string());
        }

        if stage == VersionStage::Current {
            if let Some(holder) = previous_holder {
                self.attach_stage(VersionStage::Previous, &holder);
            }
        }
        self.last_changed_date = Utc::now();
    }
}

/// In-memory storage for secrets
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    /// Secrets indexed by name
    secrets: DashMap<String, Secret>,
    /// When set, every GetSecretValue fails with this error code
    lookup_failure: Mutex<Option<String>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new secret; a value, if given, becomes the AWSCURRENT version
    pub fn create_secret(
        &self,
        name: &str,
        secret_string: Option<&str>,
    ) -> Result<Option<String>, SecretStoreError> {
        if self.secrets.contains_key(name) {
            return Err(SecretStoreError::service(
                "ResourceExistsException",
                format!("Secret {} already exists", name),
            ));
        }

        let now = Utc::now();
        let arn = format!(
            "arn:aws:secretsmanager:us-east-1:000000000000:secret:{}-{}",
            name,
            &Uuid::new_v4().simple().to_string()[..6]
        );

        let mut secret = Secret {
            arn,
            name: name.to_string(),
            rotation_enabled: false,
            versions: HashMap::new(),
            created_date: now,
            last_changed_date: now,
        };

        let current_version_id = secret_string.map(|value| {
            let version_id = Uuid::new_v4().to_string();
            secret.versions.insert(
                version_id.clone(),
                SecretVersion::new(&version_id, Some(value.to_string())),
            );
            secret.attach_stage(VersionStage::Current, &version_id);
            version_id
        });

        self.secrets.insert(name.to_string(), secret);
        Ok(current_version_id)
    }

    /// Get a secret by name or ARN
    pub fn get_secret(&self, secret_id: &str) -> Result<Secret, SecretStoreError> {
        let name = self.resolve(secret_id)?;
        self.secrets
            .get(&name)
            .map(|s| s.clone())
            .ok_or_else(|| SecretStoreError::NotFound(secret_id.to_string()))
    }

    pub fn set_rotation_enabled(&self, secret_id: &str, enabled: bool) -> Result<(), SecretStoreError> {
        let name = self.resolve(secret_id)?;
        if let Some(mut secret) = self.secrets.get_mut(&name) {
            secret.rotation_enabled = enabled;
        }
        Ok(())
    }

    /// What RotateSecret does before invoking the rotation function: enable
    /// rotation and stage an empty AWSPENDING version under `token`.
    pub fn begin_rotation(&self, secret_id: &str, token: &str) -> Result<(), SecretStoreError> {
        let name = self.resolve(secret_id)?;
        let mut secret = self
            .secrets
            .get_mut(&name)
            .ok_or_else(|| SecretStoreError::NotFound(secret_id.to_string()))?;

        secret.rotation_enabled = true;
        secret
            .versions
            .entry(token.to_string())
            .or_insert_with(|| SecretVersion::new(token, None));
        secret.attach_stage(VersionStage::Pending, token);
        Ok(())
    }

    /// Version ID -> stages, including versions with no stages
    pub fn version_stages(&self, secret_id: &str) -> Result<HashMap<String, Vec<String>>, SecretStoreError> {
        let secret = self.get_secret(secret_id)?;
        Ok(secret
            .versions
            .into_iter()
            .map(|(id, v)| (id, v.version_stages))
            .collect())
    }

    /// Stored value of a version, regardless of stage
    pub fn secret_string(&self, secret_id: &str, version_id: &str) -> Option<String> {
        self.get_secret(secret_id)
            .ok()?
            .versions
            .get(version_id)?
            .secret_string
            .clone()
    }

    /// Make every subsequent GetSecretValue fail with `code`, or clear it
    pub fn fail_lookups_with(&self, code: Option<&str>) {
        *self.lookup_failure.lock() = code.map(str::to_string);
    }

    fn resolve(&self, secret_id: &str) -> Result<String, SecretStoreError> {
        if self.secrets.contains_key(secret_id) {
            return Ok(secret_id.to_string());
        }
        self.secrets
            .iter()
            .find(|entry| entry.value().arn == secret_id)
            .map(|entry| entry.key().clone())
            .ok_or_else(|| SecretStoreError::NotFound(secret_id.to_string()))
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn describe_secret(&self, secret_id: &str) -> Result<SecretMetadata, SecretStoreError> {
        let secret = self.get_secret(secret_id)?;
        let version_ids_to_stages = secret
            .versions
            .into_iter()
            .filter(|(_, v)| !v.version_stages.is_empty())
            .map(|(id, v)| (id, v.version_stages))
            .collect();

        Ok(SecretMetadata {
            name: secret.name,
            rotation_enabled: secret.rotation_enabled,
            version_ids_to_stages,
        })
    }

    async fn get_secret_value(
        &self,
        secret_id: &str,
        version_id: Option<&str>,
        stage: Option<VersionStage>,
    ) -> Result<SecretValue, SecretStoreError> {
        if let Some(code) = self.lookup_failure.lock().clone() {
            return Err(SecretStoreError::service(code, "injected lookup failure"));
        }

        let secret = self.get_secret(secret_id)?;
        let version = match version_id {
            Some(vid) => {
                let version = secret
                    .versions
                    .get(vid)
                    .ok_or_else(|| SecretStoreError::NotFound(format!("Version {} not found", vid)))?;
                if let Some(stage) = stage.filter(|stage| !version.has_stage(*stage)) {
                    return Err(SecretStoreError::NotFound(format!(
                        "Version {} is not staged {}",
                        vid, stage
                    )));
                }
                version
            }
            None => {
                let stage = stage.unwrap_or(VersionStage::Current);
                secret.version_with_stage(stage).ok_or_else(|| {
                    SecretStoreError::NotFound(format!("No version staged {}", stage))
                })?
            }
        };

        debug!(secret = %secret.name, version_id = %version.version_id, "GetSecretValue");

        if version.secret_string.is_none() {
            return Err(SecretStoreError::NotFound(format!(
                "Secrets Manager can't find the specified secret value for VersionId: {}",
                version.version_id
            )));
        }

        Ok(SecretValue {
            version_id: version.version_id.clone(),
            secret_string: version.secret_string.clone(),
            version_stages: version.version_stages.clone(),
        })
    }

    async fn put_secret_value(
        &self,
        secret_id: &str,
        token: &str,
        secret_string: &str,
        stages: &[VersionStage],
    ) -> Result<(), SecretStoreError> {
        let name = self.resolve(secret_id)?;
        let mut secret = self
            .secrets
            .get_mut(&name)
            .ok_or_else(|| SecretStoreError::NotFound(secret_id.to_string()))?;

        let version = secret
            .versions
            .entry(token.to_string())
            .or_insert_with(|| SecretVersion::new(token, None));

        match version.secret_string.clone() {
            None => version.secret_string = Some(secret_string.to_string()),
            Some(existing) if existing == secret_string => {}
            Some(_) => {
                return Err(SecretStoreError::service(
                    "ResourceExistsException",
                    format!("Version {} already exists with different content", token),
                ))
            }
        }

        for stage in stages {
            secret.attach_stage(*stage, token);
        }
        Ok(())
    }

    async fn update_secret_version_stage(
        &self,
        secret_id: &str,
        stage: VersionStage,
        move_to: &str,
        remove_from: Option<&str>,
    ) -> Result<(), SecretStoreError> {
        let name = self.resolve(secret_id)?;
        let mut secret = self
            .secrets
            .get_mut(&name)
            .ok_or_else(|| SecretStoreError::NotFound(secret_id.to_string()))?;

        if !secret.versions.contains_key(move_to) {
            return Err(SecretStoreError::NotFound(format!("Version {} not found", move_to)));
        }

        let holder = secret
            .version_with_stage(stage)
            .map(|v| v.version_id.clone())
            .filter(|holder| holder != move_to);
        if holder.as_deref() != remove_from && holder.is_some() {
            return Err(SecretStoreError::service(
                "InvalidParameterException",
                format!(
                    "Staging label {} is attached to version {}; RemoveFromVersionId must name it",
                    stage,
                    holder.unwrap_or_default()
                ),
            ));
        }

        secret.attach_stage(stage, move_to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stages_of(store: &InMemorySecretStore, version: &str) -> Vec<String> {
        let mut stages = store
            .version_stages("my-secret")
            .unwrap()
            .remove(version)
            .unwrap_or_default();
        stages.sort();
        stages
    }

    #[tokio::test]
    async fn test_create_and_get_secret() {
        let store = InMemorySecretStore::new();
        let version = store
            .create_secret("my-secret", Some("secret-value"))
            .unwrap()
            .unwrap();

        let value = store.get_secret_value("my-secret", None, None).await.unwrap();
        assert_eq!(value.version_id, version);
        assert_eq!(value.secret_string.as_deref(), Some("secret-value"));

        let arn = store.get_secret("my-secret").unwrap().arn;
        let by_arn = store.describe_secret(&arn).await.unwrap();
        assert_eq!(by_arn.name, "my-secret");
    }

    #[tokio::test]
    async fn test_version_and_stage_must_match() {
        let store = InMemorySecretStore::new();
        let version = store.create_secret("my-secret", Some("v1")).unwrap().unwrap();

        let result = store
            .get_secret_value("my-secret", Some(&version), Some(VersionStage::Pending))
            .await;
        assert!(matches!(result, Err(SecretStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_pending_version_without_value_is_not_found() {
        let store = InMemorySecretStore::new();
        store.create_secret("my-secret", Some("v1")).unwrap();
        store.begin_rotation("my-secret", "token-1").unwrap();

        let result = store
            .get_secret_value("my-secret", Some("token-1"), Some(VersionStage::Pending))
            .await;
        assert!(matches!(result, Err(SecretStoreError::NotFound(_))));

        let metadata = store.describe_secret("my-secret").await.unwrap();
        assert!(metadata.rotation_enabled);
        assert!(metadata.has_stage("token-1", VersionStage::Pending));
    }

    #[tokio::test]
    async fn test_put_is_idempotent_for_same_content() {
        let store = InMemorySecretStore::new();
        store.create_secret("my-secret", Some("v1")).unwrap();

        store
            .put_secret_value("my-secret", "token-1", "v2", &[VersionStage::Pending])
            .await
            .unwrap();
        store
            .put_secret_value("my-secret", "token-1", "v2", &[VersionStage::Pending])
            .await
            .unwrap();

        let result = store
            .put_secret_value("my-secret", "token-1", "v3", &[VersionStage::Pending])
            .await;
        assert!(matches!(result, Err(SecretStoreError::Service { .. })));
    }

    #[tokio::test]
    async fn test_moving_current_marks_previous() {
        let store = InMemorySecretStore::new();
        let v1 = store.create_secret("my-secret", Some("v1")).unwrap().unwrap();
        store
            .put_secret_value("my-secret", "v2", "value-2", &[VersionStage::Pending])
            .await
            .unwrap();

        store
            .update_secret_version_stage("my-secret", VersionStage::Current, "v2", Some(&v1))
            .await
            .unwrap();

        assert_eq!(stages_of(&store, &v1), vec!["AWSPREVIOUS"]);
        assert_eq!(stages_of(&store, "v2"), vec!["AWSCURRENT", "AWSPENDING"]);
    }

    #[tokio::test]
    async fn test_move_requires_remove_from_holder() {
        let store = InMemorySecretStore::new();
        store.create_secret("my-secret", Some("v1")).unwrap();
        store
            .put_secret_value("my-secret", "v2", "value-2", &[VersionStage::Pending])
            .await
            .unwrap();

        let result = store
            .update_secret_version_stage("my-secret", VersionStage::Current, "v2", None)
            .await;
        assert!(matches!(result, Err(SecretStoreError::Service { .. })));
    }

    #[tokio::test]
    async fn test_injected_lookup_failure() {
        let store = InMemorySecretStore::new();
        store.create_secret("my-secret", Some("v1")).unwrap();
        store.fail_lookups_with(Some("InternalServiceError"));

        let result = store.get_secret_value("my-secret", None, None).await;
        assert!(matches!(result, Err(SecretStoreError::Service { ref code, .. }) if code == "InternalServiceError"));

        store.fail_lookups_with(None);
        assert!(store.get_secret_value("my-secret", None, None).await.is_ok());
    }

    #[test]
    fn test_duplicate_secret_fails() {
        let store = InMemorySecretStore::new();
        store.create_secret("my-secret", None).unwrap();

        let result = store.create_secret("my-secret", None);
        assert!(matches!(result, Err(SecretStoreError::Service { .. })));
    }
}
